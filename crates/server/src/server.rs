use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tiltrace::{
    Difficulty, EvictReason, FixedTimestep, LinkStats, RadioEndpoint, Session, SessionEvent,
    SessionSnapshot, SessionState, Track, TrackKind, Transport,
};

use crate::config::ServerConfig;
use crate::events::ServerEvent;

/// The base station: one loop that reads the link, ticks the session at a
/// fixed rate and broadcasts whatever the session wants sent.
pub struct RaceHost {
    endpoint: RadioEndpoint,
    session: Session,
    config: ServerConfig,
    timestep: FixedTimestep,
    last_tick_time: Instant,
    tick: u64,
    maps_generated: u64,
    running: Arc<AtomicBool>,
    start_time: Instant,
    pending_events: VecDeque<ServerEvent>,
}

impl RaceHost {
    pub fn new(bind_addr: &str, config: ServerConfig) -> io::Result<Self> {
        let mut endpoint = RadioEndpoint::bind(bind_addr)?;
        if let Some(sim) = config.link_loss.clone() {
            endpoint.set_loss_simulation(sim);
        }

        let mut host = Self {
            endpoint,
            session: Session::new(config.session.clone()),
            timestep: FixedTimestep::new(config.tick),
            last_tick_time: Instant::now(),
            tick: 0,
            maps_generated: 0,
            running: Arc::new(AtomicBool::new(true)),
            start_time: Instant::now(),
            pending_events: VecDeque::new(),
            config,
        };
        host.new_map(host.config.track_kind, host.config.difficulty);

        Ok(host)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = ServerEvent> + '_ {
        self.pending_events.drain(..)
    }

    /// Headless mode: race right away and keep going until told to stop.
    pub fn run(&mut self) {
        while self.running.load(Ordering::SeqCst) {
            self.tick_headless();
            std::thread::sleep(Duration::from_millis(1));
        }
        self.shutdown();
    }

    /// With no panel to press start, a race that auto-stopped after the last
    /// handset expired is started again for whoever joins next.
    fn tick_headless(&mut self) {
        if !self.session.is_started() {
            self.start_race();
        }
        self.tick_once();
        // the session has logged these already
        self.pending_events.clear();
    }

    pub fn start_race(&mut self) {
        self.session.start();
        self.collect_session_events();
    }

    pub fn stop_race(&mut self) {
        self.session.stop();
        self.collect_session_events();
    }

    /// Replaces the track. Each map gets the next seed when one was given.
    pub fn new_map(&mut self, kind: TrackKind, difficulty: Option<Difficulty>) {
        let seed = self.config.seed.map(|s| s.wrapping_add(self.maps_generated));
        self.maps_generated += 1;

        self.session
            .set_track(Track::generate_variant(kind, difficulty, seed));
        self.collect_session_events();
    }

    pub fn shutdown(&mut self) {
        self.session.shutdown();
        self.collect_session_events();
        log::info!(
            "Host shut down after {} ticks, {} frames received",
            self.tick,
            self.endpoint.stats().frames_received
        );
    }

    pub fn tick_once(&mut self) {
        let now = Instant::now();
        let delta = now - self.last_tick_time;
        self.last_tick_time = now;
        self.timestep.accumulate(delta);

        if let Err(e) = self.process_network() {
            log::error!("Link receive failed: {}", e);
            self.pending_events.push_back(ServerEvent::LinkError {
                message: format!("Receive failed: {}", e),
            });
        }

        let dt = self.timestep.dt();
        while self.timestep.consume_tick() {
            self.session.tick(dt);
            self.tick += 1;
        }

        self.flush_outbound();
        self.collect_session_events();
    }

    fn process_network(&mut self) -> io::Result<()> {
        let frames = self.endpoint.receive()?;
        let now = Instant::now();

        for frame in frames {
            match self.session.handle_frame(frame.sender, &frame.data, now) {
                Ok(true) => {}
                Ok(false) => self.endpoint.record_discarded(),
                Err(e) => {
                    log::warn!("Ignoring frame from {}: {}", frame.sender, e);
                    self.endpoint.record_discarded();
                }
            }
        }

        Ok(())
    }

    fn flush_outbound(&mut self) {
        let frames: Vec<Vec<u8>> = self.session.drain_outbound().collect();
        for frame in frames {
            if let Err(e) = self.endpoint.broadcast(&frame) {
                log::error!("Broadcast failed: {}", e);
                self.pending_events.push_back(ServerEvent::LinkError {
                    message: format!("Broadcast failed: {}", e),
                });
            }
        }
    }

    fn collect_session_events(&mut self) {
        for event in self.session.drain_events() {
            if let SessionEvent::VehicleEvicted {
                address,
                reason: EvictReason::Expired,
            } = event
            {
                self.endpoint.forget(address);
            }
            self.pending_events.push_back(ServerEvent::Session(event));
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    pub fn stats(&self) -> HostStats {
        let track = self.session.track();
        HostStats {
            tick: self.tick,
            uptime_secs: self.start_time.elapsed().as_secs(),
            state: self.session.state(),
            vehicle_count: self.session.vehicle_count(),
            track_kind: track.map(Track::kind),
            difficulty: track.and_then(Track::difficulty),
            link_stats: self.endpoint.stats().clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HostStats {
    pub tick: u64,
    pub uptime_secs: u64,
    pub state: SessionState,
    pub vehicle_count: usize,
    pub track_kind: Option<TrackKind>,
    pub difficulty: Option<Difficulty>,
    pub link_stats: LinkStats,
}
