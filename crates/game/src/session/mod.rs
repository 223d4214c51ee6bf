mod event;
mod snapshot;

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::net::{Command, ControlFrame, DeviceAddress, Rgb};
use crate::track::Track;
use crate::vehicle::{PALETTE, Vehicle, VehicleConfig};

pub use event::{EvictReason, SessionEvent};
pub use snapshot::SessionSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    Stopped,
    Started,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Stopped => "stopped",
            SessionState::Started => "started",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("no track has been generated yet")]
    TrackNotReady,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub vehicle: VehicleConfig,
    /// Car colours, picked by start slot.
    pub palette: Vec<Rgb>,
    /// Stop the race once the last car has expired.
    pub auto_stop: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            vehicle: VehicleConfig::default(),
            palette: PALETTE.to_vec(),
            auto_stop: true,
        }
    }
}

impl SessionConfig {
    pub fn color_for(&self, slot: usize) -> Rgb {
        if self.palette.is_empty() {
            return PALETTE[slot % PALETTE.len()];
        }
        self.palette[slot % self.palette.len()]
    }
}

/// Race coordinator: the vehicle registry, the active track and the
/// started/stopped state.
///
/// The session is the single owner of all of it. The host feeds it inbound
/// frames and fixed ticks from one loop and drains [`SessionEvent`]s and
/// outbound command frames afterwards.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    state: SessionState,
    started_at: Option<Instant>,
    track: Option<Track>,
    vehicles: HashMap<DeviceAddress, Vehicle>,
    /// Outlives the vehicles so a rejoining handset keeps its lane and colour.
    slots: HashMap<DeviceAddress, usize>,
    events: VecDeque<SessionEvent>,
    outbound: VecDeque<Vec<u8>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: SessionState::Stopped,
            started_at: None,
            track: None,
            vehicles: HashMap::new(),
            slots: HashMap::new(),
            events: VecDeque::new(),
            outbound: VecDeque::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_started(&self) -> bool {
        self.state == SessionState::Started
    }

    pub fn track(&self) -> Option<&Track> {
        self.track.as_ref()
    }

    pub fn vehicle(&self, address: DeviceAddress) -> Option<&Vehicle> {
        self.vehicles.get(&address)
    }

    pub fn vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    pub fn reserved_slot(&self, address: DeviceAddress) -> Option<usize> {
        self.slots.get(&address).copied()
    }

    /// Time since the race was started, zero while stopped.
    pub fn race_duration(&self, now: Instant) -> Duration {
        match (self.state, self.started_at) {
            (SessionState::Started, Some(started)) => now.saturating_duration_since(started),
            _ => Duration::ZERO,
        }
    }

    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    /// Starts the race clock. Does nothing when already started; vehicles
    /// keep whatever state they have.
    pub fn start_at(&mut self, now: Instant) {
        if self.is_started() {
            return;
        }
        self.state = SessionState::Started;
        self.started_at = Some(now);
        log::info!("Race started with {} vehicles", self.vehicles.len());
        self.events.push_back(SessionEvent::RaceStarted);
    }

    /// Stops the race and evicts every vehicle. Reserved slots are kept.
    pub fn stop(&mut self) {
        let was_started = self.is_started();
        self.state = SessionState::Stopped;
        self.started_at = None;

        let mut evicted: Vec<DeviceAddress> = self.vehicles.keys().copied().collect();
        evicted.sort_unstable();
        for address in evicted {
            self.evict(address, EvictReason::Stopped);
        }

        if was_started {
            log::info!("Race stopped");
            self.events.push_back(SessionEvent::RaceStopped);
        }
    }

    /// Swaps in a new track. The old one is torn down first, so its
    /// obstacles have stopped moving by the time this returns.
    pub fn set_track(&mut self, track: Track) {
        if let Some(mut old) = self.track.take() {
            old.teardown();
        }

        log::info!(
            "Track set to {} ({})",
            track.kind(),
            track.difficulty().map_or("no obstructions", |d| d.name())
        );
        self.events.push_back(SessionEvent::TrackChanged {
            kind: track.kind(),
            difficulty: track.difficulty(),
            obstacles: track.obstacle_count(),
        });
        self.track = Some(track);
    }

    /// Registers a handset. A known address reuses its reserved slot; a new
    /// one takes the next slot, which is the current number of vehicles.
    pub fn admit(&mut self, address: DeviceAddress, now: Instant) -> Result<&mut Vehicle, SessionError> {
        let next_slot = self.vehicles.len();
        let entry = match self.vehicles.entry(address) {
            Entry::Occupied(entry) => return Ok(entry.into_mut()),
            Entry::Vacant(entry) => entry,
        };
        let track = self.track.as_ref().ok_or(SessionError::TrackNotReady)?;

        let (slot, rejoined) = match self.slots.get(&address) {
            Some(&slot) => (slot, true),
            None => {
                self.slots.insert(address, next_slot);
                (next_slot, false)
            }
        };
        let color = self.config.color_for(slot);
        let start = track.start_position(slot);

        log::info!(
            "Admitted {} in slot {} at ({}, {}){}",
            address,
            slot,
            start.x,
            start.y,
            if rejoined { ", rejoining" } else { "" }
        );
        self.events.push_back(SessionEvent::VehicleAdmitted {
            address,
            slot,
            color,
            rejoined,
        });
        self.outbound
            .push_back(Command::SetColor { target: address, color }.encode());

        Ok(entry.insert(Vehicle::new(address, slot, color, start, self.config.vehicle, now)))
    }

    pub fn handle_input(&mut self, address: DeviceAddress, frame: ControlFrame) -> Result<(), SessionError> {
        self.handle_input_at(address, frame, Instant::now())
    }

    /// Admits the sender if needed and refreshes its activity. Tilt is only
    /// applied while the race runs and the car is still drivable.
    pub fn handle_input_at(
        &mut self,
        address: DeviceAddress,
        frame: ControlFrame,
        now: Instant,
    ) -> Result<(), SessionError> {
        let started = self.is_started();
        let vehicle = self.admit(address, now)?;
        vehicle.mark_active(now);

        if started && !vehicle.is_completely_damaged() {
            vehicle.apply_control(frame.tilt_x as i32, frame.tilt_y as i32, frame.tilt_z as i32);
        }
        Ok(())
    }

    /// Decodes a raw control frame and applies it. Returns `Ok(false)` when
    /// the frame was malformed and dropped; nobody is admitted in that case.
    pub fn handle_frame(&mut self, sender: DeviceAddress, data: &[u8], now: Instant) -> Result<bool, SessionError> {
        match ControlFrame::decode(data) {
            Ok(frame) => {
                self.handle_input_at(sender, frame, now)?;
                Ok(true)
            }
            Err(e) => {
                log::debug!("Discarding frame from {}: {}", sender, e);
                Ok(false)
            }
        }
    }

    pub fn tick(&mut self, dt: Duration) {
        self.tick_at(dt, Instant::now());
    }

    /// One physics step: evict expired cars, then move, collide and finish
    /// the rest.
    pub fn tick_at(&mut self, dt: Duration, now: Instant) {
        let mut expired: Vec<DeviceAddress> = self
            .vehicles
            .values()
            .filter(|v| v.has_expired(now))
            .map(Vehicle::address)
            .collect();
        expired.sort_unstable();
        let any_expired = !expired.is_empty();
        for address in expired {
            self.evict(address, EvictReason::Expired);
        }

        if any_expired && self.vehicles.is_empty() && self.is_started() && self.config.auto_stop {
            log::info!("Last vehicle left, stopping the race");
            self.stop();
            return;
        }

        let race = self.race_duration(now);
        for vehicle in self.vehicles.values_mut() {
            vehicle.advance(dt, now);

            let Some(track) = self.track.as_ref() else {
                continue;
            };

            if track.collides_with(&vehicle.rect()) {
                let was_wrecked = vehicle.is_completely_damaged();
                let damage_added = vehicle.on_collision(now);
                log::debug!(
                    "{} collided, damage {:.1} (+{:.1})",
                    vehicle.address(),
                    vehicle.damage(),
                    damage_added
                );
                self.events.push_back(SessionEvent::VehicleCollided {
                    address: vehicle.address(),
                    damage_added,
                    damage: vehicle.damage(),
                });
                if !was_wrecked && vehicle.is_completely_damaged() {
                    log::info!("{} is wrecked", vehicle.address());
                    self.events.push_back(SessionEvent::VehicleWrecked {
                        address: vehicle.address(),
                    });
                }
            }

            if track.has_finished(vehicle.position().y) && vehicle.on_finish(race) {
                log::info!(
                    "{} finished in {:.2}s",
                    vehicle.address(),
                    race.as_secs_f64()
                );
                self.events.push_back(SessionEvent::VehicleFinished {
                    address: vehicle.address(),
                    slot: vehicle.slot(),
                    time: race,
                });
            }
        }
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = SessionEvent> + '_ {
        self.events.drain(..)
    }

    /// Encoded command frames waiting to be broadcast.
    pub fn drain_outbound(&mut self) -> impl Iterator<Item = Vec<u8>> + '_ {
        self.outbound.drain(..)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_at(Instant::now())
    }

    pub fn snapshot_at(&self, now: Instant) -> SessionSnapshot {
        let mut vehicles: Vec<_> = self.vehicles.values().map(|v| v.snapshot(now)).collect();
        vehicles.sort_by_key(|v| (v.slot, v.address));

        SessionSnapshot {
            state: self.state,
            race_ms: self.race_duration(now).as_millis() as u64,
            track: self.track.as_ref().map(Track::snapshot),
            vehicles,
        }
    }

    /// Stops the race and tears the track down.
    pub fn shutdown(&mut self) {
        self.stop();
        if let Some(mut track) = self.track.take() {
            track.teardown();
        }
    }

    fn evict(&mut self, address: DeviceAddress, reason: EvictReason) {
        if self.vehicles.remove(&address).is_some() {
            log::info!("Evicted {} ({})", address, reason);
            self.events
                .push_back(SessionEvent::VehicleEvicted { address, reason });
        }
    }
}
