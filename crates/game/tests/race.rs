use std::time::{Duration, Instant};

use glam::IVec2;
use tiltrace::track::Layout;
use tiltrace::{
    AnimatorConfig, ControlFrame, DeviceAddress, Difficulty, EvictReason, Session, SessionEvent,
    SessionState, Track, TrackKind, VehicleFlags,
};

const TICK: Duration = Duration::from_millis(20);
const FRAME_EVERY: u32 = 5;

fn short_course() -> Track {
    let layout = Layout {
        finish: IVec2::new(0, 300),
        ..Layout::default()
    };
    Track::from_parts(TrackKind::OpenField, None, layout, Vec::new(), AnimatorConfig::default())
}

#[test]
fn test_fastest_car_wins_and_standings_follow() {
    let fast = DeviceAddress(0xA);
    let slow = DeviceAddress(0xB);
    let idle = DeviceAddress(0xC);

    let mut session = Session::default();
    session.set_track(short_course());

    let start = Instant::now();
    let mut now = start;
    for address in [fast, slow, idle] {
        session
            .handle_input_at(address, ControlFrame::new(0, 0, 0), now)
            .unwrap();
    }
    assert_eq!(session.drain_outbound().count(), 3);
    session.start_at(now);

    let mut finishers = Vec::new();
    for tick in 0..400u32 {
        if tick % FRAME_EVERY == 0 {
            session
                .handle_input_at(fast, ControlFrame::new(0, 90, 0), now)
                .unwrap();
            session
                .handle_input_at(slow, ControlFrame::new(0, 30, 0), now)
                .unwrap();
            session
                .handle_input_at(idle, ControlFrame::new(0, 5, 0), now)
                .unwrap();
        }
        now += TICK;
        session.tick_at(TICK, now);

        for event in session.drain_events() {
            if let SessionEvent::VehicleFinished { address, time, .. } = event {
                finishers.push((address, time));
            }
        }
    }

    assert_eq!(finishers.len(), 2);
    assert_eq!(finishers[0].0, fast);
    assert_eq!(finishers[1].0, slow);
    assert!(finishers[0].1 < finishers[1].1);

    let snapshot = session.snapshot_at(now);
    assert_eq!(snapshot.state, SessionState::Started);
    assert_eq!(snapshot.finished_count(), 2);

    let standings: Vec<DeviceAddress> = snapshot.standings().iter().map(|v| v.address).collect();
    assert_eq!(standings, vec![fast, slow, idle]);

    let idle_car = snapshot.vehicles.iter().find(|v| v.address == idle).unwrap();
    assert_eq!(idle_car.speed, 0.0);
    assert!(idle_car.flags.contains(VehicleFlags::RECENT_ACTIVITY));
    assert!(!idle_car.flags.contains(VehicleFlags::FINISHED));

    session.stop();
    assert_eq!(session.vehicle_count(), 0);
}

#[test]
fn test_silent_handset_expires_and_race_stops() {
    let mut session = Session::default();
    session.set_track(Track::generate_seeded(TrackKind::RandomBlocks, Difficulty::Easy, 11));

    let start = Instant::now();
    let mut now = start;
    session
        .handle_input_at(DeviceAddress(1), ControlFrame::new(0, 0, 0), now)
        .unwrap();
    session
        .handle_input_at(DeviceAddress(2), ControlFrame::new(0, 0, 0), now)
        .unwrap();
    session.start_at(now);
    session.drain_events().for_each(drop);

    // only handset 1 keeps talking
    for tick in 0..350u32 {
        if tick % FRAME_EVERY == 0 {
            session
                .handle_input_at(DeviceAddress(1), ControlFrame::new(0, 0, 0), now)
                .unwrap();
        }
        now += TICK;
        session.tick_at(TICK, now);
    }

    let events: Vec<SessionEvent> = session.drain_events().collect();
    assert_eq!(
        events,
        vec![SessionEvent::VehicleEvicted {
            address: DeviceAddress(2),
            reason: EvictReason::Expired,
        }]
    );
    assert_eq!(session.state(), SessionState::Started);

    now += Duration::from_secs(6);
    session.tick_at(TICK, now);
    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(session.vehicle_count(), 0);

    let events: Vec<SessionEvent> = session.drain_events().collect();
    assert!(events.contains(&SessionEvent::RaceStopped));

    // the slot survives the eviction
    session
        .handle_input_at(DeviceAddress(2), ControlFrame::new(0, 0, 0), now)
        .unwrap();
    assert_eq!(session.vehicle(DeviceAddress(2)).unwrap().slot(), 1);
}

#[test]
fn test_seeded_tracks_are_reproducible() {
    let a = Track::generate_seeded(TrackKind::RandomBlocks, Difficulty::Easy, 42);
    let b = Track::generate_seeded(TrackKind::RandomBlocks, Difficulty::Easy, 42);

    assert_eq!(a.obstacle_count(), 30);
    assert_eq!(a.snapshot().obstacles, b.snapshot().obstacles);
    for obstacle in a.obstacles() {
        assert!(obstacle.rect.y >= a.start().y + 1000);
        assert!(obstacle.rect.bottom() <= a.finish().y - 1000);
    }
}

#[test]
fn test_unknown_names_fall_back() {
    let track = Track::generate_named("Spiral", "Easy", Some(1));
    assert_eq!(track.kind(), TrackKind::OpenField);
    assert_eq!(track.obstacle_count(), 0);

    let track = Track::generate_named("Random Maze", "Impossible", Some(1));
    assert_eq!(track.kind(), TrackKind::RandomMaze);
    assert_eq!(track.difficulty(), None);
    assert_eq!(track.obstacle_count(), 0);
}
