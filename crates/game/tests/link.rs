use std::net::UdpSocket;
use std::thread;
use std::time::{Duration, Instant};

use tiltrace::{
    Command, ControlFrame, DeviceAddress, Difficulty, InboundFrame, LinkLossSimulation,
    RadioEndpoint, Session, SessionEvent, Track, TrackKind, Transport,
};

fn wait_for_frames(endpoint: &mut RadioEndpoint, timeout_ms: u64) -> Option<Vec<InboundFrame>> {
    let start = Instant::now();
    while start.elapsed() < Duration::from_millis(timeout_ms) {
        let received = endpoint.receive().unwrap();
        if !received.is_empty() {
            return Some(received);
        }
        thread::sleep(Duration::from_millis(1));
    }
    None
}

fn handset() -> UdpSocket {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket
        .set_read_timeout(Some(Duration::from_millis(500)))
        .unwrap();
    socket
}

#[test]
fn test_control_frame_reaches_host_tagged_with_sender() {
    let mut host = RadioEndpoint::bind("127.0.0.1:0").unwrap();
    let device = handset();

    let frame = ControlFrame::new(-12, 40, 90);
    device.send_to(&frame.encode(), host.local_addr()).unwrap();

    let received = wait_for_frames(&mut host, 500).expect("No frame received");
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].sender, DeviceAddress::from(device.local_addr().unwrap()));
    assert_eq!(ControlFrame::decode(&received[0].data).unwrap(), frame);

    let stats = host.stats();
    assert_eq!(stats.frames_received, 1);
    assert_eq!(stats.bytes_received, 3);
    assert_eq!(stats.known_devices, 1);
}

#[test]
fn test_admission_colour_is_broadcast_to_the_handset() {
    let mut host = RadioEndpoint::bind("127.0.0.1:0").unwrap();
    let mut session = Session::default();
    session.set_track(Track::generate(TrackKind::OpenField, Difficulty::Easy));

    let device = handset();
    let own_address = DeviceAddress::from(device.local_addr().unwrap());
    device
        .send_to(&ControlFrame::new(0, 0, 0).encode(), host.local_addr())
        .unwrap();

    let now = Instant::now();
    for frame in wait_for_frames(&mut host, 500).expect("No frame received") {
        assert!(session.handle_frame(frame.sender, &frame.data, now).unwrap());
    }
    for command in session.drain_outbound().collect::<Vec<_>>() {
        assert_eq!(host.broadcast(&command).unwrap(), 1);
    }

    let mut buf = [0u8; 32];
    let (len, _) = device.recv_from(&mut buf).unwrap();
    match Command::decode(&buf[..len]).unwrap() {
        Command::SetColor { target, color } => {
            assert_eq!(target, own_address);
            assert!(!color.is_off());
        }
    }

    assert!(session
        .drain_events()
        .any(|e| matches!(e, SessionEvent::VehicleAdmitted { address, .. } if address == own_address)));
}

#[test]
fn test_malformed_frames_are_discarded() {
    let mut host = RadioEndpoint::bind("127.0.0.1:0").unwrap();
    let mut session = Session::default();
    session.set_track(Track::generate(TrackKind::OpenField, Difficulty::Easy));

    let device = handset();
    device.send_to(&[1, 2], host.local_addr()).unwrap();

    let now = Instant::now();
    for frame in wait_for_frames(&mut host, 500).expect("No frame received") {
        if !session.handle_frame(frame.sender, &frame.data, now).unwrap() {
            host.record_discarded();
        }
    }

    assert_eq!(session.vehicle_count(), 0);
    assert_eq!(host.stats().frames_discarded, 1);
    assert_eq!(session.drain_outbound().count(), 0);
}

#[test]
fn test_total_loss_drops_everything() {
    let mut host = RadioEndpoint::bind("127.0.0.1:0").unwrap();
    host.set_loss_simulation(LinkLossSimulation::new(100.0));

    let device = handset();
    for _ in 0..5 {
        device
            .send_to(&ControlFrame::new(0, 50, 0).encode(), host.local_addr())
            .unwrap();
    }

    let deadline = Instant::now() + Duration::from_millis(500);
    while host.stats().frames_dropped < 5 && Instant::now() < deadline {
        assert!(host.receive().unwrap().is_empty());
        thread::sleep(Duration::from_millis(1));
    }

    assert_eq!(host.stats().frames_dropped, 5);
    assert_eq!(host.stats().frames_received, 0);
    assert_eq!(host.stats().known_devices, 0);
}
