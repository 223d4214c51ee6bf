use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::time::Instant;

use tiltrace::net::MAX_FRAME_SIZE;
use tiltrace::{Command, DeviceAddress, Rgb};

use crate::config::HandsetConfig;
use crate::input::TiltState;

/// Emulated handset: streams its tilt to the base station and lights its LED
/// when the station assigns a colour.
pub struct Handset {
    socket: UdpSocket,
    config: HandsetConfig,
    address: DeviceAddress,
    tilt: TiltState,
    led: Rgb,
    last_send_time: Option<Instant>,
    frames_sent: u64,
    commands_received: u64,
    recv_buffer: [u8; MAX_FRAME_SIZE],
}

impl Handset {
    pub fn new(config: HandsetConfig) -> io::Result<Self> {
        let bind = if config.host.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };
        let socket = UdpSocket::bind(bind)?;
        socket.connect(config.host)?;
        socket.set_nonblocking(true)?;

        // the station knows us by the address it sees, which connect() pins down
        let address = DeviceAddress::from(socket.local_addr()?);

        Ok(Self {
            socket,
            config,
            address,
            tilt: TiltState::default(),
            led: Rgb::OFF,
            last_send_time: None,
            frames_sent: 0,
            commands_received: 0,
            recv_buffer: [0u8; MAX_FRAME_SIZE],
        })
    }

    pub fn address(&self) -> DeviceAddress {
        self.address
    }

    pub fn host(&self) -> SocketAddr {
        self.config.host
    }

    pub fn led(&self) -> Rgb {
        self.led
    }

    pub fn tilt(&self) -> TiltState {
        self.tilt
    }

    pub fn tilt_mut(&mut self) -> &mut TiltState {
        &mut self.tilt
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    pub fn commands_received(&self) -> u64 {
        self.commands_received
    }

    /// Sends the current tilt once per interval and applies any commands
    /// that arrived.
    pub fn update(&mut self, now: Instant) -> io::Result<()> {
        let due = self
            .last_send_time
            .is_none_or(|t| now.duration_since(t) >= self.config.send_interval);
        if due {
            self.send_tilt()?;
            self.last_send_time = Some(now);
        }

        loop {
            match self.socket.recv(&mut self.recv_buffer) {
                Ok(size) => {
                    let frame = self.recv_buffer[..size].to_vec();
                    self.handle_command(&frame);
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                // nobody listening at the station yet
                Err(ref e) if e.kind() == io::ErrorKind::ConnectionRefused => break,
                Err(ref e) if e.kind() == io::ErrorKind::ConnectionReset => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    pub fn send_tilt(&mut self) -> io::Result<()> {
        match self.socket.send(&self.tilt.to_frame().encode()) {
            Ok(_) => {
                self.frames_sent += 1;
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                log::debug!("Station at {} not reachable", self.config.host);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Returns true when the frame changed the LED.
    pub fn handle_command(&mut self, data: &[u8]) -> bool {
        let command = match Command::decode(data) {
            Ok(command) => command,
            Err(e) => {
                log::debug!("Ignoring frame from station: {}", e);
                return false;
            }
        };

        match command {
            Command::SetColor { target, color } => {
                if target != self.address {
                    return false;
                }
                self.commands_received += 1;
                if color.is_off() {
                    log::info!("LED off");
                } else {
                    log::info!("LED set to ({}, {}, {})", color.r, color.g, color.b);
                }
                let changed = self.led != color;
                self.led = color;
                changed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn handset(host: SocketAddr) -> Handset {
        Handset::new(HandsetConfig {
            host,
            send_interval: Duration::from_millis(100),
        })
        .unwrap()
    }

    #[test]
    fn test_only_own_colour_is_applied() {
        let station = UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut handset = handset(station.local_addr().unwrap());
        let own = handset.address();

        let other = Command::SetColor {
            target: DeviceAddress(own.0 ^ 1),
            color: Rgb::new(255, 0, 0),
        };
        assert!(!handset.handle_command(&other.encode()));
        assert_eq!(handset.led(), Rgb::OFF);

        let mine = Command::SetColor {
            target: own,
            color: Rgb::new(0, 255, 0),
        };
        assert!(handset.handle_command(&mine.encode()));
        assert_eq!(handset.led(), Rgb::new(0, 255, 0));

        let off = Command::SetColor {
            target: own,
            color: Rgb::OFF,
        };
        assert!(handset.handle_command(&off.encode()));
        assert!(handset.led().is_off());
        assert_eq!(handset.commands_received(), 2);
    }

    #[test]
    fn test_garbage_is_ignored() {
        let station = UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut handset = handset(station.local_addr().unwrap());
        assert!(!handset.handle_command(&[]));
        assert!(!handset.handle_command(&[80, 1, 2]));
        assert!(!handset.handle_command(&[7; 12]));
    }

    #[test]
    fn test_frames_follow_the_interval() {
        let station = UdpSocket::bind("127.0.0.1:0").unwrap();
        station
            .set_read_timeout(Some(Duration::from_millis(500)))
            .unwrap();
        let mut handset = handset(station.local_addr().unwrap());
        handset.tilt_mut().throttle(3);

        let now = Instant::now();
        handset.update(now).unwrap();
        handset.update(now + Duration::from_millis(50)).unwrap();
        assert_eq!(handset.frames_sent(), 1);
        handset.update(now + Duration::from_millis(100)).unwrap();
        assert_eq!(handset.frames_sent(), 2);

        let mut buf = [0u8; 8];
        let (len, from) = station.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..len], &[0, 30, 60]);
        assert_eq!(DeviceAddress::from(from), handset.address());
    }
}
