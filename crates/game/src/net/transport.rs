use std::collections::HashMap;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use super::protocol::{DeviceAddress, MAX_FRAME_SIZE};
use super::stats::{LinkLossSimulation, LinkStats};

/// A raw frame handed over by the link, tagged with its sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundFrame {
    pub sender: DeviceAddress,
    pub data: Vec<u8>,
}

/// The broadcast link between the host and the handsets. Delivery is
/// at-most-once with no acknowledgement.
pub trait Transport {
    fn receive(&mut self) -> io::Result<Vec<InboundFrame>>;

    fn broadcast(&mut self, data: &[u8]) -> io::Result<usize>;
}

/// UDP stand-in for the broadcast radio. Every sender is remembered as a
/// peer and a broadcast reaches all of them.
pub struct RadioEndpoint {
    socket: UdpSocket,
    local_addr: SocketAddr,
    peers: HashMap<DeviceAddress, SocketAddr>,
    stats: LinkStats,
    loss_sim: LinkLossSimulation,
    recv_buffer: [u8; MAX_FRAME_SIZE],
}

impl RadioEndpoint {
    pub fn bind<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;

        let local_addr = socket.local_addr()?;

        Ok(Self {
            socket,
            local_addr,
            peers: HashMap::new(),
            stats: LinkStats::default(),
            loss_sim: LinkLossSimulation::default(),
            recv_buffer: [0u8; MAX_FRAME_SIZE],
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    pub fn set_loss_simulation(&mut self, sim: LinkLossSimulation) {
        self.loss_sim = sim;
    }

    pub fn forget(&mut self, device: DeviceAddress) {
        self.peers.remove(&device);
        self.stats.known_devices = self.peers.len();
    }

    pub fn record_discarded(&mut self) {
        self.stats.frames_discarded += 1;
    }

    pub fn send_to(&mut self, data: &[u8], addr: SocketAddr) -> io::Result<usize> {
        if data.len() > MAX_FRAME_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Frame exceeds radio payload",
            ));
        }

        let bytes = self.socket.send_to(data, addr)?;

        self.stats.frames_sent += 1;
        self.stats.bytes_sent += bytes as u64;

        Ok(bytes)
    }
}

impl Transport for RadioEndpoint {
    fn receive(&mut self) -> io::Result<Vec<InboundFrame>> {
        let mut frames = Vec::new();

        loop {
            match self.socket.recv_from(&mut self.recv_buffer) {
                Ok((size, addr)) => {
                    if self.loss_sim.should_drop() {
                        self.stats.frames_dropped += 1;
                        continue;
                    }

                    let sender = DeviceAddress::from(addr);
                    self.peers.insert(sender, addr);
                    self.stats.known_devices = self.peers.len();

                    self.stats.frames_received += 1;
                    self.stats.bytes_received += size as u64;

                    frames.push(InboundFrame {
                        sender,
                        data: self.recv_buffer[..size].to_vec(),
                    });
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                // A previous send hit a closed port; not a failure of this socket.
                Err(ref e) if e.kind() == io::ErrorKind::ConnectionReset => continue,
                Err(e) => return interrupted_drain(frames, e),
            }
        }

        Ok(frames)
    }

    fn broadcast(&mut self, data: &[u8]) -> io::Result<usize> {
        let targets: Vec<SocketAddr> = self.peers.values().copied().collect();
        let mut delivered = 0;

        for addr in targets {
            match self.send_to(data, addr) {
                Ok(_) => delivered += 1,
                Err(e) => log::warn!("Broadcast to {} failed: {}", addr, e),
            }
        }

        Ok(delivered)
    }
}

/// Frames already taken off the socket are handed over even when the drain
/// fails part way; the error only surfaces when nothing was read.
fn interrupted_drain(frames: Vec<InboundFrame>, error: io::Error) -> io::Result<Vec<InboundFrame>> {
    if frames.is_empty() {
        return Err(error);
    }
    log::warn!("Receive stopped after {} frames: {}", frames.len(), error);
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receive_on_idle_socket_is_empty() {
        let mut endpoint = RadioEndpoint::bind("127.0.0.1:0").unwrap();
        assert!(endpoint.receive().unwrap().is_empty());
    }

    #[test]
    fn broadcast_without_peers_reaches_nobody() {
        let mut endpoint = RadioEndpoint::bind("127.0.0.1:0").unwrap();
        assert_eq!(endpoint.broadcast(&[1, 2, 3]).unwrap(), 0);
        assert_eq!(endpoint.stats().frames_sent, 0);
    }

    #[test]
    fn oversized_frames_are_refused() {
        let mut endpoint = RadioEndpoint::bind("127.0.0.1:0").unwrap();
        let target = endpoint.local_addr();
        let err = endpoint.send_to(&[0u8; MAX_FRAME_SIZE + 1], target).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn failed_drain_keeps_frames_already_read() {
        let frame = InboundFrame {
            sender: DeviceAddress(7),
            data: vec![0, 30, 0],
        };
        let kept = interrupted_drain(
            vec![frame.clone()],
            io::Error::other("radio reset"),
        )
        .unwrap();
        assert_eq!(kept, vec![frame]);

        let err = interrupted_drain(Vec::new(), io::Error::other("radio reset"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
    }
}
