use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HandsetConfig {
    pub host: SocketAddr,
    pub send_interval: Duration,
}

impl Default for HandsetConfig {
    fn default() -> Self {
        Self {
            host: SocketAddr::from(([127, 0, 0, 1], tiltrace::DEFAULT_PORT)),
            send_interval: Duration::from_millis(100),
        }
    }
}
