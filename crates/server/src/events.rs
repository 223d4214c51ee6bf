use std::fmt;

use log::Level;
use tiltrace::{EvictReason, SessionEvent};

#[derive(Debug, Clone)]
pub enum ServerEvent {
    Session(SessionEvent),
    LinkError { message: String },
}

impl ServerEvent {
    pub fn level(&self) -> Level {
        match self {
            ServerEvent::Session(SessionEvent::VehicleCollided { .. }) => Level::Debug,
            ServerEvent::Session(SessionEvent::VehicleWrecked { .. })
            | ServerEvent::Session(SessionEvent::VehicleEvicted {
                reason: EvictReason::Expired,
                ..
            }) => Level::Warn,
            ServerEvent::Session(_) => Level::Info,
            ServerEvent::LinkError { .. } => Level::Error,
        }
    }
}

impl fmt::Display for ServerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let event = match self {
            ServerEvent::Session(event) => event,
            ServerEvent::LinkError { message } => return write!(f, "Link error: {}", message),
        };

        match event {
            SessionEvent::RaceStarted => write!(f, "Race started"),
            SessionEvent::RaceStopped => write!(f, "Race stopped"),
            SessionEvent::TrackChanged {
                kind,
                difficulty,
                obstacles,
            } => match difficulty {
                Some(level) => write!(f, "New map: {} ({}), {} obstacles", kind, level, obstacles),
                None => write!(f, "New map: {} without obstructions", kind),
            },
            SessionEvent::VehicleAdmitted {
                address,
                slot,
                rejoined,
                ..
            } => {
                if *rejoined {
                    write!(f, "{} rejoined in slot {}", address, slot)
                } else {
                    write!(f, "{} joined in slot {}", address, slot)
                }
            }
            SessionEvent::VehicleEvicted { address, reason } => {
                write!(f, "{} removed ({})", address, reason)
            }
            SessionEvent::VehicleCollided {
                address, damage, ..
            } => write!(f, "{} crashed, damage {:.0}", address, damage),
            SessionEvent::VehicleWrecked { address } => write!(f, "{} is wrecked", address),
            SessionEvent::VehicleFinished { address, time, .. } => {
                write!(f, "{} finished in {}", address, format_race_time(time.as_millis() as u64))
            }
        }
    }
}

/// `m:ss.mmm`
pub fn format_race_time(ms: u64) -> String {
    format!("{}:{:02}.{:03}", ms / 60_000, (ms / 1000) % 60, ms % 1000)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tiltrace::DeviceAddress;

    use super::*;

    #[test]
    fn race_time_format() {
        assert_eq!(format_race_time(0), "0:00.000");
        assert_eq!(format_race_time(83_456), "1:23.456");
    }

    #[test]
    fn finish_line_mentions_address_and_time() {
        let event = ServerEvent::Session(SessionEvent::VehicleFinished {
            address: DeviceAddress(0x0001_0002_0003_0004),
            slot: 0,
            time: Duration::from_millis(61_005),
        });
        assert_eq!(event.to_string(), "0001.0002.0003.0004 finished in 1:01.005");
        assert_eq!(event.level(), Level::Info);
    }

    #[test]
    fn expiry_is_a_warning() {
        let event = ServerEvent::Session(SessionEvent::VehicleEvicted {
            address: DeviceAddress(1),
            reason: EvictReason::Expired,
        });
        assert_eq!(event.level(), Level::Warn);
        assert!(event.to_string().ends_with("removed (expired)"));
    }
}
