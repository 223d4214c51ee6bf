use std::fmt;
use std::time::Duration;

use crate::net::{DeviceAddress, Rgb};
use crate::track::{Difficulty, TrackKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictReason {
    /// No accepted frame within the expiry window.
    Expired,
    /// The race was stopped.
    Stopped,
}

impl EvictReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictReason::Expired => "expired",
            EvictReason::Stopped => "race stopped",
        }
    }
}

impl fmt::Display for EvictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something the host should know about, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    RaceStarted,
    RaceStopped,
    TrackChanged {
        kind: TrackKind,
        difficulty: Option<Difficulty>,
        obstacles: usize,
    },
    VehicleAdmitted {
        address: DeviceAddress,
        slot: usize,
        color: Rgb,
        rejoined: bool,
    },
    VehicleEvicted {
        address: DeviceAddress,
        reason: EvictReason,
    },
    VehicleCollided {
        address: DeviceAddress,
        damage_added: f64,
        damage: f64,
    },
    VehicleWrecked {
        address: DeviceAddress,
    },
    VehicleFinished {
        address: DeviceAddress,
        slot: usize,
        time: Duration,
    },
}
