mod config;
mod state;

use bitflags::bitflags;
use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::net::{DeviceAddress, Rgb};

pub use config::*;
pub use state::Vehicle;

bitflags! {
    /// Render hints for one car.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct VehicleFlags: u8 {
        const RECENT_ACTIVITY = 1 << 0;
        const RECENTLY_DAMAGED = 1 << 1;
        const FINISHED = 1 << 2;
        const WRECKED = 1 << 3;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub address: DeviceAddress,
    pub slot: usize,
    pub color: Rgb,
    pub position: DVec2,
    pub heading: f64,
    pub speed: f64,
    pub damage: f64,
    pub distance: f64,
    pub finish_ms: Option<u64>,
    pub flags: VehicleFlags,
}
