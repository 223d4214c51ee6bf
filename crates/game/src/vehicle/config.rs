use std::time::Duration;

use crate::net::Rgb;

// Gameplay tuning. These values were settled by feel and are kept as-is.

pub const SPEED_FORWARD_MAX: f64 = 150.0;
pub const SPEED_REVERSE_MAX: f64 = 20.0;
/// Speeds closer to zero than this snap to a standstill.
pub const SPEED_MIN: f64 = 3.0;

/// Throttle gain; braking while moving forward uses twice this.
pub const SPEED_ACCELERATION_FACTOR: f64 = 1.0 / 20.0;
/// Gain applied to any tilt while reversing.
pub const SPEED_DECELERATION_FACTOR: f64 = 1.0 / 100.0;
pub const ANGLE_CHANGE_FACTOR: f64 = 1.0 / 20.0;
pub const SPEED_DECELERATE_ON_INACTIVITY: f64 = 2.0;
/// Scales `speed * dt_ms` into track units.
pub const SPEED_FACTOR: f64 = 1.0 / 200.0;

pub const MIN_SPEED_TILT: i32 = 10;
pub const MIN_ANGLE_TILT: i32 = 10;

pub const DAMAGE_LIMIT: f64 = 100.0;
/// Impacts above this speed weigh four times as much.
pub const DAMAGE_HEAVY_SPEED: f64 = SPEED_FORWARD_MAX / 2.0;
pub const DAMAGE_HEAVY_FACTOR: f64 = 4.0;
pub const DAMAGE_DIVISOR: f64 = 10.0;

pub const CAR_WIDTH: i32 = 20;
pub const CAR_LENGTH: i32 = 30;

/// Colours handed out by start slot.
pub const PALETTE: [Rgb; 5] = [
    Rgb::new(0, 255, 0),
    Rgb::new(255, 255, 0),
    Rgb::new(0, 255, 255),
    Rgb::new(255, 200, 0),
    Rgb::new(255, 0, 0),
];

pub fn slot_color(slot: usize) -> Rgb {
    PALETTE[slot % PALETTE.len()]
}

/// Lifecycle windows for a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VehicleConfig {
    /// Eviction deadline after the last accepted frame.
    pub expire_after: Duration,
    /// Speed decay is suppressed for this long after a frame.
    pub recent_activity: Duration,
    pub recent_damage: Duration,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            expire_after: Duration::from_millis(5000),
            recent_activity: Duration::from_millis(1000),
            recent_damage: Duration::from_millis(200),
        }
    }
}
