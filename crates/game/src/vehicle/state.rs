use std::time::{Duration, Instant};

use glam::{DVec2, IVec2};

use crate::net::{DeviceAddress, Rgb};
use crate::track::Rect;

use super::config::*;
use super::{VehicleFlags, VehicleSnapshot};

/// Kinematic state of one player's car.
///
/// Heading is in degrees, 0 pointing at the finish and positive to the right.
/// It is never normalised. Speed is signed, forward positive.
#[derive(Debug, Clone)]
pub struct Vehicle {
    address: DeviceAddress,
    slot: usize,
    color: Rgb,
    start: DVec2,
    position: DVec2,
    angle: f64,
    speed: f64,
    damage: f64,
    finish: Option<Duration>,
    rect: Rect,
    last_step: DVec2,
    last_activity: Option<Instant>,
    expires_at: Instant,
    last_collision: Option<Instant>,
    config: VehicleConfig,
}

impl Vehicle {
    pub fn new(
        address: DeviceAddress,
        slot: usize,
        color: Rgb,
        start: IVec2,
        config: VehicleConfig,
        now: Instant,
    ) -> Self {
        let position = start.as_dvec2();
        Self {
            address,
            slot,
            color,
            start: position,
            position,
            angle: 0.0,
            speed: 0.0,
            damage: 0.0,
            finish: None,
            rect: Rect::centered(position, CAR_WIDTH, CAR_LENGTH),
            last_step: DVec2::ZERO,
            last_activity: None,
            expires_at: now + config.expire_after,
            last_collision: None,
            config,
        }
    }

    pub fn address(&self) -> DeviceAddress {
        self.address
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn position(&self) -> DVec2 {
        self.position
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn damage(&self) -> f64 {
        self.damage
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Progress along the course from the start line.
    pub fn distance(&self) -> f64 {
        self.position.y - self.start.y
    }

    pub fn max_forward_speed(&self) -> f64 {
        SPEED_FORWARD_MAX - self.damage
    }

    /// Applies one tilt reading. Readings inside the dead zone on both axes
    /// are hand tremor and leave the car untouched. `tilt_z` is not used.
    pub fn apply_control(&mut self, tilt_x: i32, tilt_y: i32, _tilt_z: i32) {
        if tilt_y.abs() > MIN_SPEED_TILT {
            let tilt = tilt_y as f64;
            if self.speed >= 0.0 {
                if tilt > 0.0 {
                    self.speed += tilt * SPEED_ACCELERATION_FACTOR;
                } else {
                    self.speed += tilt * 2.0 * SPEED_ACCELERATION_FACTOR;
                }
            } else {
                self.speed += tilt * SPEED_DECELERATION_FACTOR;
            }

            self.speed = self.speed.clamp(-SPEED_REVERSE_MAX, self.max_forward_speed());
            if self.speed.abs() < SPEED_MIN {
                self.speed = 0.0;
            }
        }

        if tilt_x.abs() > MIN_ANGLE_TILT {
            self.angle += tilt_x as f64 * ANGLE_CHANGE_FACTOR;
        }
    }

    /// Integrates position over `dt`. Without recent input the car rolls to
    /// a stop without ever crossing zero.
    pub fn advance(&mut self, dt: Duration, now: Instant) {
        let dt_ms = dt.as_secs_f64() * 1000.0;
        let (sin, cos) = self.angle.to_radians().sin_cos();

        self.last_step = DVec2::new(sin, cos) * (self.speed * dt_ms * SPEED_FACTOR);
        self.position += self.last_step;
        self.rect = Rect::centered(self.position, CAR_WIDTH, CAR_LENGTH);

        if !self.has_recent_activity(now) {
            let decay = SPEED_DECELERATE_ON_INACTIVITY * dt_ms * SPEED_FACTOR * 2.0;
            if self.speed > 0.0 {
                self.speed = (self.speed - decay).max(0.0);
            } else if self.speed < 0.0 {
                self.speed = (self.speed + decay).min(0.0);
            }
        }
    }

    /// Backs the car out of whatever it hit, books the damage and stops it.
    /// Returns the damage added by this impact.
    pub fn on_collision(&mut self, now: Instant) -> f64 {
        self.position -= self.last_step * 2.0;
        self.rect = Rect::centered(self.position, CAR_WIDTH, CAR_LENGTH);
        self.last_step = DVec2::ZERO;

        let weighted = if self.speed <= DAMAGE_HEAVY_SPEED {
            self.speed
        } else {
            DAMAGE_HEAVY_FACTOR * self.speed
        };
        let before = self.damage;
        self.damage = (self.damage + (weighted / DAMAGE_DIVISOR).abs()).min(DAMAGE_LIMIT);

        self.speed = 0.0;
        self.last_collision = Some(now);
        self.damage - before
    }

    /// Records the finish time. Only the first call counts; returns whether
    /// this call was it.
    pub fn on_finish(&mut self, race_duration: Duration) -> bool {
        if self.finish.is_some() {
            return false;
        }
        self.finish = Some(race_duration);
        true
    }

    pub fn has_finished(&self) -> bool {
        self.finish.is_some()
    }

    pub fn finish_duration(&self) -> Option<Duration> {
        self.finish
    }

    pub fn is_completely_damaged(&self) -> bool {
        self.damage >= DAMAGE_LIMIT
    }

    pub fn mark_active(&mut self, now: Instant) {
        self.last_activity = Some(now);
        self.expires_at = now + self.config.expire_after;
    }

    pub fn has_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }

    pub fn has_recent_activity(&self, now: Instant) -> bool {
        self.last_activity
            .is_some_and(|t| now.saturating_duration_since(t) < self.config.recent_activity)
    }

    pub fn is_recently_damaged(&self, now: Instant) -> bool {
        self.last_collision
            .is_some_and(|t| now.saturating_duration_since(t) < self.config.recent_damage)
    }

    pub fn flags(&self, now: Instant) -> VehicleFlags {
        let mut flags = VehicleFlags::empty();
        flags.set(VehicleFlags::RECENT_ACTIVITY, self.has_recent_activity(now));
        flags.set(VehicleFlags::RECENTLY_DAMAGED, self.is_recently_damaged(now));
        flags.set(VehicleFlags::FINISHED, self.has_finished());
        flags.set(VehicleFlags::WRECKED, self.is_completely_damaged());
        flags
    }

    pub fn snapshot(&self, now: Instant) -> VehicleSnapshot {
        VehicleSnapshot {
            address: self.address,
            slot: self.slot,
            color: self.color,
            position: self.position,
            heading: self.angle,
            speed: self.speed,
            damage: self.damage,
            distance: self.distance(),
            finish_ms: self.finish.map(|d| d.as_millis() as u64),
            flags: self.flags(now),
        }
    }
}
