use tiltrace::ControlFrame;

pub const TILT_STEP: i8 = 10;
pub const TILT_LIMIT: i8 = 90;

/// Emulated accelerometer reading in degrees. X steers, Y is throttle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TiltState {
    pub x: i8,
    pub y: i8,
}

impl TiltState {
    pub fn new(x: i8, y: i8) -> Self {
        Self {
            x: x.clamp(-TILT_LIMIT, TILT_LIMIT),
            y: y.clamp(-TILT_LIMIT, TILT_LIMIT),
        }
    }

    pub fn steer(&mut self, steps: i8) {
        self.x = Self::nudge(self.x, steps);
    }

    pub fn throttle(&mut self, steps: i8) {
        self.y = Self::nudge(self.y, steps);
    }

    pub fn level(&mut self) {
        *self = Self::default();
    }

    /// Z reads full gravity when flat and fades as the handset tips.
    pub fn z(&self) -> i8 {
        TILT_LIMIT - self.x.abs().max(self.y.abs())
    }

    pub fn to_frame(&self) -> ControlFrame {
        ControlFrame::new(self.x, self.y, self.z())
    }

    fn nudge(value: i8, steps: i8) -> i8 {
        (value as i16 + steps as i16 * TILT_STEP as i16).clamp(-(TILT_LIMIT as i16), TILT_LIMIT as i16)
            as i8
    }
}
