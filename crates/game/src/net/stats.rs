use rand::Rng;

/// Drops a share of inbound frames to emulate a weak radio link.
#[derive(Debug, Clone, Default)]
pub struct LinkLossSimulation {
    pub enabled: bool,
    pub loss_percent: f32,
}

impl LinkLossSimulation {
    pub fn new(loss_percent: f32) -> Self {
        Self {
            enabled: loss_percent > 0.0,
            loss_percent: loss_percent.clamp(0.0, 100.0),
        }
    }

    pub fn should_drop(&self) -> bool {
        if !self.enabled || self.loss_percent <= 0.0 {
            return false;
        }
        rand::thread_rng().gen_range(0.0f32..100.0) < self.loss_percent
    }
}

#[derive(Debug, Clone, Default)]
pub struct LinkStats {
    pub frames_sent: u64,
    pub frames_received: u64,
    pub frames_dropped: u64,
    pub frames_discarded: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub known_devices: usize,
}

impl LinkStats {
    pub fn drop_percent(&self) -> f32 {
        let total = self.frames_received + self.frames_dropped;
        if total == 0 {
            return 0.0;
        }
        self.frames_dropped as f32 / total as f32 * 100.0
    }
}
