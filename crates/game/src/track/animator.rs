use std::io;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::Obstacle;

#[derive(Debug, Clone, Copy)]
pub struct AnimatorConfig {
    pub tick: Duration,
    /// Distance travelled per tick.
    pub step: f64,
    pub reverse_after: Duration,
}

impl Default for AnimatorConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(50),
            step: 5.0,
            reverse_after: Duration::from_secs(30),
        }
    }
}

impl AnimatorConfig {
    pub fn reversal_ticks(&self) -> u32 {
        let tick_ms = self.tick.as_millis().max(1);
        (self.reverse_after.as_millis() / tick_ms).max(1) as u32
    }
}

/// Periodic task that drifts the tagged obstacles of one track.
///
/// Every tick runs under the obstacle write lock, so readers see either the
/// previous or the next layout and never a partial one. [`stop`] joins the
/// thread; once it returns no further mutation happens.
///
/// [`stop`]: ObstacleAnimator::stop
#[derive(Debug)]
pub struct ObstacleAnimator {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ObstacleAnimator {
    pub fn spawn(obstacles: Arc<RwLock<Vec<Obstacle>>>, config: AnimatorConfig) -> io::Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("obstacle-animator".into())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(config.tick) {
                        Err(RecvTimeoutError::Timeout) => {
                            let mut guard = obstacles.write().unwrap_or_else(PoisonError::into_inner);
                            Self::step(&mut guard, &config);
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                log::trace!("Obstacle animator stopped");
            })?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Advances every tagged obstacle by one tick.
    pub fn step(obstacles: &mut [Obstacle], config: &AnimatorConfig) {
        for obstacle in obstacles.iter_mut() {
            let Some(motion) = obstacle.motion.as_mut() else {
                continue;
            };

            let (sin, cos) = motion.heading.to_radians().sin_cos();
            let rect = &mut obstacle.rect;
            rect.x = (rect.x as f64 + config.step * sin) as i32;
            rect.y = (rect.y as f64 + config.step * cos) as i32;

            motion.ticks_until_reversal = motion.ticks_until_reversal.saturating_sub(1);
            if motion.ticks_until_reversal == 0 {
                motion.heading += 180.0;
                motion.ticks_until_reversal = config.reversal_ticks();
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Obstacle animator panicked");
            }
        }
    }
}

impl Drop for ObstacleAnimator {
    fn drop(&mut self) {
        self.stop();
    }
}
