use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::track::TrackSnapshot;
use crate::vehicle::VehicleSnapshot;

use super::SessionState;

/// Owned copy of everything the drawing side needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub race_ms: u64,
    pub track: Option<TrackSnapshot>,
    /// Sorted by start slot.
    pub vehicles: Vec<VehicleSnapshot>,
}

impl SessionSnapshot {
    /// Finished cars by time, then everyone else by distance covered.
    pub fn standings(&self) -> Vec<&VehicleSnapshot> {
        let mut order: Vec<&VehicleSnapshot> = self.vehicles.iter().collect();
        order.sort_by(|a, b| match (a.finish_ms, b.finish_ms) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => b
                .distance
                .partial_cmp(&a.distance)
                .unwrap_or(Ordering::Equal),
        });
        order
    }

    pub fn finished_count(&self) -> usize {
        self.vehicles.iter().filter(|v| v.finish_ms.is_some()).count()
    }
}
