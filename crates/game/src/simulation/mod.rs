mod tick;

pub use tick::{DEFAULT_TICK, FixedTimestep, MAX_FRAME_DELTA};
