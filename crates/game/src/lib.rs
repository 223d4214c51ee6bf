pub mod net;
pub mod session;
pub mod simulation;
pub mod track;
pub mod vehicle;

pub use net::{
    Command, ControlFrame, DEFAULT_PORT, DeviceAddress, FrameError, InboundFrame, LinkLossSimulation,
    LinkStats, RadioEndpoint, Rgb, Transport,
};
pub use session::{
    EvictReason, Session, SessionConfig, SessionError, SessionEvent, SessionSnapshot, SessionState,
};
pub use simulation::{DEFAULT_TICK, FixedTimestep};
pub use track::{AnimatorConfig, Difficulty, Obstacle, ObstacleAnimator, Rect, Track, TrackKind, TrackSnapshot};
pub use vehicle::{Vehicle, VehicleConfig, VehicleFlags, VehicleSnapshot};
