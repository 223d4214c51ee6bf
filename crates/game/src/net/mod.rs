mod protocol;
mod stats;
mod transport;

pub use protocol::{
    AddressParseError, CONTROL_FRAME_LEN, Command, ControlFrame, DEFAULT_PORT, DeviceAddress,
    FrameError, MAX_FRAME_SIZE, Rgb, SET_COLOR, SET_COLOR_FRAME_LEN,
};
pub use stats::{LinkLossSimulation, LinkStats};
pub use transport::{InboundFrame, RadioEndpoint, Transport};
