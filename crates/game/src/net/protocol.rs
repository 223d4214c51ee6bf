use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Length of a tilt control frame.
pub const CONTROL_FRAME_LEN: usize = 3;
/// Command code + 8 byte address + R, G, B.
pub const SET_COLOR_FRAME_LEN: usize = 12;
/// Command code for assigning an LED colour to a handset.
pub const SET_COLOR: u8 = 80;
/// Largest frame either side ever sends.
pub const MAX_FRAME_SIZE: usize = 16;
pub const DEFAULT_PORT: u16 = 27040;

/// 64-bit IEEE address of a handset radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeviceAddress(pub u64);

impl DeviceAddress {
    pub fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    pub fn from_be_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_be_bytes(bytes))
    }
}

impl From<SocketAddr> for DeviceAddress {
    fn from(addr: SocketAddr) -> Self {
        let host = match addr.ip() {
            IpAddr::V4(ip) => u32::from(ip) as u64,
            IpAddr::V6(ip) => {
                let bits = u128::from(ip);
                (bits as u64) ^ ((bits >> 64) as u64)
            }
        };
        Self((host << 16) | addr.port() as u64)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;
        write!(
            f,
            "{:04X}.{:04X}.{:04X}.{:04X}",
            (v >> 48) & 0xFFFF,
            (v >> 32) & 0xFFFF,
            (v >> 16) & 0xFFFF,
            v & 0xFFFF
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid device address: {0}")]
pub struct AddressParseError(String);

impl FromStr for DeviceAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let groups: Vec<&str> = s.split('.').collect();
        if groups.len() != 4 {
            return Err(AddressParseError(s.to_string()));
        }

        let mut value = 0u64;
        for group in groups {
            if group.is_empty() || group.len() > 4 {
                return Err(AddressParseError(s.to_string()));
            }
            let part =
                u16::from_str_radix(group, 16).map_err(|_| AddressParseError(s.to_string()))?;
            value = (value << 16) | part as u64;
        }
        Ok(Self(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const OFF: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn is_off(&self) -> bool {
        *self == Self::OFF
    }
}

/// Raw tilt readings in degrees, one byte per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlFrame {
    pub tilt_x: i8,
    pub tilt_y: i8,
    pub tilt_z: i8,
}

impl ControlFrame {
    pub fn new(tilt_x: i8, tilt_y: i8, tilt_z: i8) -> Self {
        Self {
            tilt_x,
            tilt_y,
            tilt_z,
        }
    }

    pub fn encode(&self) -> [u8; CONTROL_FRAME_LEN] {
        [
            self.tilt_x as u8,
            self.tilt_y as u8,
            self.tilt_z as u8,
        ]
    }

    pub fn decode(data: &[u8]) -> Result<Self, FrameError> {
        let &[x, y, z] = data else {
            return Err(FrameError::ControlLength { len: data.len() });
        };
        Ok(Self::new(x as i8, y as i8, z as i8))
    }
}

/// Host-to-handset instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetColor { target: DeviceAddress, color: Rgb },
}

impl Command {
    pub fn code(&self) -> u8 {
        match self {
            Command::SetColor { .. } => SET_COLOR,
        }
    }

    pub fn target(&self) -> DeviceAddress {
        match self {
            Command::SetColor { target, .. } => *target,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            Command::SetColor { target, color } => {
                let mut data = Vec::with_capacity(SET_COLOR_FRAME_LEN);
                data.push(SET_COLOR);
                data.extend_from_slice(&target.to_be_bytes());
                data.extend_from_slice(&[color.r, color.g, color.b]);
                data
            }
        }
    }

    /// Trailing bytes past the fixed layout are ignored, matching the
    /// fixed-size receive buffers on the handsets.
    pub fn decode(data: &[u8]) -> Result<Self, FrameError> {
        let (&code, rest) = data.split_first().ok_or(FrameError::Empty)?;

        match code {
            SET_COLOR => {
                if data.len() < SET_COLOR_FRAME_LEN {
                    return Err(FrameError::Truncated {
                        code,
                        needed: SET_COLOR_FRAME_LEN,
                        len: data.len(),
                    });
                }
                let mut address = [0u8; 8];
                address.copy_from_slice(&rest[..8]);
                Ok(Command::SetColor {
                    target: DeviceAddress::from_be_bytes(address),
                    color: Rgb::new(rest[8], rest[9], rest[10]),
                })
            }
            other => Err(FrameError::UnknownCommand(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("empty frame")]
    Empty,
    #[error("control frame must be 3 bytes, got {len}")]
    ControlLength { len: usize },
    #[error("command {code} needs {needed} bytes, got {len}")]
    Truncated { code: u8, needed: usize, len: usize },
    #[error("unknown command code {0}")]
    UnknownCommand(u8),
}
