use crate::internals::{TFMP_DEFAULT_ADDRESS, TFMP_DEFAULT_PORT, TFMP_DEFAULT_REPLY_DELAY};
use std::fmt;
use std::time::Duration;

/// Bus address of a TFMini-Plus device (7-bit I2C address).
pub type DeviceAddress = u8;

/// Identifier of a bus port, e.g. `4` for `/dev/i2c-4`.
pub type BusPort = u32;

/// Outcome of the most recent device operation.
///
/// The numeric values are stable and match the codes printed by the device tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StatusCode {
    /// No error.
    Ready = 0,
    /// Serial or bus port unavailable.
    Serial = 1,
    /// No frame header found.
    Header = 2,
    /// Checksum does not match.
    Checksum = 3,
    /// Bus timeout.
    Timeout = 4,
    /// System command passed.
    Pass = 5,
    /// System command failed.
    Fail = 6,
    /// Bus read failure.
    I2CRead = 7,
    /// Bus write failure.
    I2CWrite = 8,
    /// Bus block had the wrong length.
    I2CLength = 9,
    /// Signal strength too low.
    Weak = 10,
    /// Signal strength saturated.
    Strong = 11,
    /// Ambient light saturated.
    Flood = 12,
    /// Measurement error.
    Measure = 13,
}

impl StatusCode {
    /// Returns the numeric status code.
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl Default for StatusCode {
    fn default() -> StatusCode {
        StatusCode::Ready
    }
}

impl TryFrom<u8> for StatusCode {
    type Error = u8;

    fn try_from(code: u8) -> Result<StatusCode, u8> {
        let status = match code {
            0 => StatusCode::Ready,
            1 => StatusCode::Serial,
            2 => StatusCode::Header,
            3 => StatusCode::Checksum,
            4 => StatusCode::Timeout,
            5 => StatusCode::Pass,
            6 => StatusCode::Fail,
            7 => StatusCode::I2CRead,
            8 => StatusCode::I2CWrite,
            9 => StatusCode::I2CLength,
            10 => StatusCode::Weak,
            11 => StatusCode::Strong,
            12 => StatusCode::Flood,
            13 => StatusCode::Measure,
            other => return Err(other),
        };
        Ok(status)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StatusCode::Ready => "READY",
            StatusCode::Serial => "SERIAL",
            StatusCode::Header => "HEADER",
            StatusCode::Checksum => "CHECKSUM",
            StatusCode::Timeout => "TIMEOUT",
            StatusCode::Pass => "PASS",
            StatusCode::Fail => "FAIL",
            StatusCode::I2CRead => "I2C-READ",
            StatusCode::I2CWrite => "I2C-WRITE",
            StatusCode::I2CLength => "I2C-LENGTH",
            StatusCode::Weak => "Signal weak",
            StatusCode::Strong => "Signal saturation",
            StatusCode::Flood => "Ambient light saturation",
            StatusCode::Measure => "MEASURE",
        };
        f.write_str(text)
    }
}

/// A single reading decoded from a measurement frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Measurement {
    /// Distance to target, in the unit requested by the trigger (centimetres by default).
    /// Negative values are device sentinels.
    pub distance: i16,
    /// Signal strength ("flux") in arbitrary units. `-1` signals saturation.
    pub strength: i16,
    /// Raw temperature code as sent by the device.
    pub temperature_raw: i16,
    /// Chip temperature in degrees Celsius, `(temperature_raw >> 3) - 256`.
    pub temperature: i16,
}

/// Firmware version reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Unit of the distance field requested from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceUnit {
    Centimeters,
    Millimeters,
}

impl Default for DistanceUnit {
    fn default() -> DistanceUnit {
        DistanceUnit::Centimeters
    }
}

/// A device command packed into 32 bits.
///
/// Read little-endian, the four bytes are: expected reply length, total command length,
/// command number and a single inline payload byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandSpec(pub u32);

impl CommandSpec {
    /// Returns the packed command code.
    #[inline]
    pub const fn code(self) -> u32 {
        self.0
    }

    /// Number of bytes the device answers with; zero when there is no reply.
    #[inline]
    pub const fn reply_len(self) -> usize {
        (self.0 & 0xFF) as usize
    }

    /// Total length of the encoded command, checksum included.
    #[inline]
    pub const fn command_len(self) -> usize {
        ((self.0 >> 8) & 0xFF) as usize
    }

    /// Command identifier placed in byte 2 of the encoded command.
    #[inline]
    pub const fn command_number(self) -> u8 {
        ((self.0 >> 16) & 0xFF) as u8
    }

    /// Inline payload byte used when no parameter is supplied.
    #[inline]
    pub const fn payload(self) -> u8 {
        ((self.0 >> 24) & 0xFF) as u8
    }

    /// Returns `true` if the device sends a reply to this command.
    #[inline]
    pub const fn expects_reply(self) -> bool {
        self.reply_len() != 0
    }
}

/// Kind of parameter a command accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterShape {
    /// No parameter; the packed payload byte is sent as is.
    None,
    /// Two byte little-endian frame rate in Hz.
    FrameRate,
    /// Three byte little-endian baud rate.
    BaudRate,
    /// A single byte replacing the packed payload byte.
    Byte,
}

/// Parameter passed along with a command.
///
/// Values are sent as given. Use the constants in [`crate::cmds`]; values outside the
/// documented lists can leave the device unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandParameter {
    None,
    /// Frame rate in Hz.
    FrameRate(u16),
    /// Baud rate in bits per second, only the low 24 bits are sent.
    BaudRate(u32),
    /// Single raw byte, e.g. a new bus address.
    RawByte(u8),
}

impl Default for CommandParameter {
    fn default() -> CommandParameter {
        CommandParameter::None
    }
}

/// Lifecycle state of a [`crate::Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No device has acknowledged a probe yet.
    Unconfigured,
    /// The configured device acknowledged the last probe.
    Configured,
}

/// Settings used when creating a [`crate::Session`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Bus port number.
    pub port: BusPort,

    /// Device bus address.
    pub address: DeviceAddress,

    /// Time given to the device to fill its reply registers after a command.
    pub reply_delay: Duration,
}

impl SessionConfig {
    /// Creates a `SessionConfig` for `address` on `port` with the default reply delay.
    ///
    /// # Arguments
    ///
    /// * `port` - The bus port number.
    /// * `address` - The device bus address.
    pub fn new(port: BusPort, address: DeviceAddress) -> SessionConfig {
        SessionConfig {
            port,
            address,
            ..SessionConfig::default()
        }
    }

    /// Returns a copy with a different reply delay.
    pub fn with_reply_delay(mut self, reply_delay: Duration) -> SessionConfig {
        self.reply_delay = reply_delay;
        self
    }
}

impl Default for SessionConfig {
    /// Port 4, address `0x10`, 2 ms reply delay.
    fn default() -> SessionConfig {
        SessionConfig {
            port: TFMP_DEFAULT_PORT,
            address: TFMP_DEFAULT_ADDRESS,
            reply_delay: TFMP_DEFAULT_REPLY_DELAY,
        }
    }
}
