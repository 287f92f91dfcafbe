use crate::types::{Measurement, StatusCode};
use std::error;
use std::fmt;
use std::io;

/// The bus operation that was in progress when a transport fault occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportOp {
    /// Opening the bus port.
    Open,
    /// Quick-write probe of the device address.
    Probe,
    /// Block write to the device.
    Write,
    /// Block read from the device.
    Read,
    /// Closing the bus port.
    Close,
}

impl fmt::Display for TransportOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportOp::Open => "open",
            TransportOp::Probe => "probe",
            TransportOp::Write => "write",
            TransportOp::Read => "read",
            TransportOp::Close => "close",
        };
        f.write_str(name)
    }
}

/// Represents errors that can occur while talking to a TFMini-Plus device.
///
/// Every variant maps to exactly one [`StatusCode`] through [`Error::status`].
#[derive(Debug)]
pub enum Error {
    /// The bus transport failed. Contains the operation and the underlying I/O error.
    Transport { op: TransportOp, source: io::Error },

    /// A frame or reply had the wrong number of bytes.
    Length { expected: usize, actual: usize },

    /// The trailing checksum byte did not match the sum of the preceding bytes.
    Checksum { expected: u8, actual: u8 },

    /// The device reported a sentinel value instead of a real reading.
    /// The decoded measurement is still carried for inspection.
    AbnormalReading {
        status: StatusCode,
        measurement: Measurement,
    },

    /// The device answered a system command with a non-zero fail flag.
    CommandFailed { flag: u8 },

    /// The command or its parameter could not be encoded. Contains a description.
    InvalidCommand { description: String },

    /// The device did not acknowledge the probe at the given address.
    NotAcknowledged { address: u8 },

    /// The session has not been configured with a reachable device.
    NotConfigured,
}

impl Error {
    /// Returns the status code that describes this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Transport { op, source } => {
                if source.kind() == io::ErrorKind::TimedOut {
                    return StatusCode::Timeout;
                }
                match op {
                    TransportOp::Write => StatusCode::I2CWrite,
                    TransportOp::Read => StatusCode::I2CRead,
                    TransportOp::Open | TransportOp::Probe | TransportOp::Close => {
                        StatusCode::Serial
                    }
                }
            }
            Error::Length { .. } => StatusCode::I2CLength,
            Error::Checksum { .. } => StatusCode::Checksum,
            Error::AbnormalReading { status, .. } => *status,
            Error::CommandFailed { .. } => StatusCode::Fail,
            Error::InvalidCommand { .. } => StatusCode::Fail,
            Error::NotAcknowledged { .. } => StatusCode::Serial,
            Error::NotConfigured => StatusCode::Serial,
        }
    }

    /// Returns `true` for faults raised by the bus rather than by the protocol.
    ///
    /// These are the "unexpected" failures a polling caller may want to retry.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }

    pub(crate) fn transport(op: TransportOp, source: io::Error) -> Error {
        Error::Transport { op, source }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport { op, source } => write!(f, "bus {} failed: {}", op, source),
            Error::Length { expected, actual } => write!(
                f,
                "length mismatch: expected {} bytes, got {}",
                expected, actual
            ),
            Error::Checksum { expected, actual } => write!(
                f,
                "checksum mismatch: expected {:02X}, got {:02X}",
                expected, actual
            ),
            Error::AbnormalReading { status, measurement } => write!(
                f,
                "abnormal reading ({}): dist={} flux={}",
                status, measurement.distance, measurement.strength
            ),
            Error::CommandFailed { flag } => write!(f, "device reported failure (flag {:02X})", flag),
            Error::InvalidCommand { description } => write!(f, "invalid command: {}", description),
            Error::NotAcknowledged { address } => {
                write!(f, "no acknowledge from device at {:#04X}", address)
            }
            Error::NotConfigured => write!(f, "session is not configured"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Transport { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A specialized `Result` type for TFMini-Plus operations.
pub type Result<T> = std::result::Result<T, Error>;
