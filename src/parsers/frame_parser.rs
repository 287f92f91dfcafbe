use crate::base::{Error, Result};
use crate::checksum::verify;
use crate::internals::{TFMP_FRAME_HEADER, TFMP_FRAME_SIZE};
use crate::types::{Measurement, StatusCode};
use crate::utils::hex_string;
use byteorder::{ByteOrder, LittleEndian};
use log::{error, trace, warn};

/// Distance reported when the signal strength is too low.
pub const DIST_SENTINEL_WEAK: i16 = -1;

/// Signal strength reported when the receiver is saturated.
pub const FLUX_SENTINEL_STRONG: i16 = -1;

/// Distance reported when ambient light saturates the receiver.
pub const DIST_SENTINEL_FLOOD: i16 = -4;

/// Converts the raw temperature code to degrees Celsius.
#[inline]
pub fn temperature_celsius(raw: i16) -> i16 {
    (raw >> 3) - 256
}

/// Returns `true` if `frame` starts with the `59 59` frame header.
///
/// The decoder does not require the header; this is for diagnostics only.
#[inline]
pub fn has_frame_header(frame: &[u8]) -> bool {
    frame.starts_with(&TFMP_FRAME_HEADER)
}

/// Classifies a decoded measurement by the device's sentinel values.
///
/// Checked in order: weak signal (distance -1), saturated signal (strength -1) and ambient
/// light flood (distance -4). Saturation is detected on strength only; a distance of -2
/// is passed through as a reading.
pub fn classify(measurement: &Measurement) -> StatusCode {
    if measurement.distance == DIST_SENTINEL_WEAK {
        StatusCode::Weak
    } else if measurement.strength == FLUX_SENTINEL_STRONG {
        StatusCode::Strong
    } else if measurement.distance == DIST_SENTINEL_FLOOD {
        StatusCode::Flood
    } else {
        StatusCode::Ready
    }
}

/// Decodes a 9 byte measurement frame.
///
/// Frame layout:
///
/// | 0  | 1  | 2      | 3      | 4      | 5      | 6      | 7      | 8        |
/// |----|----|--------|--------|--------|--------|--------|--------|----------|
/// | 59 | 59 | Dist_L | Dist_H | Flux_L | Flux_H | Temp_L | Temp_H | Checksum |
///
/// An abnormal reading is returned as [`Error::AbnormalReading`] with the decoded values.
pub fn decode_frame(frame: &[u8]) -> Result<Measurement> {
    trace!("Decoding frame [{}]", hex_string(frame));
    if frame.len() != TFMP_FRAME_SIZE {
        error!(
            "Frame length mismatch: expected {}, got {}",
            TFMP_FRAME_SIZE,
            frame.len()
        );
        return Err(Error::Length {
            expected: TFMP_FRAME_SIZE,
            actual: frame.len(),
        });
    }

    if let Err(e) = verify(frame) {
        error!("Frame checksum failed: {}", e);
        return Err(e);
    }

    let temperature_raw = LittleEndian::read_i16(&frame[6..8]);
    let measurement = Measurement {
        distance: LittleEndian::read_i16(&frame[2..4]),
        strength: LittleEndian::read_i16(&frame[4..6]),
        temperature_raw,
        temperature: temperature_celsius(temperature_raw),
    };
    trace!(
        "Decoded measurement: dist={}, flux={}, temp={}C (raw {:04X})",
        measurement.distance,
        measurement.strength,
        measurement.temperature,
        measurement.temperature_raw
    );

    match classify(&measurement) {
        StatusCode::Ready => Ok(measurement),
        status => {
            warn!("Abnormal reading: {} ({:?})", status, measurement);
            Err(Error::AbnormalReading {
                status,
                measurement,
            })
        }
    }
}
