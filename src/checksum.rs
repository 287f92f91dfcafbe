use crate::base::{Error, Result};

/// Calculates the 8-bit additive checksum used by every TFMini-Plus frame, command and reply.
pub struct Checksum {
    current: u8,
}

impl Checksum {
    /// Creates a new `Checksum` instance, initialized to 0.
    #[inline]
    pub fn new() -> Checksum {
        Checksum { current: 0 }
    }

    /// Adds a slice of bytes to the running sum, modulo 256.
    #[inline]
    pub fn push_slice(&mut self, data: &[u8]) {
        for d in data {
            self.current = self.current.wrapping_add(*d);
        }
    }

    /// Returns the calculated checksum value.
    #[inline]
    pub fn checksum(&self) -> u8 {
        self.current
    }
}

impl Default for Checksum {
    fn default() -> Self {
        Self::new()
    }
}

/// Checksum of all bytes in `data`.
#[inline]
pub fn checksum_of(data: &[u8]) -> u8 {
    let mut checksum = Checksum::new();
    checksum.push_slice(data);
    checksum.checksum()
}

/// Checks that the last byte of `block` is the checksum of the bytes before it.
///
/// An empty block has no checksum byte and fails with [`Error::Length`].
pub fn verify(block: &[u8]) -> Result<()> {
    let (last, body) = block.split_last().ok_or(Error::Length {
        expected: 1,
        actual: 0,
    })?;
    let expected = checksum_of(body);
    if expected != *last {
        return Err(Error::Checksum {
            expected,
            actual: *last,
        });
    }
    Ok(())
}
