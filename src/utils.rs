use crate::base::{Error, Result};
use crate::internals::{TFMP_DEFAULT_RETRY_ATTEMPTS, TFMP_DEFAULT_RETRY_BACKOFF};
use log::{trace, warn};
use std::fmt::Write;
use std::thread;
use std::time::Duration;

/// Formats bytes as space separated upper case hex, e.g. `59 59 64 00`.
pub fn hex_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{:02X}", b);
    }
    out
}

/// Bounded retry settings for a polling caller.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Number of consecutive transport failures tolerated before giving up.
    pub max_attempts: u32,

    /// Pause after each failed attempt.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Creates a `RetryPolicy`.
    ///
    /// # Arguments
    ///
    /// * `max_attempts` - Total attempts, at least one is always made.
    /// * `backoff` - Pause between attempts.
    pub fn new(max_attempts: u32, backoff: Duration) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff,
        }
    }
}

impl Default for RetryPolicy {
    /// Three attempts, two seconds apart.
    fn default() -> RetryPolicy {
        RetryPolicy {
            max_attempts: TFMP_DEFAULT_RETRY_ATTEMPTS,
            backoff: TFMP_DEFAULT_RETRY_BACKOFF,
        }
    }
}

/// Runs `op` until it succeeds, fails with a protocol error, or the policy runs out.
///
/// Only transport faults ([`Error::is_transport`]) are retried. Checksum errors, abnormal
/// readings and device failures are returned at once: they are answers from the device, not
/// a broken bus. `op` receives the zero based attempt number.
///
/// # Example
/// ```ignore
/// let policy = RetryPolicy::default();
/// let measurement = retry(&policy, |_| session.fetch_measurement())?;
/// ```
pub fn retry<T, F>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Result<T>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        trace!("retry: attempt {} of {}", attempt + 1, attempts);
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transport() && attempt + 1 < attempts => {
                warn!(
                    "Attempt {} of {} failed: {}, retrying in {:?}",
                    attempt + 1,
                    attempts,
                    e,
                    policy.backoff
                );
                if !policy.backoff.is_zero() {
                    thread::sleep(policy.backoff);
                }
                attempt += 1;
            }
            Err(e) => {
                if e.is_transport() {
                    warn!("Giving up after {} attempts: {}", attempts, e);
                }
                return Err(e);
            }
        }
    }
}

/// Convenience for callers that hold a bare error and want its status text.
pub fn describe(error: &Error) -> String {
    format!("Status: {} ({})", error.status(), error)
}
