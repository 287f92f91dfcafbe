use std::time::Duration;

/// Size of one measurement frame in bytes.
pub const TFMP_FRAME_SIZE: usize = 9;

/// Longest command, checksum included.
pub const TFMP_COMMAND_MAX: usize = 8;

/// Longest command reply.
pub const TFMP_REPLY_SIZE: usize = 8;

/// First byte of every command.
pub const TFMP_COMMAND_HEADER: u8 = 0x5A;

/// First two bytes of every measurement frame. Not checked by the decoder.
pub const TFMP_FRAME_HEADER: [u8; 2] = [0x59, 0x59];

/// Default device address of a TFMini-Plus in I2C mode.
pub const TFMP_DEFAULT_ADDRESS: u8 = 0x10;

/// Default bus port (`/dev/i2c-4` on a Raspberry Pi).
pub const TFMP_DEFAULT_PORT: u32 = 4;

/// Time the device needs to fill its reply registers after a command.
pub const TFMP_DEFAULT_REPLY_DELAY: Duration = Duration::from_millis(2);

/// Consecutive transport failures a polling loop tolerates by default.
pub const TFMP_DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Pause between retry attempts of a polling loop.
pub const TFMP_DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(2);
