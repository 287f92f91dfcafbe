use crate::types::FirmwareVersion;

/// Interpreted answer to a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// The command has no reply; nothing was read back.
    NoReply,
    /// Answer to `OBTAIN_FIRMWARE_VERSION`.
    Version(FirmwareVersion),
    /// A system command (reset, restore, save) reported success.
    Passed,
    /// The device echoed the command. Contains the raw reply bytes.
    Echo(Vec<u8>),
}

impl ReplyOutcome {
    /// Returns the firmware version carried by this outcome, if any.
    pub fn version(&self) -> Option<FirmwareVersion> {
        match self {
            ReplyOutcome::Version(version) => Some(*version),
            _ => None,
        }
    }
}
