use crate::answers::ReplyOutcome;
use crate::base::{Error, Result};
use crate::checksum::{checksum_of, verify};
use crate::cmds::{has_pass_fail_reply, parameter_shape, OBTAIN_FIRMWARE_VERSION};
use crate::internals::{TFMP_COMMAND_HEADER, TFMP_COMMAND_MAX, TFMP_REPLY_SIZE};
use crate::types::{CommandParameter, CommandSpec, FirmwareVersion, ParameterShape};
use crate::utils::hex_string;
use byteorder::{ByteOrder, LittleEndian};
use log::{error, trace, warn};

/// Offset of the first parameter byte, right after the command number.
const TFMP_PARAM_OFFSET: usize = 3;

/// Offset of the pass/fail flag in system command replies.
const TFMP_PASS_FAIL_OFFSET: usize = 3;

/// Encodes a command and its parameter into the bytes sent to the device.
///
/// The layout is `5A len id [param..] checksum`. The parameter must match the shape the
/// command declares (see [`crate::cmds::parameter_shape`]); commands without a parameter send
/// the payload byte packed into their code. Parameter values are not range checked.
///
/// # Example
/// ```
/// use tfmplus::cmds::{SET_FRAME_RATE, FRAME_20};
/// use tfmplus::types::CommandParameter;
///
/// let bytes = tfmplus::encode_command(SET_FRAME_RATE, CommandParameter::FrameRate(FRAME_20)).unwrap();
/// assert_eq!(bytes, [0x5A, 0x06, 0x03, 0x14, 0x00, 0x77]);
/// ```
pub fn encode_command(spec: CommandSpec, param: CommandParameter) -> Result<Vec<u8>> {
    trace!(
        "Encoding command {:08X} with parameter {:?}",
        spec.code(),
        param
    );
    let command_len = spec.command_len();
    if command_len < 2 || command_len > TFMP_COMMAND_MAX {
        error!(
            "Command {:08X} has invalid length {} (allowed 2..={})",
            spec.code(),
            command_len,
            TFMP_COMMAND_MAX
        );
        return Err(Error::InvalidCommand {
            description: format!("command length {} out of range", command_len),
        });
    }
    if spec.reply_len() > TFMP_REPLY_SIZE {
        error!(
            "Command {:08X} expects a {} byte reply (allowed up to {})",
            spec.code(),
            spec.reply_len(),
            TFMP_REPLY_SIZE
        );
        return Err(Error::InvalidCommand {
            description: format!("reply length {} out of range", spec.reply_len()),
        });
    }

    let shape = parameter_shape(spec);
    let mut bytes = [0u8; TFMP_COMMAND_MAX];
    bytes[0] = TFMP_COMMAND_HEADER;
    bytes[1] = command_len as u8;
    bytes[2] = spec.command_number();
    bytes[TFMP_PARAM_OFFSET] = spec.payload();

    let param_len = match (shape, param) {
        (ParameterShape::None, CommandParameter::None) => 0,
        (ParameterShape::FrameRate, CommandParameter::FrameRate(rate)) => {
            LittleEndian::write_u16(&mut bytes[TFMP_PARAM_OFFSET..TFMP_PARAM_OFFSET + 2], rate);
            2
        }
        (ParameterShape::BaudRate, CommandParameter::BaudRate(baud)) => {
            if baud > 0x00FF_FFFF {
                warn!("Baud rate {} does not fit 24 bits, sending low bits only", baud);
            }
            LittleEndian::write_u24(
                &mut bytes[TFMP_PARAM_OFFSET..TFMP_PARAM_OFFSET + 3],
                baud & 0x00FF_FFFF,
            );
            3
        }
        (ParameterShape::Byte, CommandParameter::RawByte(value)) => {
            bytes[TFMP_PARAM_OFFSET] = value;
            1
        }
        // The packed default payload stands in for an omitted single byte parameter.
        (ParameterShape::Byte, CommandParameter::None) => 1,
        (shape, param) => {
            error!(
                "Parameter {:?} does not match command {:08X} ({:?})",
                param,
                spec.code(),
                shape
            );
            return Err(Error::InvalidCommand {
                description: format!("parameter {:?} does not fit {:?}", param, shape),
            });
        }
    };

    if param_len > 0 && TFMP_PARAM_OFFSET + param_len >= command_len {
        error!(
            "Command {:08X} of length {} has no room for a {} byte parameter",
            spec.code(),
            command_len,
            param_len
        );
        return Err(Error::InvalidCommand {
            description: format!("no room for {} parameter bytes", param_len),
        });
    }

    let mut encoded = bytes[..command_len].to_vec();
    let checksum = checksum_of(&encoded[..command_len - 1]);
    encoded[command_len - 1] = checksum;
    trace!(
        "Encoded command: [{}] (checksum {:02X})",
        hex_string(&encoded),
        checksum
    );
    Ok(encoded)
}

/// Interprets the reply the device sent for `spec`.
///
/// The checksum is checked first and a mismatch ends interpretation. The reply is then read
/// according to the command that was sent:
///
/// * firmware version: bytes 3..6 are patch, minor and major,
/// * reset, restore factory settings and save settings: byte 3 is a fail flag,
/// * anything else is an echo of the command.
pub fn interpret_reply(spec: CommandSpec, reply: &[u8]) -> Result<ReplyOutcome> {
    trace!(
        "Interpreting reply for {:08X}: [{}]",
        spec.code(),
        hex_string(reply)
    );
    let reply_len = spec.reply_len();
    if reply_len == 0 {
        trace!("Command {:08X} has no reply", spec.code());
        return Ok(ReplyOutcome::NoReply);
    }
    if reply_len > TFMP_REPLY_SIZE {
        return Err(Error::InvalidCommand {
            description: format!("reply length {} out of range", reply_len),
        });
    }
    if reply.len() != reply_len {
        error!(
            "Reply length mismatch: expected {}, got {}",
            reply_len,
            reply.len()
        );
        return Err(Error::Length {
            expected: reply_len,
            actual: reply.len(),
        });
    }

    if let Err(e) = verify(reply) {
        error!("Reply checksum failed: {}", e);
        return Err(e);
    }

    if spec == OBTAIN_FIRMWARE_VERSION {
        if reply.len() < 6 {
            return Err(Error::Length {
                expected: 6,
                actual: reply.len(),
            });
        }
        let version = FirmwareVersion {
            major: reply[5],
            minor: reply[4],
            patch: reply[3],
        };
        trace!("Firmware version {}", version);
        return Ok(ReplyOutcome::Version(version));
    }

    if has_pass_fail_reply(spec) {
        let flag = reply.get(TFMP_PASS_FAIL_OFFSET).copied().ok_or(Error::Length {
            expected: TFMP_PASS_FAIL_OFFSET + 1,
            actual: reply.len(),
        })?;
        if flag != 0 {
            warn!(
                "Command {:08X} reported failure (flag {:02X})",
                spec.code(),
                flag
            );
            return Err(Error::CommandFailed { flag });
        }
        trace!("Command {:08X} passed", spec.code());
        return Ok(ReplyOutcome::Passed);
    }

    Ok(ReplyOutcome::Echo(reply.to_vec()))
}
