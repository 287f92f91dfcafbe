use crate::types::{CommandSpec, ParameterShape};

// Commands with a reply

/// Request the firmware version. Replies with 7 bytes carrying patch, minor and major.
pub const OBTAIN_FIRMWARE_VERSION: CommandSpec = CommandSpec(0x0001_0407);

/// Reset the device. Replies with a pass/fail byte.
pub const SYSTEM_RESET: CommandSpec = CommandSpec(0x0002_0405);

/// Restore factory settings. Replies with a pass/fail byte.
pub const RESTORE_FACTORY_SETTINGS: CommandSpec = CommandSpec(0x0010_0405);

/// Persist the current settings. Must follow every command that changes a volatile setting.
/// Replies with a pass/fail byte.
pub const SAVE_SETTINGS: CommandSpec = CommandSpec(0x0011_0405);

/// Set the internal measurement rate. Takes a [`ParameterShape::FrameRate`] parameter,
/// replies with an echo.
pub const SET_FRAME_RATE: CommandSpec = CommandSpec(0x0003_0606);

/// Set the UART baud rate. Takes a [`ParameterShape::BaudRate`] parameter, replies with an echo.
pub const SET_BAUD_RATE: CommandSpec = CommandSpec(0x0006_0808);

/// Output format: standard 9 byte frame, distance in cm. Replies with an echo.
pub const STANDARD_FORMAT_CM: CommandSpec = CommandSpec(0x0105_0505);

/// Output format: Pixhawk string. Replies with an echo.
pub const PIXHAWK_FORMAT: CommandSpec = CommandSpec(0x0205_0505);

/// Output format: standard 9 byte frame, distance in mm. Replies with an echo.
pub const STANDARD_FORMAT_MM: CommandSpec = CommandSpec(0x0605_0505);

/// Enable data output. Replies with an echo.
pub const ENABLE_OUTPUT: CommandSpec = CommandSpec(0x0007_0505);

/// Disable data output. Replies with an echo.
pub const DISABLE_OUTPUT: CommandSpec = CommandSpec(0x0107_0505);

/// Change the device bus address. Takes a [`ParameterShape::Byte`] parameter,
/// defaults to `0x10`. Replies with an echo.
pub const SET_I2C_ADDRESS: CommandSpec = CommandSpec(0x100B_0505);

// Commands without a reply

/// Trigger a single measurement. The frame rate must be set to zero first.
pub const TRIGGER_DETECTION: CommandSpec = CommandSpec(0x0004_0400);

/// Switch the device to UART mode (the factory default).
pub const SET_SERIAL_MODE: CommandSpec = CommandSpec(0x000A_0500);

/// Switch the device to I2C slave mode.
pub const SET_I2C_MODE: CommandSpec = CommandSpec(0x010A_0500);

/// Ask for a measurement frame with distance in centimetres.
pub const I2C_FORMAT_CM: CommandSpec = CommandSpec(0x0100_0500);

/// Ask for a measurement frame with distance in millimetres.
pub const I2C_FORMAT_MM: CommandSpec = CommandSpec(0x0600_0500);

// Baud rates for SET_BAUD_RATE

pub const BAUD_9600: u32 = 0x00_2580;
pub const BAUD_14400: u32 = 0x00_3840;
pub const BAUD_19200: u32 = 0x00_4B00;
pub const BAUD_56000: u32 = 0x00_DAC0;
pub const BAUD_115200: u32 = 0x01_C200;
pub const BAUD_460800: u32 = 0x07_0800;
pub const BAUD_921600: u32 = 0x0E_1000;

// Frame rates (Hz) for SET_FRAME_RATE

pub const FRAME_0: u16 = 0x0000;
pub const FRAME_1: u16 = 0x0001;
pub const FRAME_2: u16 = 0x0002;
pub const FRAME_5: u16 = 0x0005;
pub const FRAME_10: u16 = 0x000A;
pub const FRAME_20: u16 = 0x0014;
pub const FRAME_25: u16 = 0x0019;
pub const FRAME_50: u16 = 0x0032;
pub const FRAME_100: u16 = 0x0064;
pub const FRAME_125: u16 = 0x007D;
pub const FRAME_200: u16 = 0x00C8;
pub const FRAME_250: u16 = 0x00FA;
pub const FRAME_500: u16 = 0x01F4;
pub const FRAME_1000: u16 = 0x03E8;

/// Every documented baud rate, slowest first.
pub const BAUD_RATES: [u32; 7] = [
    BAUD_9600,
    BAUD_14400,
    BAUD_19200,
    BAUD_56000,
    BAUD_115200,
    BAUD_460800,
    BAUD_921600,
];

/// Every documented frame rate, slowest first.
pub const FRAME_RATES: [u16; 14] = [
    FRAME_0, FRAME_1, FRAME_2, FRAME_5, FRAME_10, FRAME_20, FRAME_25, FRAME_50, FRAME_100,
    FRAME_125, FRAME_200, FRAME_250, FRAME_500, FRAME_1000,
];

/// Returns the kind of parameter `spec` accepts.
pub fn parameter_shape(spec: CommandSpec) -> ParameterShape {
    match spec {
        SET_FRAME_RATE => ParameterShape::FrameRate,
        SET_BAUD_RATE => ParameterShape::BaudRate,
        SET_I2C_ADDRESS => ParameterShape::Byte,
        _ => ParameterShape::None,
    }
}

/// Returns `true` for commands whose reply carries a pass/fail flag in byte 3.
pub fn has_pass_fail_reply(spec: CommandSpec) -> bool {
    matches!(spec, SYSTEM_RESET | RESTORE_FACTORY_SETTINGS | SAVE_SETTINGS)
}
