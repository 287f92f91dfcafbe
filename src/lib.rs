//! # TFMini-Plus Driver
//!
//! `tfmplus` talks to a Benewake TFMini-Plus time-of-flight range finder over a register/block
//! bus such as I2C. It encodes device commands, decodes measurement frames and command replies,
//! validates their checksums and turns raw values into a typed [`StatusCode`].
//!
//! The bus itself is supplied by the caller through the [`BusTransport`] trait. A [`Session`]
//! owns the bus configuration and the most recent status, measurement and firmware version.

extern crate byteorder;
extern crate log;

mod answers;
pub mod base;
mod checksum;
pub mod cmds;
mod internals;
pub mod parsers;
mod protocol;
pub mod types;
pub mod utils;

pub use crate::answers::ReplyOutcome;
pub use crate::base::{BusTransport, Channel, Error, Result, TransportOp};
pub use crate::checksum::{checksum_of, Checksum};
pub use crate::parsers::frame_parser::decode_frame;
pub use crate::protocol::{encode_command, interpret_reply};
pub use crate::types::{
    BusPort, CommandParameter, CommandSpec, DeviceAddress, DistanceUnit, FirmwareVersion,
    Measurement, SessionConfig, SessionState, StatusCode,
};

use crate::cmds::{I2C_FORMAT_CM, I2C_FORMAT_MM};
use crate::internals::TFMP_FRAME_SIZE;
use crate::parsers::frame_parser::has_frame_header;
use crate::utils::{describe, hex_string};
use log::{debug, error, trace, warn};
use std::time::Duration;

/// Connection to and control interface for one TFMini-Plus device.
///
/// A session starts [`SessionState::Unconfigured`]; [`Session::configure`] probes the device
/// and unlocks [`Session::fetch_measurement`] and [`Session::send_command`]. Every operation
/// takes `&mut self`, so a session never has two exchanges in flight.
///
/// # Example
/// ```ignore
/// # use tfmplus::{Session, SessionConfig, cmds};
/// let mut session = Session::new(bus, SessionConfig::default());
/// session.configure(4, 0x10)?;
/// let version = session.send_command(cmds::OBTAIN_FIRMWARE_VERSION, Default::default())?;
/// let measurement = session.fetch_measurement()?;
/// println!("{} cm", measurement.distance);
/// ```
#[derive(Debug)]
pub struct Session<T> {
    channel: Channel<T>,
    state: SessionState,
    reply_delay: Duration,
    status: StatusCode,
    measurement: Measurement,
    version: Option<FirmwareVersion>,
    last_frame: Vec<u8>,
    last_reply: Vec<u8>,
}

impl<T: BusTransport> Session<T> {
    /// Creates an unconfigured session from a transport and settings.
    ///
    /// # Arguments
    ///
    /// * `transport` - The bus implementation.
    /// * `config` - Default port, address and reply delay.
    pub fn new(transport: T, config: SessionConfig) -> Session<T> {
        trace!("Creating new Session with {:?}", config);
        Session {
            channel: Channel::new(transport, config.port, config.address),
            state: SessionState::Unconfigured,
            reply_delay: config.reply_delay,
            status: StatusCode::Ready,
            measurement: Measurement::default(),
            version: None,
            last_frame: Vec::with_capacity(TFMP_FRAME_SIZE),
            last_reply: Vec::new(),
        }
    }

    /// Creates an unconfigured session with [`SessionConfig::default`].
    pub fn with_transport(transport: T) -> Session<T> {
        Session::new(transport, SessionConfig::default())
    }

    /// Sets the bus port and device address and checks that the device answers.
    ///
    /// The new port and address are kept even when the probe fails. The session becomes
    /// [`SessionState::Configured`] only if the device acknowledges.
    pub fn configure(&mut self, port: BusPort, address: DeviceAddress) -> Result<()> {
        debug!("Configuring session: port {}, address {:#04X}", port, address);
        self.channel.set_target(port, address);
        self.state = SessionState::Unconfigured;

        let acknowledged = match self.channel.probe() {
            Ok(acknowledged) => acknowledged,
            Err(e) => return Err(self.fail(e)),
        };
        if !acknowledged {
            warn!("No device acknowledged at {:#04X} on port {}", address, port);
            return Err(self.fail(Error::NotAcknowledged { address }));
        }

        trace!("Device at {:#04X} acknowledged", address);
        self.state = SessionState::Configured;
        self.status = StatusCode::Ready;
        Ok(())
    }

    /// Reads one measurement with distance in centimetres.
    ///
    /// On an abnormal reading (weak signal, saturation, ambient flood) the decoded values are
    /// still stored and available through [`Session::measurement`], while the call fails with
    /// [`Error::AbnormalReading`].
    pub fn fetch_measurement(&mut self) -> Result<Measurement> {
        self.fetch_measurement_in(DistanceUnit::Centimeters)
    }

    /// Reads one measurement with distance in the given unit.
    pub fn fetch_measurement_in(&mut self, unit: DistanceUnit) -> Result<Measurement> {
        trace!("Fetching measurement in {:?}", unit);
        self.ensure_configured()?;
        self.status = StatusCode::Ready;

        let trigger = match unit {
            DistanceUnit::Centimeters => I2C_FORMAT_CM,
            DistanceUnit::Millimeters => I2C_FORMAT_MM,
        };
        let request = match encode_command(trigger, CommandParameter::None) {
            Ok(request) => request,
            Err(e) => return Err(self.fail(e)),
        };

        let frame = match self.channel.transact(&request, TFMP_FRAME_SIZE) {
            Ok(frame) => frame,
            Err(e) => {
                if !self.channel.last_received().is_empty() {
                    self.last_frame = self.channel.last_received().to_vec();
                }
                return Err(self.fail(e));
            }
        };
        if !has_frame_header(&frame) {
            debug!("Frame without 59 59 header: [{}]", hex_string(&frame));
        }
        self.last_frame = frame;

        match decode_frame(&self.last_frame) {
            Ok(measurement) => {
                self.measurement = measurement;
                self.status = StatusCode::Ready;
                Ok(measurement)
            }
            Err(e) => {
                if let Error::AbnormalReading { measurement, .. } = &e {
                    self.measurement = *measurement;
                }
                Err(self.fail(e))
            }
        }
    }

    /// Sends a command and interprets the reply.
    ///
    /// Commands without a reply return [`ReplyOutcome::NoReply`] right after the write.
    /// Otherwise the session waits for the configured reply delay, reads the reply and
    /// interprets it; a firmware version reply also updates [`Session::firmware_version`].
    ///
    /// # Arguments
    ///
    /// * `spec` - A command from [`cmds`].
    /// * `param` - The command's parameter, [`CommandParameter::None`] if it takes none.
    pub fn send_command(
        &mut self,
        spec: CommandSpec,
        param: CommandParameter,
    ) -> Result<ReplyOutcome> {
        trace!("Sending command {:08X} with {:?}", spec.code(), param);
        self.ensure_configured()?;
        self.status = StatusCode::Ready;

        let request = match encode_command(spec, param) {
            Ok(request) => request,
            Err(e) => return Err(self.fail(e)),
        };

        let reply = match self
            .channel
            .invoke(&request, spec.reply_len(), self.reply_delay)
        {
            Ok(reply) => reply,
            Err(e) => {
                if !self.channel.last_received().is_empty() {
                    self.last_reply = self.channel.last_received().to_vec();
                }
                return Err(self.fail(e));
            }
        };
        if !spec.expects_reply() {
            trace!("Command {:08X} sent, no reply expected", spec.code());
            return Ok(ReplyOutcome::NoReply);
        }
        self.last_reply = reply;

        match interpret_reply(spec, &self.last_reply) {
            Ok(outcome) => {
                if let ReplyOutcome::Version(version) = &outcome {
                    debug!("Firmware version {}", version);
                    self.version = Some(*version);
                }
                self.status = StatusCode::Ready;
                Ok(outcome)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Status of the most recent operation.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Most recent measurement, including abnormal ones.
    pub fn measurement(&self) -> Measurement {
        self.measurement
    }

    /// Firmware version from the last successful version query.
    pub fn firmware_version(&self) -> Option<FirmwareVersion> {
        self.version
    }

    /// Raw bytes of the last frame read, for diagnostics.
    ///
    /// Also updated when the read itself failed after bytes arrived, e.g. a short block or a
    /// port that could not be closed.
    pub fn last_frame(&self) -> &[u8] {
        &self.last_frame
    }

    /// Raw bytes of the last command reply read, for diagnostics. Updated like
    /// [`Session::last_frame`].
    pub fn last_reply(&self) -> &[u8] {
        &self.last_reply
    }

    /// Configured bus port.
    pub fn port(&self) -> BusPort {
        self.channel.port()
    }

    /// Configured device address.
    pub fn address(&self) -> DeviceAddress {
        self.channel.address()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns `true` once a device has acknowledged [`Session::configure`].
    pub fn is_configured(&self) -> bool {
        self.state == SessionState::Configured
    }

    /// Borrow the underlying transport.
    pub fn transport(&self) -> &T {
        self.channel.transport()
    }

    /// Mutably borrow the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        self.channel.transport_mut()
    }

    /// Consume the session and return the transport.
    pub fn into_transport(self) -> T {
        self.channel.into_transport()
    }

    fn ensure_configured(&mut self) -> Result<()> {
        if self.state == SessionState::Configured {
            Ok(())
        } else {
            error!("Session used before a device was configured");
            Err(self.fail(Error::NotConfigured))
        }
    }

    /// Records the status of `err` and hands it back.
    fn fail(&mut self, err: Error) -> Error {
        self.status = err.status();
        debug!("Operation failed. {}", describe(&err));
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmds::*;
    use std::collections::VecDeque;
    use std::io;

    #[derive(Debug, Clone, PartialEq)]
    enum BusEvent {
        Open(BusPort),
        Probe(DeviceAddress),
        Write(DeviceAddress, Vec<u8>),
        Read(DeviceAddress, usize),
        Close,
    }

    /// Scripted bus: replays queued read blocks and records every call.
    #[derive(Debug, Default)]
    struct MockBus {
        events: Vec<BusEvent>,
        reads: VecDeque<io::Result<Vec<u8>>>,
        acknowledge: bool,
        fail_open: bool,
        fail_write: bool,
        fail_close: bool,
    }

    impl MockBus {
        fn acknowledging() -> MockBus {
            MockBus {
                acknowledge: true,
                ..MockBus::default()
            }
        }

        fn queue_read(&mut self, bytes: &[u8]) {
            self.reads.push_back(Ok(bytes.to_vec()));
        }

        fn writes(&self) -> Vec<Vec<u8>> {
            self.events
                .iter()
                .filter_map(|e| match e {
                    BusEvent::Write(_, bytes) => Some(bytes.clone()),
                    _ => None,
                })
                .collect()
        }
    }

    impl BusTransport for MockBus {
        type Handle = ();

        fn open(&mut self, port: BusPort) -> io::Result<()> {
            self.events.push(BusEvent::Open(port));
            if self.fail_open {
                return Err(io::Error::new(io::ErrorKind::NotFound, "no such bus"));
            }
            Ok(())
        }

        fn probe(&mut self, _: &mut (), address: DeviceAddress) -> io::Result<bool> {
            self.events.push(BusEvent::Probe(address));
            Ok(self.acknowledge)
        }

        fn write_block(&mut self, _: &mut (), address: DeviceAddress, bytes: &[u8]) -> io::Result<()> {
            self.events.push(BusEvent::Write(address, bytes.to_vec()));
            if self.fail_write {
                return Err(io::Error::new(io::ErrorKind::Other, "nack"));
            }
            Ok(())
        }

        fn read_block(&mut self, _: &mut (), address: DeviceAddress, len: usize) -> io::Result<Vec<u8>> {
            self.events.push(BusEvent::Read(address, len));
            self.reads
                .pop_front()
                .unwrap_or_else(|| Err(io::Error::from(io::ErrorKind::TimedOut)))
        }

        fn close(&mut self, _: ()) -> io::Result<()> {
            self.events.push(BusEvent::Close);
            if self.fail_close {
                return Err(io::Error::new(io::ErrorKind::Other, "busy"));
            }
            Ok(())
        }
    }

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn with_checksum(body: &[u8]) -> Vec<u8> {
        let mut block = body.to_vec();
        block.push(checksum_of(body));
        block
    }

    fn configured_session(bus: MockBus) -> Session<MockBus> {
        let config = SessionConfig::default().with_reply_delay(Duration::ZERO);
        let mut session = Session::new(bus, config);
        session.configure(1, 0x10).unwrap();
        session.transport_mut().events.clear();
        session
    }

    #[test]
    fn configure_probes_and_closes() {
        init_logger();
        let mut session = Session::with_transport(MockBus::acknowledging());
        assert_eq!(session.state(), SessionState::Unconfigured);

        session.configure(1, 0x11).unwrap();
        assert!(session.is_configured());
        assert_eq!(session.port(), 1);
        assert_eq!(session.address(), 0x11);
        assert_eq!(
            session.transport().events,
            [BusEvent::Open(1), BusEvent::Probe(0x11), BusEvent::Close]
        );
    }

    #[test]
    fn configure_keeps_target_when_probe_fails() {
        init_logger();
        let mut session = Session::with_transport(MockBus::default());
        let err = session.configure(3, 0x22).unwrap_err();
        assert!(matches!(err, Error::NotAcknowledged { address: 0x22 }));
        assert_eq!(session.status(), StatusCode::Serial);
        assert_eq!(session.port(), 3);
        assert_eq!(session.address(), 0x22);
        assert!(!session.is_configured());
    }

    #[test]
    fn configure_reports_missing_bus() {
        let bus = MockBus {
            fail_open: true,
            ..MockBus::acknowledging()
        };
        let mut session = Session::with_transport(bus);
        let err = session.configure(9, 0x10).unwrap_err();
        assert!(err.is_transport());
        assert_eq!(session.status(), StatusCode::Serial);
        assert_eq!(session.port(), 9);
    }

    #[test]
    fn operations_require_configuration() {
        let mut session = Session::with_transport(MockBus::acknowledging());
        assert!(matches!(
            session.fetch_measurement(),
            Err(Error::NotConfigured)
        ));
        assert!(matches!(
            session.send_command(SYSTEM_RESET, CommandParameter::None),
            Err(Error::NotConfigured)
        ));
        assert_eq!(session.status(), StatusCode::Serial);
        assert!(session.transport().events.is_empty());
    }

    #[test]
    fn fetch_measurement_in_one_transaction() {
        init_logger();
        let mut bus = MockBus::acknowledging();
        bus.queue_read(&with_checksum(&[0x59, 0x59, 0x64, 0x00, 0xC8, 0x00, 0x98, 0x08]));
        let mut session = configured_session(bus);

        let measurement = session.fetch_measurement().unwrap();
        assert_eq!(measurement.distance, 100);
        assert_eq!(measurement.strength, 200);
        assert_eq!(measurement.temperature, 19);
        assert_eq!(session.status(), StatusCode::Ready);
        assert_eq!(session.measurement(), measurement);
        assert_eq!(session.last_frame().len(), 9);
        assert_eq!(
            session.transport().events,
            [
                BusEvent::Open(1),
                BusEvent::Write(0x10, vec![0x5A, 0x05, 0x00, 0x01, 0x60]),
                BusEvent::Read(0x10, 9),
                BusEvent::Close,
            ]
        );
    }

    #[test]
    fn fetch_measurement_in_millimeters() {
        let mut bus = MockBus::acknowledging();
        bus.queue_read(&with_checksum(&[0x59, 0x59, 0xE8, 0x03, 0xC8, 0x00, 0x98, 0x08]));
        let mut session = configured_session(bus);

        let measurement = session.fetch_measurement_in(DistanceUnit::Millimeters).unwrap();
        assert_eq!(measurement.distance, 1000);
        assert_eq!(
            session.transport().writes(),
            [vec![0x5Au8, 0x05, 0x00, 0x06, 0x65]]
        );
    }

    #[test]
    fn fetch_measurement_checksum_error() {
        let mut bus = MockBus::acknowledging();
        let mut frame = with_checksum(&[0x59, 0x59, 0x64, 0x00, 0xC8, 0x00, 0x98, 0x08]);
        frame[8] ^= 0x01;
        bus.queue_read(&frame);
        let mut session = configured_session(bus);

        let err = session.fetch_measurement().unwrap_err();
        assert_eq!(err.status(), StatusCode::Checksum);
        assert_eq!(session.status(), StatusCode::Checksum);
        assert_eq!(session.last_frame(), frame.as_slice());
    }

    #[test]
    fn abnormal_reading_is_stored_but_fails() {
        let mut bus = MockBus::acknowledging();
        bus.queue_read(&with_checksum(&[0x59, 0x59, 0xFF, 0xFF, 0x10, 0x00, 0x98, 0x08]));
        let mut session = configured_session(bus);

        let err = session.fetch_measurement().unwrap_err();
        assert_eq!(err.status(), StatusCode::Weak);
        assert_eq!(session.status(), StatusCode::Weak);
        assert_eq!(session.measurement().distance, -1);
        assert_eq!(session.measurement().strength, 16);
    }

    #[test]
    fn short_read_is_a_length_error() {
        let mut bus = MockBus::acknowledging();
        bus.queue_read(&[0x59, 0x59, 0x64]);
        let mut session = configured_session(bus);

        session.fetch_measurement().unwrap_err();
        assert_eq!(session.status(), StatusCode::I2CLength);
        assert_eq!(session.last_frame(), [0x59u8, 0x59, 0x64]);
    }

    #[test]
    fn frame_is_kept_when_close_fails() {
        let mut bus = MockBus::acknowledging();
        let frame = with_checksum(&[0x59, 0x59, 0x64, 0x00, 0xC8, 0x00, 0x98, 0x08]);
        bus.queue_read(&frame);
        let mut session = configured_session(bus);
        session.transport_mut().fail_close = true;

        let err = session.fetch_measurement().unwrap_err();
        assert!(matches!(
            err,
            Error::Transport {
                op: TransportOp::Close,
                ..
            }
        ));
        assert_eq!(session.status(), StatusCode::Serial);
        assert_eq!(session.last_frame(), frame.as_slice());
    }

    #[test]
    fn read_timeout_maps_to_timeout() {
        let mut session = configured_session(MockBus::acknowledging());
        session.fetch_measurement().unwrap_err();
        assert_eq!(session.status(), StatusCode::Timeout);
    }

    #[test]
    fn write_failure_maps_to_i2c_write() {
        let bus = MockBus {
            fail_write: true,
            ..MockBus::acknowledging()
        };
        let mut session = configured_session(bus);
        let err = session
            .send_command(ENABLE_OUTPUT, CommandParameter::None)
            .unwrap_err();
        assert!(err.is_transport());
        assert_eq!(session.status(), StatusCode::I2CWrite);
        assert_eq!(session.transport().events.last(), Some(&BusEvent::Close));
    }

    #[test]
    fn firmware_version_is_stored() {
        init_logger();
        let mut bus = MockBus::acknowledging();
        bus.queue_read(&with_checksum(&[0x5A, 0x07, 0x01, 0x07, 0x00, 0x00]));
        let mut session = configured_session(bus);

        let outcome = session
            .send_command(OBTAIN_FIRMWARE_VERSION, CommandParameter::None)
            .unwrap();
        assert_eq!(outcome.version().unwrap().to_string(), "0.0.7");
        assert_eq!(session.firmware_version().unwrap().to_string(), "0.0.7");
        assert_eq!(
            session.transport().events,
            [
                BusEvent::Open(1),
                BusEvent::Write(0x10, vec![0x5A, 0x04, 0x01, 0x5F]),
                BusEvent::Close,
                BusEvent::Open(1),
                BusEvent::Read(0x10, 7),
                BusEvent::Close,
            ]
        );
    }

    #[test]
    fn reset_failure_flag() {
        let mut bus = MockBus::acknowledging();
        bus.queue_read(&with_checksum(&[0x5A, 0x05, 0x02, 0x01]));
        let mut session = configured_session(bus);

        let err = session
            .send_command(SYSTEM_RESET, CommandParameter::None)
            .unwrap_err();
        assert!(matches!(err, Error::CommandFailed { flag: 1 }));
        assert_eq!(session.status(), StatusCode::Fail);
        assert_eq!(session.last_reply().len(), 5);
    }

    #[test]
    fn command_without_reply_skips_read() {
        let mut session = configured_session(MockBus::acknowledging());
        let outcome = session
            .send_command(SET_I2C_MODE, CommandParameter::None)
            .unwrap();
        assert_eq!(outcome, ReplyOutcome::NoReply);
        assert_eq!(session.status(), StatusCode::Ready);
        assert!(!session
            .transport()
            .events
            .iter()
            .any(|e| matches!(e, BusEvent::Read(..))));
    }

    #[test]
    fn frame_rate_echo() {
        let mut bus = MockBus::acknowledging();
        let echo = with_checksum(&[0x5A, 0x06, 0x03, 0x14, 0x00]);
        bus.queue_read(&echo);
        let mut session = configured_session(bus);

        let outcome = session
            .send_command(SET_FRAME_RATE, CommandParameter::FrameRate(FRAME_20))
            .unwrap();
        assert_eq!(outcome, ReplyOutcome::Echo(echo));
        assert_eq!(
            session.transport().writes(),
            [vec![0x5Au8, 0x06, 0x03, 0x14, 0x00, 0x77]]
        );
    }

    #[test]
    fn invalid_parameter_never_reaches_the_bus() {
        let mut session = configured_session(MockBus::acknowledging());
        let err = session
            .send_command(SYSTEM_RESET, CommandParameter::BaudRate(BAUD_9600))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCommand { .. }));
        assert_eq!(session.status(), StatusCode::Fail);
        assert!(session.transport().events.is_empty());
    }

    #[test]
    fn oversized_reply_never_reaches_the_bus() {
        let mut session = configured_session(MockBus::acknowledging());
        let err = session
            .send_command(CommandSpec(0x0000_04FF), CommandParameter::None)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCommand { .. }));
        assert_eq!(session.status(), StatusCode::Fail);
        assert!(session.transport().events.is_empty());
    }

    #[test]
    fn status_resets_after_success() {
        let mut bus = MockBus::acknowledging();
        let mut bad = with_checksum(&[0x59, 0x59, 0x64, 0x00, 0xC8, 0x00, 0x98, 0x08]);
        bad[8] ^= 0xFF;
        bus.queue_read(&bad);
        bus.queue_read(&with_checksum(&[0x59, 0x59, 0x64, 0x00, 0xC8, 0x00, 0x98, 0x08]));
        let mut session = configured_session(bus);

        session.fetch_measurement().unwrap_err();
        assert_eq!(session.status(), StatusCode::Checksum);
        session.fetch_measurement().unwrap();
        assert_eq!(session.status(), StatusCode::Ready);
    }

    #[test]
    fn retry_around_session() {
        let mut bus = MockBus::acknowledging();
        bus.reads
            .push_back(Err(io::Error::new(io::ErrorKind::Other, "bus glitch")));
        bus.queue_read(&with_checksum(&[0x59, 0x59, 0x64, 0x00, 0xC8, 0x00, 0x98, 0x08]));
        let mut session = configured_session(bus);

        let policy = utils::RetryPolicy::new(3, Duration::ZERO);
        let measurement = utils::retry(&policy, |_| session.fetch_measurement()).unwrap();
        assert_eq!(measurement.distance, 100);
    }
}
