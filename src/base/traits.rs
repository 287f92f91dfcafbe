use crate::types::{BusPort, DeviceAddress};
use std::io;

/// Defines the block-oriented bus capability the driver needs from its host.
///
/// Implementations wrap a concrete bus (for example a Linux `/dev/i2c-N` device).
/// The driver opens a handle for each transaction and closes it afterwards.
pub trait BusTransport {
    /// An open connection to a bus port.
    type Handle;

    /// Opens the bus identified by `port`.
    fn open(&mut self, port: BusPort) -> io::Result<Self::Handle>;

    /// Issues a quick-write to `address` and reports whether the device acknowledged it.
    fn probe(&mut self, handle: &mut Self::Handle, address: DeviceAddress) -> io::Result<bool>;

    /// Writes a block of bytes to the device at `address`.
    ///
    /// # Arguments
    ///
    /// * `handle` - An open bus handle.
    /// * `address` - The 7-bit device address.
    /// * `bytes` - The complete command, header byte included.
    fn write_block(
        &mut self,
        handle: &mut Self::Handle,
        address: DeviceAddress,
        bytes: &[u8],
    ) -> io::Result<()>;

    /// Reads up to `len` bytes from the device at `address`.
    fn read_block(
        &mut self,
        handle: &mut Self::Handle,
        address: DeviceAddress,
        len: usize,
    ) -> io::Result<Vec<u8>>;

    /// Closes a handle returned by [`BusTransport::open`].
    fn close(&mut self, handle: Self::Handle) -> io::Result<()>;
}
