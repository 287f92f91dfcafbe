use crate::base::error::{Error, Result, TransportOp};
use crate::base::traits::BusTransport;
use crate::types::{BusPort, DeviceAddress};
use crate::utils::hex_string;
use log::{error, trace, warn};
use std::thread;
use std::time::Duration;

/// Channel sends and receives byte blocks to one device address on one bus port.
///
/// Every operation opens the port, performs its I/O and closes the port again, so no
/// handle outlives a single transaction.
///
/// # Examples
/// ```ignore
/// let mut channel = Channel::new(bus, 4, 0x10);
/// channel.write(&[0x5A, 0x05, 0x00, 0x01, 0x60]).unwrap();
/// let frame = channel.read(9).unwrap();
/// ```
#[derive(Debug)]
pub struct Channel<T> {
    transport: T,
    port: BusPort,
    address: DeviceAddress,
    received: Vec<u8>,
}

impl<T: BusTransport> Channel<T> {
    /// Create a new `Channel` targeting `address` on `port`
    pub fn new(transport: T, port: BusPort, address: DeviceAddress) -> Channel<T> {
        trace!(
            "Creating new Channel for port {} address {:#04X}",
            port,
            address
        );
        Channel {
            transport,
            port,
            address,
            received: Vec::new(),
        }
    }

    /// The bus port this channel opens.
    pub fn port(&self) -> BusPort {
        self.port
    }

    /// The device address this channel talks to.
    pub fn address(&self) -> DeviceAddress {
        self.address
    }

    /// Re-target the channel. Takes effect on the next transaction.
    pub fn set_target(&mut self, port: BusPort, address: DeviceAddress) {
        trace!(
            "Channel target changed: port {} -> {}, address {:#04X} -> {:#04X}",
            self.port,
            port,
            self.address,
            address
        );
        self.port = port;
        self.address = address;
    }

    /// Bytes returned by the most recent read, kept even when the transaction failed.
    ///
    /// Empty if the last write, read or transaction received nothing.
    pub fn last_received(&self) -> &[u8] {
        &self.received
    }

    /// Borrow the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the channel and return the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Quick-write probe of the configured address
    ///
    /// # Example
    /// ```ignore
    /// if channel.probe()? { println!("device present"); }
    /// ```
    pub fn probe(&mut self) -> Result<bool> {
        trace!("Channel probe called");
        with_handle(&mut self.transport, self.port, self.address, |transport, handle, address| {
            transport
                .probe(handle, address)
                .map_err(|e| Error::transport(TransportOp::Probe, e))
        })
    }

    /// Write a block of bytes to the device
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        trace!("Channel write called: [{}]", hex_string(bytes));
        self.received.clear();
        with_handle(&mut self.transport, self.port, self.address, |transport, handle, address| {
            write_block(transport, handle, address, bytes)
        })
    }

    /// Read exactly `len` bytes from the device
    ///
    /// A short or long block is reported as [`Error::Length`]. If closing the port fails after
    /// a good read the call fails too, but the block stays available in
    /// [`Channel::last_received`].
    pub fn read(&mut self, len: usize) -> Result<Vec<u8>> {
        trace!("Channel read called for {} bytes", len);
        let received = &mut self.received;
        received.clear();
        with_handle(&mut self.transport, self.port, self.address, |transport, handle, address| {
            read_block(transport, handle, address, len, received)
        })
    }

    /// Write a request and read `reply_len` bytes back within one open handle
    ///
    /// # Example
    /// ```ignore
    /// let frame = channel.transact(&TRIGGER_CM, 9)?;
    /// ```
    pub fn transact(&mut self, request: &[u8], reply_len: usize) -> Result<Vec<u8>> {
        trace!(
            "Channel transact called: request=[{}], reply_len={}",
            hex_string(request),
            reply_len
        );
        let received = &mut self.received;
        received.clear();
        with_handle(&mut self.transport, self.port, self.address, |transport, handle, address| {
            write_block(transport, handle, address, request)?;
            read_block(transport, handle, address, reply_len, received)
        })
    }

    /// Send a request, wait `delay`, then read the reply in a second transaction
    ///
    /// Returns an empty reply without reading when `reply_len` is zero.
    pub fn invoke(&mut self, request: &[u8], reply_len: usize, delay: Duration) -> Result<Vec<u8>> {
        trace!(
            "Channel invoke called: request=[{}], reply_len={}, delay={:?}",
            hex_string(request),
            reply_len,
            delay
        );
        let written = self.write(request)?;
        trace!("Invoke: wrote {} bytes for request", written);
        if reply_len == 0 {
            trace!("Invoke: no reply expected");
            return Ok(Vec::new());
        }

        if !delay.is_zero() {
            thread::sleep(delay);
        }
        let reply = self.read(reply_len)?;
        trace!("Invoke: received reply [{}]", hex_string(&reply));
        Ok(reply)
    }

}

/// Opens `port`, runs `op` on the handle and always closes it again.
fn with_handle<T, R, F>(transport: &mut T, port: BusPort, address: DeviceAddress, op: F) -> Result<R>
where
    T: BusTransport,
    F: FnOnce(&mut T, &mut T::Handle, DeviceAddress) -> Result<R>,
{
    let mut handle = transport.open(port).map_err(|e| {
        error!("Failed to open bus port {}: {}", port, e);
        Error::transport(TransportOp::Open, e)
    })?;

    let result = op(transport, &mut handle, address);

    match (result, transport.close(handle)) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => {
            error!("Failed to close bus port {}: {}", port, e);
            Err(Error::transport(TransportOp::Close, e))
        }
        (Err(err), Err(e)) => {
            warn!(
                "Failed to close bus port {} after error ({}): {}",
                port, err, e
            );
            Err(err)
        }
        (Err(err), Ok(())) => Err(err),
    }
}

fn write_block<T: BusTransport>(
    transport: &mut T,
    handle: &mut T::Handle,
    address: DeviceAddress,
    bytes: &[u8],
) -> Result<usize> {
    match transport.write_block(handle, address, bytes) {
        Ok(()) => {
            trace!("Successfully wrote {} bytes", bytes.len());
            Ok(bytes.len())
        }
        Err(e) => {
            error!("Bus write to {:#04X} failed: {}", address, e);
            Err(Error::transport(TransportOp::Write, e))
        }
    }
}

fn read_block<T: BusTransport>(
    transport: &mut T,
    handle: &mut T::Handle,
    address: DeviceAddress,
    len: usize,
    received: &mut Vec<u8>,
) -> Result<Vec<u8>> {
    let bytes = transport.read_block(handle, address, len).map_err(|e| {
        error!("Bus read from {:#04X} failed: {}", address, e);
        Error::transport(TransportOp::Read, e)
    })?;
    received.clone_from(&bytes);

    if bytes.len() != len {
        warn!(
            "Bus read from {:#04X} returned {} bytes, expected {}",
            address,
            bytes.len(),
            len
        );
        return Err(Error::Length {
            expected: len,
            actual: bytes.len(),
        });
    }

    trace!("Read [{}]", hex_string(&bytes));
    Ok(bytes)
}
