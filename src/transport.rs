use rusb::{DeviceHandle, GlobalContext};
use std::time::Duration;

/// `bmRequestType` for vendor requests host → device.
pub const REQUEST_TYPE_OUT: u8 = 0x40;
/// `bmRequestType` for vendor requests device → host.
pub const REQUEST_TYPE_IN: u8 = 0xC0;
/// Bulk OUT endpoint used for register values and priming patterns.
pub const ENDPOINT_OUT: u8 = 0x02;
/// Bulk IN endpoint used for register values and sample data.
pub const ENDPOINT_IN: u8 = 0x81;

/// Per-transfer timeout used by the vendor software.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),

    #[error("Short transfer: expected {expected} bytes but got {actual}")]
    ShortTransfer { expected: usize, actual: usize },
}

/// Raw control and bulk primitives over an already opened device.
///
/// Implementations perform exactly one USB transaction per call. Ordering and
/// exclusivity are the caller's business, see [`crate::DeviceSession`].
pub trait UsbTransport: Send {
    fn control_out(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
    ) -> Result<usize, TransportError>;

    fn control_in(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
    ) -> Result<usize, TransportError>;

    fn bulk_out(&mut self, endpoint: u8, data: &[u8]) -> Result<usize, TransportError>;

    /// Reads up to `buf.len()` bytes. Returning fewer bytes is not an error.
    fn bulk_in(&mut self, endpoint: u8, buf: &mut [u8]) -> Result<usize, TransportError>;

    fn reset(&mut self) -> Result<(), TransportError>;
}

/// [`UsbTransport`] backed by a `rusb` device handle.
pub struct RusbTransport {
    handle: DeviceHandle<GlobalContext>,
    timeout: Duration,
}

impl std::fmt::Debug for RusbTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RusbTransport")
            .field("device", &self.handle.device())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RusbTransport {
    /// Wrap an opened handle whose interface 0 has already been claimed.
    pub fn new(handle: DeviceHandle<GlobalContext>, timeout: Duration) -> Self {
        Self { handle, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn handle(&self) -> &DeviceHandle<GlobalContext> {
        &self.handle
    }
}

impl UsbTransport for RusbTransport {
    fn control_out(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
    ) -> Result<usize, TransportError> {
        let written = self
            .handle
            .write_control(request_type, request, value, index, data, self.timeout)?;
        if written != data.len() {
            return Err(TransportError::ShortTransfer {
                expected: data.len(),
                actual: written,
            });
        }
        Ok(written)
    }

    fn control_in(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
    ) -> Result<usize, TransportError> {
        Ok(self
            .handle
            .read_control(request_type, request, value, index, buf, self.timeout)?)
    }

    fn bulk_out(&mut self, endpoint: u8, data: &[u8]) -> Result<usize, TransportError> {
        let written = self.handle.write_bulk(endpoint, data, self.timeout)?;
        if written != data.len() {
            return Err(TransportError::ShortTransfer {
                expected: data.len(),
                actual: written,
            });
        }
        Ok(written)
    }

    fn bulk_in(&mut self, endpoint: u8, buf: &mut [u8]) -> Result<usize, TransportError> {
        Ok(self.handle.read_bulk(endpoint, buf, self.timeout)?)
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        log::debug!("Resetting USB device");
        self.handle.reset()?;
        Ok(())
    }
}
