use crate::transport::{RusbTransport, DEFAULT_TIMEOUT};
use rusb::{Device, GlobalContext};
use std::time::Duration;

/// USB vendor id of the Perytech DSO.
pub const VENDOR_ID: u16 = 0x23E9;
/// USB product id of the Perytech DSO.
pub const PRODUCT_ID: u16 = 0x0001;

const INTERFACE: u8 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeryDevice {
    pub bus: u8,
    pub address: u8,
}

impl PeryDevice {
    pub fn new(bus: u8, address: u8) -> Self {
        Self { bus, address }
    }
}

impl std::fmt::Display for PeryDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Bus {:03} Device {:03}: ID {:04x}:{:04x}",
            self.bus, self.address, VENDOR_ID, PRODUCT_ID
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),

    #[error("No Perytech DSO ({vendor:04x}:{product:04x}) found. Please connect the device")]
    DeviceNotFound { vendor: u16, product: u16 },

    #[error("Device {device} is not a Perytech DSO")]
    InvalidDevice { device: PeryDevice },
}

pub struct PeryConnector;

impl PeryConnector {
    /// Open the first Perytech DSO found on the bus.
    pub fn connect(timeout: Option<Duration>) -> Result<RusbTransport, ConnectorError> {
        let device = Self::find_devices()?
            .into_iter()
            .next()
            .ok_or(ConnectorError::DeviceNotFound {
                vendor: VENDOR_ID,
                product: PRODUCT_ID,
            })?;
        Self::open(&device, timeout)
    }

    /// Open the Perytech DSO at the given bus position.
    pub fn connect_to(
        wanted: &PeryDevice,
        timeout: Option<Duration>,
    ) -> Result<RusbTransport, ConnectorError> {
        let device = Self::find_devices()?
            .into_iter()
            .find(|d| d.bus_number() == wanted.bus && d.address() == wanted.address)
            .ok_or_else(|| ConnectorError::InvalidDevice {
                device: wanted.clone(),
            })?;
        Self::open(&device, timeout)
    }

    /// List all connected Perytech DSOs.
    pub fn available_devices() -> Result<Vec<PeryDevice>, ConnectorError> {
        Ok(Self::find_devices()?
            .iter()
            .map(|d| PeryDevice::new(d.bus_number(), d.address()))
            .collect())
    }

    fn find_devices() -> Result<Vec<Device<GlobalContext>>, ConnectorError> {
        log::debug!("Scanning for devices...");
        let mut found = Vec::new();
        for device in rusb::devices()?.iter() {
            // Devices we may not query are simply skipped.
            let Ok(descriptor) = device.device_descriptor() else {
                continue;
            };
            if Self::is_perytech(descriptor.vendor_id(), descriptor.product_id()) {
                log::debug!(
                    "Found device at bus {:03} address {:03}",
                    device.bus_number(),
                    device.address()
                );
                found.push(device);
            }
        }
        Ok(found)
    }

    fn is_perytech(vendor_id: u16, product_id: u16) -> bool {
        vendor_id == VENDOR_ID && product_id == PRODUCT_ID
    }

    fn open(
        device: &Device<GlobalContext>,
        timeout: Option<Duration>,
    ) -> Result<RusbTransport, ConnectorError> {
        let mut handle = device.open()?;
        // Not supported on every platform.
        let _ = handle.set_auto_detach_kernel_driver(true);
        handle.claim_interface(INTERFACE)?;
        log::debug!(
            "Opened Perytech DSO at bus {:03} address {:03}",
            device.bus_number(),
            device.address()
        );
        Ok(RusbTransport::new(handle, timeout.unwrap_or(DEFAULT_TIMEOUT)))
    }
}
