//! Register access layer.
//!
//! Every register access is a pair of transfers: a one byte control transfer
//! selecting the target address, followed by a control transfer describing
//! the bulk transfer that carries the value. The pair must never be split by
//! any other traffic, which is why [`RegisterAccess`] is only reachable
//! through the session lock.

use crate::transport::{
    TransportError, UsbTransport, ENDPOINT_IN, ENDPOINT_OUT, REQUEST_TYPE_IN, REQUEST_TYPE_OUT,
};

const REQUEST_DATA: u8 = 0x04;
const REQUEST_SELECT: u8 = 0x0C;

const VALUE_DATA: u16 = 0x0082;
const VALUE_SELECT: u16 = 0x0083;
const VALUE_SHIFT_CONFIG: u16 = 0x0089;
const VALUE_SHIFT_STATUS: u16 = 0x008A;
const VALUE_SHIFT_WRITE: u16 = 0x008B;

const DIRECTION_READ: u8 = 0x00;
const DIRECTION_WRITE: u8 = 0x01;

/// Selector that switches the bulk endpoint to the sample buffer.
pub const SELECT_SAMPLE_DATA: u8 = 0x03;

/// `SOME_STATUS` value once the trigger condition has been seen.
pub const STATUS_TRIGGERED: u16 = 0x000B;

/// Device register map.
///
/// Names follow observed behaviour only; several meanings are unconfirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Reg {
    // Read side
    Hello = 0x01,
    DeviceStatus = 0x02,
    BufferValue = 0x03,
    TriggerCount = 0x04,
    SomeStatus = 0x05,
    BufferCount = 0x06,

    // Write side
    SkipOffset = 0x55,
    AdControl = 0x56,
    TrigLevel = 0x57,
    SampleRate = 0x59,
    UnknownCal = 0x5A,
    Reset = 0x5B,
    VoltageDiv = 0x5C,
    TrigChannel = 0x5D,
    TrigEdge = 0x5E,
    UnknownInit61 = 0x61,
    VoltageCoupling = 0x66,
    UnknownInit67 = 0x67,
    UnknownInit68 = 0x68,
    DeviceControl = 0x69,
    Magic = 0x6A,
}

impl Reg {
    pub fn addr(self) -> u8 {
        self as u8
    }
}

impl From<Reg> for u8 {
    fn from(reg: Reg) -> Self {
        reg.addr()
    }
}

/// Status registers 1..=6, read in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusSnapshot {
    values: [u16; 6],
}

impl StatusSnapshot {
    pub const ADDRESSES: [Reg; 6] = [
        Reg::Hello,
        Reg::DeviceStatus,
        Reg::BufferValue,
        Reg::TriggerCount,
        Reg::SomeStatus,
        Reg::BufferCount,
    ];

    pub fn new(values: [u16; 6]) -> Self {
        Self { values }
    }

    /// Value of a status register, `None` for addresses outside 1..=6.
    pub fn get(&self, addr: impl Into<u8>) -> Option<u16> {
        let index = usize::from(addr.into()).checked_sub(1)?;
        self.values.get(index).copied()
    }

    pub fn values(&self) -> &[u16; 6] {
        &self.values
    }

    pub fn is_triggered(&self) -> bool {
        self.values[4] == STATUS_TRIGGERED
    }
}

impl std::fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "0x{value:04x}")?;
        }
        Ok(())
    }
}

/// A read-back that differed from the value the vendor software expects.
///
/// Mismatches never abort the running operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationMismatch {
    Register {
        addr: u8,
        expected: u16,
        actual: u16,
    },
    ShiftStatus {
        group: &'static str,
        sequence: usize,
        expected: Vec<u8>,
        actual: Vec<u8>,
    },
}

impl std::fmt::Display for VerificationMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Register {
                addr,
                expected,
                actual,
            } => write!(
                f,
                "register 0x{addr:02x}: 0x{actual:04x} != expected 0x{expected:04x}"
            ),
            Self::ShiftStatus {
                group,
                sequence,
                expected,
                actual,
            } => write!(
                f,
                "{group} sequence {sequence}: status {actual:02x?} != expected {expected:02x?}"
            ),
        }
    }
}

/// Mismatches kept until [`RegisterAccess::take_mismatches`] drains them.
///
/// A clean bring-up produces none and a fully failing one stays well below
/// this; later ones are logged and counted only.
pub const MISMATCH_LIMIT: usize = 256;

pub struct RegisterAccess<T: UsbTransport> {
    transport: T,
    mismatches: Vec<VerificationMismatch>,
    dropped_mismatches: usize,
}

impl<T: UsbTransport> RegisterAccess<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            mismatches: Vec::new(),
            dropped_mismatches: 0,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Point the data path at `addr` (a register or a bulk selector).
    pub fn select(&mut self, addr: u8) -> Result<(), TransportError> {
        self.transport.control_out(
            REQUEST_TYPE_OUT,
            REQUEST_SELECT,
            VALUE_SELECT,
            0,
            &[addr],
        )?;
        Ok(())
    }

    fn data_request(direction: u8, size: u16) -> [u8; 8] {
        let [lo, hi] = size.to_le_bytes();
        [direction, 0x00, 0x82, 0x00, lo, hi, 0x00, 0x00]
    }

    /// Read up to `size` bytes from the currently selected address.
    pub fn read_data(&mut self, size: u16) -> Result<Vec<u8>, TransportError> {
        let request = Self::data_request(DIRECTION_READ, size);
        self.transport
            .control_out(REQUEST_TYPE_OUT, REQUEST_DATA, VALUE_DATA, 0, &request)?;
        let mut buf = vec![0u8; usize::from(size)];
        let n = self.transport.bulk_in(ENDPOINT_IN, &mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Write `data` to the currently selected address.
    pub fn write_data(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let size = data.len().max(2) as u16;
        let request = Self::data_request(DIRECTION_WRITE, size);
        self.transport
            .control_out(REQUEST_TYPE_OUT, REQUEST_DATA, VALUE_DATA, 0, &request)?;
        self.transport.bulk_out(ENDPOINT_OUT, data)?;
        Ok(())
    }

    fn read_value(&mut self, addr: u8) -> Result<u16, TransportError> {
        self.select(addr)?;
        let data = self.read_data(2)?;
        match data.as_slice() {
            [lo, hi] => Ok(u16::from_le_bytes([*lo, *hi])),
            _ => Err(TransportError::ShortTransfer {
                expected: 2,
                actual: data.len(),
            }),
        }
    }

    pub fn get_register(&mut self, addr: impl Into<u8>) -> Result<u16, TransportError> {
        let addr = addr.into();
        let value = self.read_value(addr)?;
        log::debug!("Get register 0x{:02x} : 0x{:04x}", addr, value);
        Ok(value)
    }

    /// Read a register and record a [`VerificationMismatch`] if it differs from `expected`.
    pub fn get_register_expecting(
        &mut self,
        addr: impl Into<u8>,
        expected: u16,
    ) -> Result<u16, TransportError> {
        let addr = addr.into();
        let actual = self.read_value(addr)?;
        if actual == expected {
            log::debug!("Get register 0x{:02x} : 0x{:04x}", addr, actual);
        } else {
            self.record_mismatch(VerificationMismatch::Register {
                addr,
                expected,
                actual,
            });
        }
        Ok(actual)
    }

    pub fn set_register(&mut self, addr: impl Into<u8>, value: u16) -> Result<(), TransportError> {
        let addr = addr.into();
        log::debug!("Set register 0x{:02x} : 0x{:04x}", addr, value);
        self.select(addr)?;
        self.write_data(&value.to_le_bytes())
    }

    /// Read status registers 1..=6, strictly in ascending order.
    pub fn status_snapshot(&mut self) -> Result<StatusSnapshot, TransportError> {
        let mut values = [0u16; 6];
        for (value, reg) in values.iter_mut().zip(StatusSnapshot::ADDRESSES) {
            *value = self.read_value(reg.addr())?;
        }
        let snapshot = StatusSnapshot::new(values);
        log::trace!("Status {}", snapshot);
        Ok(snapshot)
    }

    /// `RESET := 1`, `RESET := 0`.
    pub fn pulse_reset(&mut self) -> Result<(), TransportError> {
        self.set_register(Reg::Reset, 0x0001)?;
        self.set_register(Reg::Reset, 0x0000)
    }

    pub fn set_acquisition(&mut self, enabled: bool) -> Result<(), TransportError> {
        self.set_register(Reg::AdControl, u16::from(enabled))
    }

    /// Clock bytes into the configuration shift line, one transfer per byte.
    pub fn shift_write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        for byte in bytes {
            self.transport.control_out(
                REQUEST_TYPE_OUT,
                REQUEST_SELECT,
                VALUE_SHIFT_WRITE,
                0,
                &[*byte],
            )?;
        }
        Ok(())
    }

    pub fn shift_config(&mut self, byte: u8) -> Result<(), TransportError> {
        self.transport.control_out(
            REQUEST_TYPE_OUT,
            REQUEST_SELECT,
            VALUE_SHIFT_CONFIG,
            0,
            &[byte],
        )?;
        Ok(())
    }

    /// Strobe the shift line and read back one status byte.
    pub fn shift_status(&mut self) -> Result<u8, TransportError> {
        self.shift_write(&[0x03, 0x01])?;
        let mut buf = [0u8; 1];
        let n = self.transport.control_in(
            REQUEST_TYPE_IN,
            REQUEST_SELECT,
            VALUE_SHIFT_STATUS,
            0,
            &mut buf,
        )?;
        if n != 1 {
            return Err(TransportError::ShortTransfer {
                expected: 1,
                actual: n,
            });
        }
        Ok(buf[0])
    }

    pub(crate) fn record_mismatch(&mut self, mismatch: VerificationMismatch) {
        log::error!("Verification failed: {}", mismatch);
        if self.mismatches.len() < MISMATCH_LIMIT {
            self.mismatches.push(mismatch);
        } else {
            self.dropped_mismatches += 1;
        }
    }

    pub fn mismatches(&self) -> &[VerificationMismatch] {
        &self.mismatches
    }

    /// Mismatches seen while the list was full.
    pub fn dropped_mismatches(&self) -> usize {
        self.dropped_mismatches
    }

    pub fn take_mismatches(&mut self) -> Vec<VerificationMismatch> {
        if self.dropped_mismatches > 0 {
            log::warn!("{} verification mismatches were not kept", self.dropped_mismatches);
            self.dropped_mismatches = 0;
        }
        std::mem::take(&mut self.mismatches)
    }
}
