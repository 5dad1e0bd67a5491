//! In-memory stand-in for the DSO used by the unit tests.
//!
//! [`MockDevice`] decodes the vendor requests the register layer emits,
//! keeps a register file, serves a deterministic sample stream and records
//! every transaction so tests can assert on the exact wire sequence.

use crate::registers::{Reg, SELECT_SAMPLE_DATA};
use crate::shift_tables::{INITIAL_GROUP, LINK_GROUP, TRIM_GROUP};
use crate::transport::{TransportError, UsbTransport, ENDPOINT_IN, ENDPOINT_OUT};
use std::collections::{HashMap, VecDeque};

const DEFAULT_SHIFT_STATUS: u8 = 0x71;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Op {
    Select(u8),
    Write { addr: u8, data: Vec<u8> },
    BulkIn { requested: usize, returned: usize },
    Shift(u8),
    ShiftConfig(u8),
    ShiftStatus,
    Reset,
}

pub(crate) type Control = (u8, u8, u16, u16, Vec<u8>);

#[derive(Debug, Default)]
pub(crate) struct MockDevice {
    selected: u8,
    values: HashMap<u8, u16>,
    queued: HashMap<u8, VecDeque<u16>>,
    shift_status: VecDeque<u8>,
    stream_position: usize,
    bulk_in_limit: Option<usize>,
    short_every: Option<usize>,
    stalled: bool,
    fail_at: Option<usize>,
    calls: usize,
    ops: Vec<Op>,
    controls: Vec<Control>,
    bulk_out_log: Vec<Vec<u8>>,
}

impl MockDevice {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A device that answers every bring-up read-back the way a healthy unit does.
    pub(crate) fn scripted() -> Self {
        let mut device = Self::new();
        device.set_value(Reg::Hello, 0x1101);
        device.set_value(Reg::SomeStatus, 0x0008);
        device.set_value(Reg::BufferCount, 0x0800);
        device.queue_values(Reg::DeviceStatus, &[1, 1, 1, 9, 9, 9, 9]);
        // Nine calibration snapshots also read DEVICE_STATUS.
        device.queue_values(Reg::DeviceStatus, &[9; 9]);
        device.queue_values(Reg::DeviceStatus, &[9, 1]);
        device.set_value(Reg::DeviceStatus, 1);
        let status: Vec<u8> = [LINK_GROUP, INITIAL_GROUP, TRIM_GROUP, TRIM_GROUP]
            .iter()
            .flat_map(|group| group.iter())
            .filter_map(|sequence| sequence.expect)
            .flatten()
            .collect();
        device.queue_shift_status(&status);
        device
    }

    /// Value returned for reads of `addr` once its queue is empty.
    pub(crate) fn set_value(&mut self, addr: impl Into<u8>, value: u16) {
        self.values.insert(addr.into(), value);
    }

    /// Values returned by successive reads of `addr`, before falling back to [`Self::set_value`].
    pub(crate) fn queue_values(&mut self, addr: impl Into<u8>, values: &[u16]) {
        self.queued
            .entry(addr.into())
            .or_default()
            .extend(values.iter().copied());
    }

    pub(crate) fn queue_shift_status(&mut self, bytes: &[u8]) {
        self.shift_status.extend(bytes.iter().copied());
    }

    /// Cap every bulk IN transfer at `limit` bytes.
    pub(crate) fn limit_bulk_in(&mut self, limit: usize) {
        self.bulk_in_limit = Some(limit);
    }

    /// Every `n`th sample transfer returns half of what was asked for.
    pub(crate) fn short_sample_reads_every(&mut self, n: usize) {
        self.short_every = Some(n);
    }

    /// Sample transfers return nothing at all.
    pub(crate) fn stall_sample_stream(&mut self) {
        self.stalled = true;
    }

    /// The `n`th transport call (0-based) fails with an I/O error.
    pub(crate) fn fail_at_call(&mut self, n: usize) {
        self.fail_at = Some(n);
    }

    pub(crate) fn fail_next_call(&mut self) {
        self.fail_at = Some(self.calls);
    }

    pub(crate) fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub(crate) fn clear_ops(&mut self) {
        self.ops.clear();
        self.controls.clear();
        self.bulk_out_log.clear();
    }

    pub(crate) fn controls(&self) -> &[Control] {
        &self.controls
    }

    pub(crate) fn bulk_out_log(&self) -> &[Vec<u8>] {
        &self.bulk_out_log
    }

    /// Every 16-bit register write, in order.
    pub(crate) fn register_writes(&self) -> Vec<(u8, u16)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Write { addr, data } if data.len() == 2 => {
                    Some((*addr, u16::from_le_bytes([data[0], data[1]])))
                }
                _ => None,
            })
            .collect()
    }

    pub(crate) fn writes_to(&self, addr: impl Into<u8>) -> Vec<u16> {
        let addr = addr.into();
        self.register_writes()
            .into_iter()
            .filter(|(a, _)| *a == addr)
            .map(|(_, v)| v)
            .collect()
    }

    pub(crate) fn sample_reads(&self) -> Vec<(usize, usize)> {
        let mut selected = 0;
        let mut reads = Vec::new();
        for op in &self.ops {
            match op {
                Op::Select(addr) => selected = *addr,
                Op::BulkIn {
                    requested,
                    returned,
                } if selected == SELECT_SAMPLE_DATA && *requested != 2 => {
                    reads.push((*requested, *returned));
                }
                _ => {}
            }
        }
        reads
    }

    pub(crate) fn value(&self, addr: impl Into<u8>) -> u16 {
        self.values.get(&addr.into()).copied().unwrap_or(0)
    }

    pub(crate) fn sample_byte(index: usize) -> u8 {
        (index % 251) as u8
    }

    fn enter(&mut self) -> Result<(), TransportError> {
        let call = self.calls;
        self.calls += 1;
        if self.fail_at == Some(call) {
            return Err(TransportError::Usb(rusb::Error::Io));
        }
        Ok(())
    }

    fn read_register(&mut self, addr: u8) -> u16 {
        if let Some(value) = self.queued.get_mut(&addr).and_then(VecDeque::pop_front) {
            return value;
        }
        self.value(addr)
    }
}

impl UsbTransport for MockDevice {
    fn control_out(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
    ) -> Result<usize, TransportError> {
        self.enter()?;
        self.controls
            .push((request_type, request, value, index, data.to_vec()));
        match value {
            0x0083 => {
                self.selected = data[0];
                self.ops.push(Op::Select(data[0]));
            }
            0x008B => self.ops.push(Op::Shift(data[0])),
            0x0089 => self.ops.push(Op::ShiftConfig(data[0])),
            _ => {}
        }
        Ok(data.len())
    }

    fn control_in(
        &mut self,
        _request_type: u8,
        _request: u8,
        _value: u16,
        _index: u16,
        buf: &mut [u8],
    ) -> Result<usize, TransportError> {
        self.enter()?;
        self.ops.push(Op::ShiftStatus);
        buf[0] = self
            .shift_status
            .pop_front()
            .unwrap_or(DEFAULT_SHIFT_STATUS);
        Ok(1)
    }

    fn bulk_out(&mut self, endpoint: u8, data: &[u8]) -> Result<usize, TransportError> {
        self.enter()?;
        assert_eq!(endpoint, ENDPOINT_OUT);
        if let [lo, hi] = data {
            self.values
                .insert(self.selected, u16::from_le_bytes([*lo, *hi]));
        }
        self.bulk_out_log.push(data.to_vec());
        self.ops.push(Op::Write {
            addr: self.selected,
            data: data.to_vec(),
        });
        Ok(data.len())
    }

    fn bulk_in(&mut self, endpoint: u8, buf: &mut [u8]) -> Result<usize, TransportError> {
        self.enter()?;
        assert_eq!(endpoint, ENDPOINT_IN);
        let requested = buf.len();
        let mut n = requested.min(self.bulk_in_limit.unwrap_or(usize::MAX));

        if self.selected == SELECT_SAMPLE_DATA && requested != 2 {
            let transfer = self.sample_reads().len() + 1;
            if self.stalled {
                n = 0;
            } else if self.short_every.is_some_and(|every| transfer % every == 0) {
                n = (n / 2).max(1);
            }
            for byte in buf.iter_mut().take(n) {
                *byte = Self::sample_byte(self.stream_position);
                self.stream_position += 1;
            }
        } else {
            let value = self.read_register(self.selected).to_le_bytes();
            n = n.min(2);
            buf[..n].copy_from_slice(&value[..n]);
        }

        self.ops.push(Op::BulkIn {
            requested,
            returned: n,
        });
        Ok(n)
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        self.enter()?;
        self.ops.push(Op::Reset);
        Ok(())
    }
}
