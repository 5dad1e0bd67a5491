use crate::registers::{Reg, RegisterAccess, StatusSnapshot, SELECT_SAMPLE_DATA};
use crate::settings::{Channel, SampleRate};
use crate::transport::{TransportError, UsbTransport};
use polars::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// `TRIGGER_COUNT` value that corresponds to the trigger sample itself.
pub const TRIGGER_COUNT_BASE: u16 = 0x03EA;
const PRIME_PATTERN: [u8; 2] = [0xF8, 0x03];
/// ADC code of 0 V.
pub const MID_SCALE: i32 = 128;

const TIME_COLUMN_NAME: &str = "time";
const CH1_RAW_COLUMN_NAME: &str = "ch1_raw";
const CH2_RAW_COLUMN_NAME: &str = "ch2_raw";
const CH1_COLUMN_NAME: &str = "ch1";
const CH2_COLUMN_NAME: &str = "ch2";

#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    #[error("Sample stream stalled after {received} of {expected} bytes")]
    DrainStalled { received: usize, expected: usize },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquisitionRequest {
    /// Samples per channel; the device returns two bytes per sample.
    pub sample_count: usize,
    pub trigger_timeout: Duration,
    /// Shift of the read cursor relative to the trigger sample.
    pub trigger_offset: i32,
}

impl AcquisitionRequest {
    pub fn new(sample_count: usize) -> Self {
        Self {
            sample_count,
            trigger_timeout: Duration::from_millis(100),
            trigger_offset: 0,
        }
    }

    pub fn with_trigger_timeout(mut self, timeout: Duration) -> Self {
        self.trigger_timeout = timeout;
        self
    }

    pub fn with_trigger_offset(mut self, offset: i32) -> Self {
        self.trigger_offset = offset;
        self
    }

    pub fn byte_count(&self) -> usize {
        self.sample_count * 2
    }
}

/// Cooperative cancellation for the trigger wait.
///
/// Checked once per poll iteration. A cancelled acquisition still disables
/// the ADC and drains the buffer so the device ends up idle.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionPhase {
    Idle,
    Armed,
    Polling,
    Triggered,
    TimedOut,
    Draining,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionResult {
    /// Interleaved samples, Ch1 first.
    pub buffer: Vec<u8>,
    pub triggered: bool,
    pub applied_offset: i32,
    /// Last snapshot taken while waiting for the trigger.
    pub status: StatusSnapshot,
    pub cancelled: bool,
    pub sample_rate: Option<SampleRate>,
}

impl AcquisitionResult {
    pub fn sample_count(&self) -> usize {
        self.buffer.len() / 2
    }

    /// De-interleave the raw ADC codes of one analog channel.
    pub fn channel_samples(&self, channel: Channel) -> Option<Vec<u8>> {
        let index = match channel {
            Channel::Ch1 => 0,
            Channel::Ch2 => 1,
            _ => return None,
        };
        Some(
            self.buffer
                .chunks_exact(2)
                .map(|pair| pair[index])
                .collect(),
        )
    }

    pub fn to_lazy_frame(&self) -> Result<LazyFrame, PolarsError> {
        let (ch1, ch2): (Vec<i32>, Vec<i32>) = self
            .buffer
            .chunks_exact(2)
            .map(|pair| (i32::from(pair[0]), i32::from(pair[1])))
            .unzip();

        let df = DataFrame::new(vec![
            Column::new(CH1_RAW_COLUMN_NAME.into(), ch1),
            Column::new(CH2_RAW_COLUMN_NAME.into(), ch2),
        ])?
        .lazy()
        .with_columns([
            (col(CH1_RAW_COLUMN_NAME) - lit(MID_SCALE)).alias(CH1_COLUMN_NAME),
            (col(CH2_RAW_COLUMN_NAME) - lit(MID_SCALE)).alias(CH2_COLUMN_NAME),
        ]);

        let Some(rate) = self.sample_rate else {
            return Ok(df);
        };
        Ok(df
            .with_row_index("row_index", Some(0))
            .with_columns([(col("row_index").cast(DataType::Float64)
                * lit(rate.sample_period_secs()))
            .alias(TIME_COLUMN_NAME)])
            .select([
                col(TIME_COLUMN_NAME),
                col(CH1_RAW_COLUMN_NAME),
                col(CH2_RAW_COLUMN_NAME),
                col(CH1_COLUMN_NAME),
                col(CH2_COLUMN_NAME),
            ]))
    }
}

/// Value written to `SKIP_OFFSET` to place the read cursor relative to the trigger.
pub fn skip_offset(trigger_count: u16, trigger_offset: i32) -> u16 {
    let skip =
        (i32::from(trigger_count) - i32::from(TRIGGER_COUNT_BASE)).wrapping_add(trigger_offset);
    (skip & 0xFFFF) as u16
}

/// Read `total` bytes from the currently selected bulk source.
///
/// Short transfers are followed by further reads until the total is reached.
pub(crate) fn drain<T: UsbTransport>(
    ral: &mut RegisterAccess<T>,
    total: usize,
    chunk_size: usize,
    max_empty_reads: usize,
) -> Result<Vec<u8>, AcquisitionError> {
    let chunk_size = chunk_size.clamp(1, usize::from(u16::MAX));
    let mut buffer = Vec::with_capacity(total);
    let mut empty_reads = 0;

    while buffer.len() < total {
        let request = (total - buffer.len()).min(chunk_size) as u16;
        let data = ral.read_data(request)?;
        if data.is_empty() {
            empty_reads += 1;
            if empty_reads > max_empty_reads {
                return Err(AcquisitionError::DrainStalled {
                    received: buffer.len(),
                    expected: total,
                });
            }
            continue;
        }
        if data.len() < usize::from(request) {
            log::trace!("Short read {}/{}", data.len(), request);
        }
        empty_reads = 0;
        buffer.extend_from_slice(&data);
    }
    Ok(buffer)
}

#[derive(Debug)]
pub struct AcquisitionController {
    poll_interval: Duration,
    chunk_size: usize,
    max_empty_reads: usize,
    phase: AcquisitionPhase,
}

impl AcquisitionController {
    pub fn new(poll_interval: Duration, chunk_size: usize, max_empty_reads: usize) -> Self {
        Self {
            poll_interval,
            chunk_size,
            max_empty_reads,
            phase: AcquisitionPhase::Idle,
        }
    }

    pub fn phase(&self) -> AcquisitionPhase {
        self.phase
    }

    fn set_phase(&mut self, phase: AcquisitionPhase) {
        log::trace!("Acquisition {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    /// Arm, wait for the trigger, reposition the read cursor and drain the buffer.
    ///
    /// A trigger that never fires is not an error: the result carries
    /// `triggered == false` and a full-length buffer.
    pub fn acquire<T: UsbTransport>(
        &mut self,
        ral: &mut RegisterAccess<T>,
        request: &AcquisitionRequest,
        sample_rate: Option<SampleRate>,
        cancel: Option<&CancelToken>,
    ) -> Result<AcquisitionResult, AcquisitionError> {
        let result = self.run(ral, request, sample_rate, cancel);
        self.set_phase(AcquisitionPhase::Idle);
        result
    }

    fn run<T: UsbTransport>(
        &mut self,
        ral: &mut RegisterAccess<T>,
        request: &AcquisitionRequest,
        sample_rate: Option<SampleRate>,
        cancel: Option<&CancelToken>,
    ) -> Result<AcquisitionResult, AcquisitionError> {
        ral.select(Reg::UnknownCal.addr())?;
        ral.write_data(&PRIME_PATTERN)?;
        ral.write_data(&PRIME_PATTERN)?;
        ral.pulse_reset()?;
        ral.set_acquisition(true)?;
        self.set_phase(AcquisitionPhase::Armed);

        self.set_phase(AcquisitionPhase::Polling);
        let deadline = Instant::now() + request.trigger_timeout;
        let mut cancelled = false;
        let status = loop {
            let status = ral.status_snapshot()?;
            if status.is_triggered() {
                self.set_phase(AcquisitionPhase::Triggered);
                break status;
            }
            if cancel.is_some_and(CancelToken::is_cancelled) {
                log::debug!("Trigger wait cancelled");
                cancelled = true;
                break status;
            }
            if Instant::now() >= deadline {
                self.set_phase(AcquisitionPhase::TimedOut);
                break status;
            }
            if !self.poll_interval.is_zero() {
                std::thread::sleep(self.poll_interval);
            }
        };
        let triggered = status.is_triggered();

        ral.set_acquisition(false)?;
        let trigger_count = ral.get_register(Reg::TriggerCount)?;
        ral.set_register(
            Reg::SkipOffset,
            skip_offset(trigger_count, request.trigger_offset),
        )?;

        self.set_phase(AcquisitionPhase::Draining);
        ral.select(SELECT_SAMPLE_DATA)?;
        let buffer = drain(
            ral,
            request.byte_count(),
            self.chunk_size,
            self.max_empty_reads,
        )?;

        log::debug!(
            "DATA {} [{}] {:02x?}",
            if triggered { "TRIG" } else { "NO TRIG" },
            buffer.len(),
            &buffer[..buffer.len().min(32)]
        );

        Ok(AcquisitionResult {
            buffer,
            triggered,
            applied_offset: request.trigger_offset.saturating_neg(),
            status,
            cancelled,
            sample_rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_transport::{MockDevice, Op};

    fn controller() -> AcquisitionController {
        AcquisitionController::new(Duration::ZERO, 512, 4)
    }

    fn triggering_device() -> MockDevice {
        let mut device = MockDevice::new();
        device.queue_values(Reg::SomeStatus, &[0x0008, 0x0009]);
        device.set_value(Reg::SomeStatus, 0x000B);
        device.set_value(Reg::TriggerCount, 0x0800);
        device
    }

    fn expected_stream(len: usize) -> Vec<u8> {
        (0..len).map(MockDevice::sample_byte).collect()
    }

    #[test]
    fn test_skip_offset() {
        assert_eq!(skip_offset(0x0800, 5), 0x041B);
        assert_eq!(skip_offset(0x0800, 0), 0x0416);
        assert_eq!(skip_offset(0x0000, 0), 0xFC16);
        assert_eq!(skip_offset(0x03EA, -1), 0xFFFF);
    }

    #[test]
    fn test_triggered_acquisition() {
        let mut ral = RegisterAccess::new(triggering_device());
        let request = AcquisitionRequest::new(1000).with_trigger_offset(5);
        let result = controller()
            .acquire(&mut ral, &request, Some(SampleRate::MS1), None)
            .unwrap();

        assert!(result.triggered);
        assert!(!result.cancelled);
        assert_eq!(result.applied_offset, -5);
        assert_eq!(result.buffer, expected_stream(2000));
        assert_eq!(result.status.get(Reg::SomeStatus), Some(0x000B));

        let device = ral.transport();
        assert_eq!(device.writes_to(Reg::SkipOffset), vec![0x041B]);
        assert_eq!(device.writes_to(Reg::AdControl), vec![1, 0]);
        assert_eq!(
            device.sample_reads(),
            vec![(512, 512), (512, 512), (512, 512), (464, 464)]
        );
        assert_eq!(
            device.ops()[..3],
            [
                Op::Select(0x5A),
                Op::Write {
                    addr: 0x5A,
                    data: vec![0xF8, 0x03]
                },
                Op::Write {
                    addr: 0x5A,
                    data: vec![0xF8, 0x03]
                },
            ]
        );
        // Three snapshots of six registers each.
        let status_reads = device
            .ops()
            .iter()
            .filter(|op| **op == Op::Select(0x05))
            .count();
        assert_eq!(status_reads, 3);
    }

    #[test]
    fn test_timeout_is_not_an_error() {
        let mut device = MockDevice::new();
        device.set_value(Reg::SomeStatus, 0x0008);
        let mut ral = RegisterAccess::new(device);
        let request = AcquisitionRequest::new(300).with_trigger_timeout(Duration::ZERO);
        let mut controller = controller();
        let result = controller.acquire(&mut ral, &request, None, None).unwrap();

        assert!(!result.triggered);
        assert_eq!(result.buffer.len(), 600);
        assert_eq!(controller.phase(), AcquisitionPhase::Idle);
    }

    fn snapshot_count(device: &MockDevice) -> usize {
        device
            .ops()
            .iter()
            .filter(|op| **op == Op::Select(0x05))
            .count()
    }

    #[test]
    fn test_trigger_wait_expires() {
        let mut device = MockDevice::new();
        device.set_value(Reg::SomeStatus, 0x0008);
        let mut ral = RegisterAccess::new(device);
        let timeout = Duration::from_millis(30);
        let request = AcquisitionRequest::new(300).with_trigger_timeout(timeout);
        let mut controller = AcquisitionController::new(Duration::from_millis(5), 512, 4);

        let started = Instant::now();
        let result = controller.acquire(&mut ral, &request, None, None).unwrap();

        assert!(started.elapsed() >= timeout);
        assert!(!result.triggered);
        assert!(!result.cancelled);
        assert_eq!(result.status.get(Reg::SomeStatus), Some(0x0008));
        assert_eq!(result.buffer, expected_stream(600));

        let device = ral.transport();
        // Paced by the poll interval: more than one look, at most one per 5 ms.
        let snapshots = snapshot_count(device);
        assert!(snapshots >= 2, "{snapshots}");
        assert!(snapshots <= 30 / 5 + 2, "{snapshots}");
        assert_eq!(device.writes_to(Reg::AdControl), vec![1, 0]);
        assert_eq!(device.writes_to(Reg::SkipOffset).len(), 1);
        assert_eq!(controller.phase(), AcquisitionPhase::Idle);
    }

    #[test]
    fn test_cancel_while_polling() {
        let mut device = MockDevice::new();
        device.set_value(Reg::SomeStatus, 0x0008);
        let mut ral = RegisterAccess::new(device);
        let timeout = Duration::from_secs(10);
        let request = AcquisitionRequest::new(100).with_trigger_timeout(timeout);
        let mut controller = AcquisitionController::new(Duration::from_millis(2), 512, 4);

        let token = CancelToken::new();
        let canceller = {
            let token = token.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(20));
                token.cancel();
            })
        };

        let started = Instant::now();
        let result = controller
            .acquire(&mut ral, &request, None, Some(&token))
            .unwrap();
        canceller.join().unwrap();

        assert!(started.elapsed() < timeout);
        assert!(result.cancelled);
        assert!(!result.triggered);
        assert_eq!(result.buffer, expected_stream(200));
        assert!(snapshot_count(ral.transport()) >= 1);
        assert_eq!(ral.transport().writes_to(Reg::AdControl), vec![1, 0]);
        assert_eq!(controller.phase(), AcquisitionPhase::Idle);
    }

    #[test]
    fn test_trigger_checked_before_cancel() {
        let mut device = MockDevice::new();
        device.set_value(Reg::SomeStatus, 0x000B);
        let mut ral = RegisterAccess::new(device);
        let token = CancelToken::new();
        token.cancel();

        let result = controller()
            .acquire(&mut ral, &AcquisitionRequest::new(10), None, Some(&token))
            .unwrap();
        assert!(result.triggered);
        assert!(!result.cancelled);
        assert_eq!(snapshot_count(ral.transport()), 1);
    }

    #[test]
    fn test_extreme_trigger_offset() {
        let mut ral = RegisterAccess::new(triggering_device());
        let request = AcquisitionRequest::new(10).with_trigger_offset(i32::MIN);
        let result = controller()
            .acquire(&mut ral, &request, None, None)
            .unwrap();

        assert_eq!(result.applied_offset, i32::MAX);
        assert_eq!(ral.transport().writes_to(Reg::SkipOffset), vec![0x0416]);
    }

    #[test]
    fn test_short_reads_are_accumulated() {
        let mut device = triggering_device();
        device.short_sample_reads_every(2);
        let mut ral = RegisterAccess::new(device);
        let result = controller()
            .acquire(&mut ral, &AcquisitionRequest::new(1000), None, None)
            .unwrap();

        assert_eq!(result.buffer, expected_stream(2000));
        assert_eq!(
            ral.transport().sample_reads(),
            vec![(512, 512), (512, 256), (512, 512), (512, 256), (464, 464)]
        );
    }

    #[test]
    fn test_stalled_stream() {
        let mut device = triggering_device();
        device.stall_sample_stream();
        let mut ral = RegisterAccess::new(device);
        let mut controller = controller();
        let err = controller
            .acquire(&mut ral, &AcquisitionRequest::new(1000), None, None)
            .unwrap_err();

        assert!(matches!(
            err,
            AcquisitionError::DrainStalled {
                received: 0,
                expected: 2000
            }
        ));
        assert_eq!(ral.transport().sample_reads().len(), 5);
        assert_eq!(controller.phase(), AcquisitionPhase::Idle);
    }

    #[test]
    fn test_cancelled_acquisition_still_drains() {
        let mut device = MockDevice::new();
        device.set_value(Reg::SomeStatus, 0x0008);
        let mut ral = RegisterAccess::new(device);
        let token = CancelToken::new();
        token.cancel();
        let request = AcquisitionRequest::new(100).with_trigger_timeout(Duration::from_secs(60));

        let result = controller()
            .acquire(&mut ral, &request, None, Some(&token))
            .unwrap();

        assert!(result.cancelled);
        assert!(!result.triggered);
        assert_eq!(result.buffer.len(), 200);
        assert_eq!(ral.transport().writes_to(Reg::AdControl), vec![1, 0]);

        token.reset();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_transport_error_resets_phase() {
        let mut device = triggering_device();
        device.fail_at_call(5);
        let mut ral = RegisterAccess::new(device);
        let mut controller = controller();
        assert!(matches!(
            controller.acquire(&mut ral, &AcquisitionRequest::new(10), None, None),
            Err(AcquisitionError::Transport(_))
        ));
        assert_eq!(controller.phase(), AcquisitionPhase::Idle);
    }

    #[test]
    fn test_channel_samples() {
        let result = AcquisitionResult {
            buffer: vec![0x80, 0x10, 0x81, 0x11, 0x82, 0x12],
            triggered: true,
            applied_offset: 0,
            status: StatusSnapshot::default(),
            cancelled: false,
            sample_rate: None,
        };
        assert_eq!(result.sample_count(), 3);
        assert_eq!(result.channel_samples(Channel::Ch1), Some(vec![0x80, 0x81, 0x82]));
        assert_eq!(result.channel_samples(Channel::Ch2), Some(vec![0x10, 0x11, 0x12]));
        assert_eq!(result.channel_samples(Channel::Ext), None);
    }

    #[test]
    fn test_lazy_frame() {
        let mut result = AcquisitionResult {
            buffer: vec![0x80, 0x10, 0x90, 0xFF],
            triggered: false,
            applied_offset: 0,
            status: StatusSnapshot::default(),
            cancelled: false,
            sample_rate: Some(SampleRate::KS1),
        };

        let df = result.to_lazy_frame().unwrap().collect().unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(
            df.get_column_names_str(),
            [
                TIME_COLUMN_NAME,
                CH1_RAW_COLUMN_NAME,
                CH2_RAW_COLUMN_NAME,
                CH1_COLUMN_NAME,
                CH2_COLUMN_NAME
            ]
        );
        let time = df.column(TIME_COLUMN_NAME).unwrap().f64().unwrap();
        assert_eq!(time.get(1), Some(0.001));
        let ch1 = df.column(CH1_COLUMN_NAME).unwrap().i32().unwrap();
        assert_eq!(ch1.get(0), Some(0));
        assert_eq!(ch1.get(1), Some(16));
        let ch2 = df.column(CH2_COLUMN_NAME).unwrap().i32().unwrap();
        assert_eq!(ch2.get(0), Some(-112));
        assert_eq!(ch2.get(1), Some(127));

        result.sample_rate = None;
        let df = result.to_lazy_frame().unwrap().collect().unwrap();
        assert!(df.column(TIME_COLUMN_NAME).is_err());
    }
}
