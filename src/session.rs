//! The public entry point: one device, one lock.
//!
//! Every call locks the session for its whole duration, so a register select
//! and the transfer that follows it can never be separated by another
//! caller's traffic. Callers that need overlap (a UI thread changing settings
//! while a worker acquires) share the session behind an `Arc` and are
//! serialized here.

use crate::acquisition::{
    AcquisitionController, AcquisitionError, AcquisitionRequest, AcquisitionResult, CancelToken,
};
use crate::bringup::{self, BringUpError, BringUpReport, STATUS_LINKED};
use crate::config_state::{ConfigError, ConfigState};
use crate::connector::{ConnectorError, PeryConnector};
use crate::registers::{Reg, RegisterAccess, StatusSnapshot, VerificationMismatch};
use crate::settings::{Channel, Coupling, SampleRate, VoltageRange};
use crate::transport::{RusbTransport, TransportError, UsbTransport};
use crate::trigger_config::{TriggerEdge, TriggerLevel, TriggerSetting};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    LinkInitialized,
    Ready,
    Acquiring,
    Error,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Closed => "closed",
            Self::LinkInitialized => "link initialized",
            Self::Ready => "ready",
            Self::Acquiring => "acquiring",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Connection error: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Channel {channel} has no analog front-end")]
    UnsupportedChannel { channel: Channel },

    #[error("Sample stream stalled after {received} of {expected} bytes")]
    DrainStalled { received: usize, expected: usize },

    #[error("Session is {state}, initialize it first")]
    NotReady { state: SessionState },
}

impl ScopeError {
    /// The device state is unknown afterwards and needs a fresh `initialize`.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::DrainStalled { .. })
    }
}

impl From<ConfigError> for ScopeError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::UnsupportedChannel { channel } => Self::UnsupportedChannel { channel },
            ConfigError::Transport(err) => Self::Transport(err),
        }
    }
}

impl From<AcquisitionError> for ScopeError {
    fn from(err: AcquisitionError) -> Self {
        match err {
            AcquisitionError::DrainStalled { received, expected } => {
                Self::DrainStalled { received, expected }
            }
            AcquisitionError::Transport(err) => Self::Transport(err),
        }
    }
}

impl From<BringUpError> for ScopeError {
    fn from(err: BringUpError) -> Self {
        match err {
            BringUpError::Transport(err) => Self::Transport(err),
            BringUpError::Config(err) => err.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Sleep between trigger polls. Zero busy-polls.
    pub poll_interval: Duration,
    /// Largest bulk read issued while draining samples.
    pub chunk_size: usize,
    /// Consecutive empty bulk reads tolerated before the drain gives up.
    pub max_empty_reads: usize,
    /// How long the ADC runs for each calibration range.
    pub calibration_hold: Duration,
    /// Extra pause while acquisition is disabled for a range or coupling switch.
    pub range_settle: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::ZERO,
            chunk_size: 512,
            max_empty_reads: 16,
            calibration_hold: Duration::from_millis(64),
            range_settle: Duration::ZERO,
        }
    }
}

impl SessionConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_max_empty_reads(mut self, reads: usize) -> Self {
        self.max_empty_reads = reads;
        self
    }

    pub fn with_calibration_hold(mut self, hold: Duration) -> Self {
        self.calibration_hold = hold;
        self
    }

    pub fn with_range_settle(mut self, settle: Duration) -> Self {
        self.range_settle = settle;
        self
    }
}

struct SessionInner<T: UsbTransport> {
    ral: RegisterAccess<T>,
    config: ConfigState,
    acquisition: AcquisitionController,
    settings: SessionConfig,
    state: SessionState,
}

impl<T: UsbTransport> SessionInner<T> {
    fn require_ready(&self) -> Result<(), ScopeError> {
        match self.state {
            SessionState::Ready => Ok(()),
            state => Err(ScopeError::NotReady { state }),
        }
    }

    fn track<R>(&mut self, result: Result<R, ScopeError>) -> Result<R, ScopeError> {
        if let Err(err) = &result {
            if err.is_fatal() {
                log::error!("Session failed in state {}: {}", self.state, err);
                self.state = SessionState::Error;
            }
        }
        result
    }

    fn initialize(&mut self, force: bool) -> Result<BringUpReport, ScopeError> {
        self.ral.transport_mut().reset()?;
        self.ral.take_mismatches();
        self.config = ConfigState::new(self.settings.range_settle);

        if !force && self.ral.get_register(Reg::DeviceStatus)? == STATUS_LINKED {
            log::info!("Device already initialized, skipping bring-up");
            bringup::reseed(&mut self.ral, &mut self.config)?;
            self.state = SessionState::Ready;
            return Ok(BringUpReport {
                skipped: true,
                mismatches: Vec::new(),
            });
        }

        bringup::link_stage(&mut self.ral, &mut self.config)?;
        self.state = SessionState::LinkInitialized;
        bringup::initial_stage(
            &mut self.ral,
            &mut self.config,
            self.settings.calibration_hold,
        )?;
        self.config.forget_applied();
        self.state = SessionState::Ready;

        let mismatches = self.ral.mismatches().to_vec();
        if mismatches.is_empty() {
            log::info!("Bring-up complete");
        } else {
            log::warn!("Bring-up complete with {} mismatches", mismatches.len());
        }
        Ok(BringUpReport {
            skipped: false,
            mismatches,
        })
    }
}

/// Zone for the profiler, when the application has started a tracy client.
#[cfg(feature = "cpu-profiling")]
fn profiling_span(location: &'static tracy_client::SpanLocation) -> Option<tracy_client::Span> {
    tracy_client::Client::running().map(|client| client.span(location, 0))
}

/// Exclusive handle on one oscilloscope.
///
/// ```rust,no_run
/// use peryscope_rs::{AcquisitionRequest, Channel, DeviceSession, SessionConfig, VoltageRange};
///
/// let (session, report) = DeviceSession::connect(SessionConfig::default(), false)?;
/// if !report.is_clean() {
///     eprintln!("{} read-backs differed", report.mismatches.len());
/// }
/// session.set_voltage_range(Channel::Ch1, VoltageRange::V1)?;
/// let result = session.acquire(&AcquisitionRequest::new(2000))?;
/// println!("triggered: {}", result.triggered);
/// # Ok::<(), peryscope_rs::ScopeError>(())
/// ```
pub struct DeviceSession<T: UsbTransport> {
    inner: Mutex<SessionInner<T>>,
}

impl<T: UsbTransport> std::fmt::Debug for DeviceSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("DeviceSession");
        match self.inner.try_lock() {
            Ok(inner) => debug.field("state", &inner.state),
            Err(_) => debug.field("state", &"<locked>"),
        };
        debug.finish_non_exhaustive()
    }
}

impl DeviceSession<RusbTransport> {
    /// Open the first attached scope and bring it up.
    pub fn connect(config: SessionConfig, force: bool) -> Result<(Self, BringUpReport), ScopeError> {
        let transport = PeryConnector::connect(None)?;
        Self::open(transport, config, force)
    }
}

impl<T: UsbTransport> DeviceSession<T> {
    pub fn new(transport: T, settings: SessionConfig) -> Self {
        let acquisition = AcquisitionController::new(
            settings.poll_interval,
            settings.chunk_size,
            settings.max_empty_reads,
        );
        Self {
            inner: Mutex::new(SessionInner {
                ral: RegisterAccess::new(transport),
                config: ConfigState::new(settings.range_settle),
                acquisition,
                settings,
                state: SessionState::Closed,
            }),
        }
    }

    #[tracing::instrument(skip(transport, settings))]
    pub fn open(
        transport: T,
        settings: SessionConfig,
        force: bool,
    ) -> Result<(Self, BringUpReport), ScopeError> {
        let session = Self::new(transport, settings);
        let report = session.initialize(force)?;
        Ok((session, report))
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner<T>> {
        // The inner state stays consistent across a panic in another caller.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reset the device and run the bring-up sequence.
    ///
    /// Without `force`, bring-up is skipped when the device already reports a
    /// completed link.
    #[tracing::instrument(skip(self))]
    pub fn initialize(&self, force: bool) -> Result<BringUpReport, ScopeError> {
        #[cfg(feature = "cpu-profiling")]
        let _span = profiling_span(tracy_client::span_location!("initialize"));

        let mut inner = self.lock();
        let result = inner.initialize(force);
        inner.track(result)
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Copy of the shadowed configuration registers.
    pub fn config_snapshot(&self) -> ConfigState {
        self.lock().config.clone()
    }

    /// Drain the recorded verification mismatches.
    ///
    /// At most [`MISMATCH_LIMIT`](crate::registers::MISMATCH_LIMIT) are kept
    /// between drains; long-running callers should drain after each
    /// `initialize` or `get_register_expecting` batch.
    pub fn take_mismatches(&self) -> Vec<VerificationMismatch> {
        self.lock().ral.take_mismatches()
    }

    fn configure<R>(
        &self,
        apply: impl FnOnce(&mut SessionInner<T>) -> Result<R, ConfigError>,
    ) -> Result<R, ScopeError> {
        let mut inner = self.lock();
        inner.require_ready()?;
        let result = apply(&mut *inner).map_err(ScopeError::from);
        inner.track(result)
    }

    /// Returns `false` when the rate was already applied and nothing was written.
    #[tracing::instrument(skip(self))]
    pub fn set_sample_rate(&self, rate: SampleRate) -> Result<bool, ScopeError> {
        self.configure(|inner| inner.config.set_sample_rate(&mut inner.ral, rate))
    }

    #[tracing::instrument(skip(self))]
    pub fn set_voltage_range(
        &self,
        channel: Channel,
        range: VoltageRange,
    ) -> Result<bool, ScopeError> {
        self.configure(|inner| inner.config.set_voltage_range(&mut inner.ral, channel, range))
    }

    #[tracing::instrument(skip(self))]
    pub fn set_coupling(&self, channel: Channel, coupling: Coupling) -> Result<bool, ScopeError> {
        self.configure(|inner| inner.config.set_coupling(&mut inner.ral, channel, coupling))
    }

    #[tracing::instrument(skip(self))]
    pub fn set_trigger_channel(&self, channel: Channel) -> Result<bool, ScopeError> {
        self.configure(|inner| inner.config.set_trigger_channel(&mut inner.ral, channel))
    }

    #[tracing::instrument(skip(self))]
    pub fn set_trigger_edge(&self, edge: TriggerEdge) -> Result<bool, ScopeError> {
        self.configure(|inner| inner.config.set_trigger_edge(&mut inner.ral, edge))
    }

    #[tracing::instrument(skip(self))]
    pub fn set_trigger_level(
        &self,
        channel: Channel,
        level: TriggerLevel,
    ) -> Result<bool, ScopeError> {
        self.configure(|inner| inner.config.set_trigger_level(&mut inner.ral, channel, level))
    }

    #[tracing::instrument(skip(self))]
    pub fn apply_trigger(&self, trigger: &TriggerSetting) -> Result<usize, ScopeError> {
        self.configure(|inner| inner.config.apply_trigger(&mut inner.ral, trigger))
    }

    #[tracing::instrument(skip(self))]
    pub fn acquire(&self, request: &AcquisitionRequest) -> Result<AcquisitionResult, ScopeError> {
        self.run_acquisition(request, None)
    }

    /// Like [`Self::acquire`], but the trigger wait stops once `cancel` is set.
    #[tracing::instrument(skip(self, cancel))]
    pub fn acquire_cancellable(
        &self,
        request: &AcquisitionRequest,
        cancel: &CancelToken,
    ) -> Result<AcquisitionResult, ScopeError> {
        self.run_acquisition(request, Some(cancel))
    }

    fn run_acquisition(
        &self,
        request: &AcquisitionRequest,
        cancel: Option<&CancelToken>,
    ) -> Result<AcquisitionResult, ScopeError> {
        #[cfg(feature = "cpu-profiling")]
        let _span = profiling_span(tracy_client::span_location!("acquire"));

        let mut inner = self.lock();
        inner.require_ready()?;
        inner.state = SessionState::Acquiring;

        let sample_rate = inner.config.sample_rate();
        let SessionInner {
            ral, acquisition, ..
        } = &mut *inner;
        let result = acquisition
            .acquire(ral, request, sample_rate, cancel)
            .map_err(ScopeError::from);

        inner.state = SessionState::Ready;
        inner.track(result)
    }

    pub fn status_snapshot(&self) -> Result<StatusSnapshot, ScopeError> {
        let mut inner = self.lock();
        let result = inner.ral.status_snapshot().map_err(ScopeError::from);
        inner.track(result)
    }

    #[tracing::instrument(skip(self, addr))]
    pub fn get_register(&self, addr: impl Into<u8>) -> Result<u16, ScopeError> {
        let mut inner = self.lock();
        let result = inner.ral.get_register(addr).map_err(ScopeError::from);
        inner.track(result)
    }

    /// Read a register; a differing value is recorded as a mismatch, not an error.
    #[tracing::instrument(skip(self, addr))]
    pub fn get_register_expecting(
        &self,
        addr: impl Into<u8>,
        expected: u16,
    ) -> Result<u16, ScopeError> {
        let mut inner = self.lock();
        let result = inner
            .ral
            .get_register_expecting(addr, expected)
            .map_err(ScopeError::from);
        inner.track(result)
    }

    /// Raw register write. Bypasses the configuration shadows.
    #[tracing::instrument(skip(self, addr))]
    pub fn set_register(&self, addr: impl Into<u8>, value: u16) -> Result<(), ScopeError> {
        let mut inner = self.lock();
        let result = inner.ral.set_register(addr, value).map_err(ScopeError::from);
        inner.track(result)
    }

    /// Stop the ADC and return to [`SessionState::Closed`].
    pub fn close(&self) {
        let mut inner = self.lock();
        if inner.state == SessionState::Ready {
            if let Err(err) = inner.ral.set_acquisition(false) {
                log::warn!("Failed to stop acquisition on close: {}", err);
            }
        }
        inner.config.forget_applied();
        inner.state = SessionState::Closed;
    }

    pub fn into_transport(self) -> T {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .ral
            .into_transport()
    }

    #[cfg(test)]
    pub(crate) fn with_transport<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(self.lock().ral.transport_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_transport::{MockDevice, Op};
    use std::sync::Arc;

    fn fast_config() -> SessionConfig {
        SessionConfig::default().with_calibration_hold(Duration::ZERO)
    }

    fn ready_session() -> DeviceSession<MockDevice> {
        let (session, report) =
            DeviceSession::open(MockDevice::scripted(), fast_config(), true).unwrap();
        assert!(!report.skipped);
        assert!(report.is_clean(), "{:?}", report.mismatches);
        session.with_transport(MockDevice::clear_ops);
        session
    }

    #[test]
    fn test_open_runs_bring_up() {
        let session = ready_session();
        assert_eq!(session.state(), SessionState::Ready);

        let config = session.config_snapshot();
        assert_eq!(config.sample_rate(), Some(SampleRate::MS200));
        assert_eq!(config.coupling(Channel::Ch2), Some(Coupling::Dc));
        assert_eq!(config.voltage_range(Channel::Ch2), Some(VoltageRange::V10));
    }

    #[test]
    fn test_bring_up_skipped_when_linked() {
        let mut device = MockDevice::new();
        device.set_value(Reg::DeviceStatus, 0x0001);
        let (session, report) = DeviceSession::open(device, fast_config(), false).unwrap();

        assert!(report.skipped);
        assert_eq!(session.state(), SessionState::Ready);
        session.with_transport(|device| {
            assert_eq!(
                device.ops()[..3],
                [
                    Op::Reset,
                    Op::Select(0x02),
                    Op::BulkIn {
                        requested: 2,
                        returned: 2
                    }
                ]
            );
            assert!(!device.ops().contains(&Op::ShiftStatus));
            // Composite registers are rewritten to the post-bring-up values.
            assert_eq!(device.writes_to(Reg::VoltageDiv), vec![0x0066]);
            assert_eq!(device.writes_to(Reg::TrigLevel), vec![0x0095]);
        });
    }

    #[test]
    fn test_skipped_bring_up_keeps_other_channel() {
        let mut device = MockDevice::new();
        device.set_value(Reg::DeviceStatus, 0x0001);
        device.set_value(Reg::VoltageDiv, 0x0012);
        let (session, report) = DeviceSession::open(device, fast_config(), false).unwrap();
        assert!(report.skipped);
        session.with_transport(MockDevice::clear_ops);

        session
            .set_voltage_range(Channel::Ch1, VoltageRange::MV10)
            .unwrap();

        let config = session.config_snapshot();
        assert_eq!(config.voltage_range(Channel::Ch1), Some(VoltageRange::MV10));
        assert_eq!(config.voltage_range(Channel::Ch2), Some(VoltageRange::V10));
        assert_eq!(config.coupling(Channel::Ch2), Some(Coupling::Dc));
        session.with_transport(|device| {
            assert_eq!(device.writes_to(Reg::VoltageDiv), vec![0x0065]);
            assert_eq!(
                device.writes_to(Reg::VoltageCoupling),
                vec![0x5900, 0x5900, 0x0000]
            );
        });
    }

    #[cfg(feature = "cpu-profiling")]
    #[test]
    fn test_spans_without_profiler_client() {
        // The library never starts tracy itself.
        let session = ready_session();
        session.with_transport(|device| device.set_value(Reg::SomeStatus, 0x000B));
        session.acquire(&AcquisitionRequest::new(10)).unwrap();
        session.initialize(true).unwrap();
    }

    #[test]
    fn test_force_ignores_link_status() {
        let session = DeviceSession::new(MockDevice::scripted(), fast_config());
        let report = session.initialize(true).unwrap();
        assert!(!report.skipped);
        session.with_transport(|device| assert!(device.ops().contains(&Op::ShiftStatus)));
    }

    #[test]
    fn test_setters_require_ready() {
        let session = DeviceSession::new(MockDevice::new(), fast_config());
        assert!(matches!(
            session.set_sample_rate(SampleRate::MS1),
            Err(ScopeError::NotReady {
                state: SessionState::Closed
            })
        ));
        assert!(matches!(
            session.acquire(&AcquisitionRequest::new(10)),
            Err(ScopeError::NotReady { .. })
        ));
        session.with_transport(|device| assert!(device.ops().is_empty()));

        // Register access does not need a completed bring-up.
        session.set_register(Reg::SampleRate, 3).unwrap();
        assert_eq!(session.get_register(Reg::SampleRate).unwrap(), 3);
    }

    #[test]
    fn test_setters_coalesce() {
        let session = ready_session();
        assert!(session.set_sample_rate(SampleRate::KS10).unwrap());
        assert!(!session.set_sample_rate(SampleRate::KS10).unwrap());
        assert!(session
            .set_trigger_level(Channel::Ch1, TriggerLevel(-3))
            .unwrap());
        session.with_transport(|device| {
            assert_eq!(device.register_writes(), vec![(0x59, 13), (0x57, 0x007D)]);
        });
    }

    #[test]
    fn test_unsupported_channel_keeps_session_ready() {
        let session = ready_session();
        assert!(matches!(
            session.set_coupling(Channel::Ch3, Coupling::Ac),
            Err(ScopeError::UnsupportedChannel {
                channel: Channel::Ch3
            })
        ));
        assert_eq!(session.state(), SessionState::Ready);
        session.with_transport(|device| assert!(device.ops().is_empty()));
    }

    #[test]
    fn test_transport_error_releases_lock() {
        let session = ready_session();
        session.with_transport(MockDevice::fail_next_call);

        let err = session
            .set_voltage_range(Channel::Ch1, VoltageRange::MV50)
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(session.state(), SessionState::Error);

        // The lock is free and raw access still works.
        session.set_register(Reg::SampleRate, 7).unwrap();
        assert_eq!(session.get_register(Reg::SampleRate).unwrap(), 7);
        assert!(matches!(
            session.set_sample_rate(SampleRate::S1),
            Err(ScopeError::NotReady {
                state: SessionState::Error
            })
        ));

        session.with_transport(|device| device.set_value(Reg::DeviceStatus, 0x0001));
        let report = session.initialize(false).unwrap();
        assert!(report.skipped);
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[test]
    fn test_acquire() {
        let session = ready_session();
        session.with_transport(|device| {
            device.set_value(Reg::SomeStatus, 0x000B);
            device.set_value(Reg::TriggerCount, 0x03EA);
        });

        let result = session
            .acquire(&AcquisitionRequest::new(600).with_trigger_offset(-2))
            .unwrap();
        assert!(result.triggered);
        assert_eq!(result.buffer.len(), 1200);
        assert_eq!(result.applied_offset, 2);
        assert_eq!(result.sample_rate, Some(SampleRate::MS200));
        assert_eq!(session.state(), SessionState::Ready);
        session.with_transport(|device| {
            assert_eq!(device.writes_to(Reg::SkipOffset), vec![0xFFFE]);
        });
    }

    #[test]
    fn test_stalled_drain_is_fatal() {
        let session = ready_session();
        session.with_transport(MockDevice::stall_sample_stream);
        let err = session
            .acquire(&AcquisitionRequest::new(10).with_trigger_timeout(Duration::ZERO))
            .unwrap_err();
        assert!(matches!(err, ScopeError::DrainStalled { .. }));
        assert_eq!(session.state(), SessionState::Error);
    }

    #[test]
    fn test_cancel_from_another_thread() {
        let session = Arc::new(ready_session());
        let token = CancelToken::new();

        let worker = {
            let session = Arc::clone(&session);
            let token = token.clone();
            std::thread::spawn(move || {
                let request =
                    AcquisitionRequest::new(100).with_trigger_timeout(Duration::from_secs(30));
                session.acquire_cancellable(&request, &token)
            })
        };
        token.cancel();

        let result = worker.join().unwrap().unwrap();
        assert!(result.cancelled);
        assert_eq!(result.buffer.len(), 200);
    }

    #[test]
    fn test_concurrent_callers_do_not_interleave() {
        let session = Arc::new(ready_session());
        let workers: Vec<_> = (0..4u16)
            .map(|i| {
                let session = Arc::clone(&session);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        session.set_register(Reg::SkipOffset, i).unwrap();
                        session.status_snapshot().unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        session.with_transport(|device| {
            let ops = device.ops();
            for pair in ops.windows(2) {
                if let [Op::Select(addr), next] = pair {
                    let paired = match next {
                        Op::Write { addr: target, .. } => target == addr,
                        Op::BulkIn { .. } => true,
                        _ => false,
                    };
                    assert!(paired, "select 0x{addr:02x} followed by {next:?}");
                }
            }
            assert_eq!(device.writes_to(Reg::SkipOffset).len(), 100);
        });
    }

    #[test]
    fn test_close() {
        let session = ready_session();
        session.close();
        assert_eq!(session.state(), SessionState::Closed);
        session.with_transport(|device| {
            assert_eq!(device.writes_to(Reg::AdControl), vec![0]);
        });
        assert!(matches!(
            session.set_coupling(Channel::Ch1, Coupling::Ac),
            Err(ScopeError::NotReady { .. })
        ));

        let device = session.into_transport();
        assert_eq!(device.value(Reg::AdControl), 0);
    }
}
