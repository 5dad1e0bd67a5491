//! Power-on bring-up: link stage, initial stage and the calibration sweep.
//!
//! The register writes and shift-line replays here reproduce the traffic of
//! the vendor software byte for byte, including the raw `VOLTAGE_DIV` and
//! `VOLTAGE_COUPLING` words. The shadows are set once the sequence is over.
//! Read-backs that differ from the captured values are recorded as
//! [`VerificationMismatch`]es and the sequence carries on.

use crate::config_state::{ConfigError, ConfigState};
use crate::registers::{Reg, RegisterAccess, VerificationMismatch, SELECT_SAMPLE_DATA};
use crate::settings::{Channel, Coupling, SampleRate, VoltageRange};
use crate::shift_tables::{ShiftSequence, INITIAL_GROUP, LINK_GROUP, TRIM_GROUP};
use crate::transport::{TransportError, UsbTransport};
use std::time::Duration;

const HELLO: u16 = 0x1101;
/// `DEVICE_STATUS` once the link stage has completed.
pub(crate) const STATUS_LINKED: u16 = 0x0001;
const STATUS_CONFIGURING: u16 = 0x0009;
const STATUS_ARMED: u16 = 0x0008;
const ARM_POLLS: usize = 20;

const MAGIC: &[u8] = b"PERYTECH";
const UNKNOWN_CAL_VALUE: u16 = 0x03F8;
const INITIAL_TRIGGER_LEVEL: u16 = 0x0095;

/// `VOLTAGE_COUPLING` words selecting one channel's coupling, Ch1 then Ch2.
const COUPLING_AC_WORDS: [u16; 2] = [0x8000, 0x0200];
const COUPLING_DC_WORDS: [u16; 2] = [0x4000, 0x0100];

/// `VOLTAGE_DIV` and `VOLTAGE_COUPLING` words of one sweep step, Ch1 then Ch2.
///
/// Replayed as captured. The low-band `VOLTAGE_DIV` words carry bits beyond
/// the channel nibbles and the coupling words carry band bits only, so they
/// cannot be derived from the shadows.
struct CalibrationStep {
    range: VoltageRange,
    writes: [(u16, u16); 2],
}

const CALIBRATION_SWEEP: [CalibrationStep; 9] = [
    CalibrationStep {
        range: VoltageRange::MV10,
        writes: [(0x0075, 0x1800), (0x0655, 0x1400)],
    },
    CalibrationStep {
        range: VoltageRange::MV20,
        writes: [(0x0076, 0x1400), (0x0666, 0x1400)],
    },
    CalibrationStep {
        range: VoltageRange::MV50,
        writes: [(0x0067, 0x1400), (0x0677, 0x1400)],
    },
    CalibrationStep {
        range: VoltageRange::MV100,
        writes: [(0x0070, 0x2400), (0x0000, 0x2800)],
    },
    CalibrationStep {
        range: VoltageRange::MV200,
        writes: [(0x0001, 0x2800), (0x0011, 0x2800)],
    },
    CalibrationStep {
        range: VoltageRange::MV500,
        writes: [(0x0012, 0x2800), (0x0022, 0x2800)],
    },
    CalibrationStep {
        range: VoltageRange::V1,
        writes: [(0x0023, 0x2800), (0x0033, 0x2800)],
    },
    CalibrationStep {
        range: VoltageRange::V5,
        writes: [(0x0035, 0x2800), (0x0055, 0x2800)],
    },
    CalibrationStep {
        range: VoltageRange::V10,
        writes: [(0x0056, 0x2800), (0x0066, 0x2800)],
    },
];
const CALIBRATION_BUFFER_BASE: u16 = 0x07D1;
const CALIBRATION_DRAIN_BYTES: u16 = 2000;
const CALIBRATION_CHUNK: u16 = 512;

#[derive(Debug, thiserror::Error)]
pub enum BringUpError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Outcome of [`crate::DeviceSession::initialize`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BringUpReport {
    /// The device already reported a completed link and nothing was replayed.
    pub skipped: bool,
    pub mismatches: Vec<VerificationMismatch>,
}

impl BringUpReport {
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }
}

fn replay_sequence<T: UsbTransport>(
    ral: &mut RegisterAccess<T>,
    group: &'static str,
    index: usize,
    sequence: &ShiftSequence,
) -> Result<(), TransportError> {
    ral.shift_write(&[0x00])?;
    ral.shift_config(0x07)?;
    ral.shift_write(&sequence.pattern)?;

    if let Some(expected) = sequence.expect {
        let mut actual = [0u8; 16];
        for byte in actual.iter_mut() {
            *byte = ral.shift_status()?;
        }
        if actual != expected {
            ral.record_mismatch(VerificationMismatch::ShiftStatus {
                group,
                sequence: index,
                expected: expected.to_vec(),
                actual: actual.to_vec(),
            });
        }
    }

    ral.shift_write(&[0x00])?;
    ral.shift_config(0x00)?;
    Ok(())
}

pub(crate) fn replay_group<T: UsbTransport>(
    ral: &mut RegisterAccess<T>,
    group: &'static str,
    sequences: &[ShiftSequence],
) -> Result<(), TransportError> {
    log::debug!("Replaying {} group ({} sequences)", group, sequences.len());
    for (index, sequence) in sequences.iter().enumerate() {
        replay_sequence(ral, group, index, sequence)?;
    }
    Ok(())
}

fn confirm_status<T: UsbTransport>(
    ral: &mut RegisterAccess<T>,
    expected: u16,
    control: u16,
) -> Result<(), TransportError> {
    ral.get_register_expecting(Reg::DeviceStatus, expected)?;
    ral.set_register(Reg::DeviceControl, control)
}

pub(crate) fn link_stage<T: UsbTransport>(
    ral: &mut RegisterAccess<T>,
    config: &mut ConfigState,
) -> Result<(), BringUpError> {
    log::info!("Link stage");
    replay_group(ral, "link", LINK_GROUP)?;

    ral.get_register_expecting(Reg::Hello, HELLO)?;
    confirm_status(ral, STATUS_LINKED, 0x0001)?;
    confirm_status(ral, STATUS_LINKED, 0x0001)?;

    config.write_trigger_channel(ral, Channel::Ext)?;
    config.write_sample_rate(ral, SampleRate::KS100)?;
    ral.pulse_reset()?;
    ral.set_acquisition(true)?;
    for _ in 0..ARM_POLLS {
        ral.get_register_expecting(Reg::SomeStatus, STATUS_ARMED)?;
    }
    ral.set_acquisition(false)?;

    confirm_status(ral, STATUS_LINKED, 0x0009)?;
    Ok(())
}

pub(crate) fn initial_stage<T: UsbTransport>(
    ral: &mut RegisterAccess<T>,
    config: &mut ConfigState,
    calibration_hold: Duration,
) -> Result<(), BringUpError> {
    log::info!("Initial stage");
    ral.get_register_expecting(Reg::Hello, HELLO)?;
    confirm_status(ral, STATUS_CONFIGURING, 0x0009)?;
    confirm_status(ral, STATUS_CONFIGURING, 0x0009)?;

    replay_group(ral, "initial", INITIAL_GROUP)?;

    ral.select(Reg::Magic.addr())?;
    for c in MAGIC {
        ral.write_data(&[*c, 0x00])?;
    }

    ral.set_register(Reg::UnknownInit61, 0x0000)?;
    confirm_status(ral, STATUS_CONFIGURING, 0x0009)?;
    confirm_status(ral, STATUS_CONFIGURING, 0x0009)?;

    config.write_sample_rate(ral, SampleRate::MS200)?;
    replay_group(ral, "trim", TRIM_GROUP)?;

    for word in COUPLING_AC_WORDS {
        config.latch_coupling(ral, word)?;
    }

    config.write_trigger_channel(ral, Channel::Ch1)?;
    config.write_raw_trigger_level(ral, INITIAL_TRIGGER_LEVEL)?;

    ral.set_register(Reg::UnknownCal, UNKNOWN_CAL_VALUE)?;

    calibration_sweep(ral, config, calibration_hold)?;

    for word in COUPLING_DC_WORDS {
        config.latch_coupling(ral, word)?;
    }
    replay_group(ral, "trim", TRIM_GROUP)?;

    ral.set_register(Reg::UnknownInit67, 0x0000)?;
    ral.write_data(&[0x00, 0x00])?;
    ral.set_register(Reg::UnknownInit68, 0x0003)?;

    confirm_status(ral, STATUS_CONFIGURING, 0x0001)?;
    confirm_status(ral, STATUS_LINKED, 0x0001)?;

    config.write_trigger_channel(ral, Channel::Ch1)?;
    assume_brought_up(config)?;
    Ok(())
}

/// Set the composite shadows to what a freshly brought-up device holds.
fn assume_brought_up(config: &mut ConfigState) -> Result<(), ConfigError> {
    for channel in [Channel::Ch1, Channel::Ch2] {
        config.assume_channel(channel, VoltageRange::V10, Coupling::Dc)?;
    }
    config.assume_raw_trigger_level(INITIAL_TRIGGER_LEVEL);
    Ok(())
}

/// Used when bring-up is skipped: the device was configured by an earlier
/// session, so its composite registers are rewritten to the post-bring-up
/// values the shadows assume.
pub(crate) fn reseed<T: UsbTransport>(
    ral: &mut RegisterAccess<T>,
    config: &mut ConfigState,
) -> Result<(), BringUpError> {
    assume_brought_up(config)?;
    config.commit_shadows(ral)?;
    Ok(())
}

fn calibration_sweep<T: UsbTransport>(
    ral: &mut RegisterAccess<T>,
    config: &ConfigState,
    hold: Duration,
) -> Result<(), BringUpError> {
    for step in &CALIBRATION_SWEEP {
        for (div, coupling) in step.writes {
            ral.set_register(Reg::VoltageDiv, div)?;
            config.latch_coupling(ral, coupling)?;
        }

        ral.pulse_reset()?;
        ral.set_acquisition(true)?;
        if !hold.is_zero() {
            std::thread::sleep(hold);
        }
        ral.set_acquisition(false)?;

        let buffer_count = ral.get_register(Reg::BufferCount)?;
        let snapshot = ral.status_snapshot()?;
        log::debug!("Calibration {}: {}", step.range, snapshot);

        ral.set_register(
            Reg::SkipOffset,
            buffer_count.wrapping_sub(CALIBRATION_BUFFER_BASE),
        )?;

        // The device streams a fixed block; the reads are not retried.
        ral.select(SELECT_SAMPLE_DATA)?;
        let mut remaining = CALIBRATION_DRAIN_BYTES;
        while remaining > 0 {
            let request = remaining.min(CALIBRATION_CHUNK);
            let data = ral.read_data(request)?;
            if remaining == CALIBRATION_DRAIN_BYTES {
                log::trace!("Calibration data {:02x?}", &data[..data.len().min(32)]);
            }
            remaining -= request;
        }
    }
    Ok(())
}
