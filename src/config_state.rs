//! Shadow state for the write-only configuration registers.
//!
//! `VOLTAGE_DIV`, `VOLTAGE_COUPLING` and `TRIG_LEVEL` each pack settings of
//! both analog channels into one register that cannot be read back. Every
//! setter merges its field into the shadow copy and writes the whole value.

use crate::registers::{Reg, RegisterAccess};
use crate::settings::{Band, Channel, Coupling, SampleRate, VoltageRange};
use crate::transport::{TransportError, UsbTransport};
use crate::trigger_config::{TriggerEdge, TriggerLevel, TriggerSetting};
use std::time::Duration;

/// `VOLTAGE_DIV` after power-up: both channels at nibble 5.
const VOLTAGE_DIV_POWER_ON: u16 = 0x0055;
/// `VOLTAGE_COUPLING` after power-up: both channels in the high band.
const VOLTAGE_COUPLING_POWER_ON: u16 = 0x2800;

const NIBBLE_MASK: u16 = 0x000F;
const FIELD_MASK: u16 = 0b11;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Channel {channel} has no analog front-end")]
    UnsupportedChannel { channel: Channel },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Bit positions of one analog channel inside the composite registers.
struct ChannelLayout {
    index: usize,
    div_shift: u16,
    band_shift: u16,
    coupling_shift: u16,
}

const CH1: ChannelLayout = ChannelLayout {
    index: 0,
    div_shift: 0,
    band_shift: 12,
    coupling_shift: 14,
};

const CH2: ChannelLayout = ChannelLayout {
    index: 1,
    div_shift: 4,
    band_shift: 10,
    coupling_shift: 8,
};

fn layout(channel: Channel) -> Result<&'static ChannelLayout, ConfigError> {
    match channel {
        Channel::Ch1 => Ok(&CH1),
        Channel::Ch2 => Ok(&CH2),
        _ => Err(ConfigError::UnsupportedChannel { channel }),
    }
}

fn merge(register: u16, shift: u16, mask: u16, field: u16) -> u16 {
    (register & !(mask << shift)) | ((field & mask) << shift)
}

/// Values last committed per logical field, used to skip redundant writes.
#[derive(Debug, Clone, Default)]
struct Applied {
    sample_rate: Option<SampleRate>,
    range: [Option<VoltageRange>; 2],
    coupling: [Option<Coupling>; 2],
    trigger_channel: Option<Channel>,
    trigger_edge: Option<TriggerEdge>,
    level: [Option<TriggerLevel>; 2],
}

#[derive(Debug, Clone)]
pub struct ConfigState {
    voltage_div: u16,
    voltage_coupling: u16,
    levels: [TriggerLevel; 2],
    sample_rate: Option<SampleRate>,
    trigger_channel: Option<Channel>,
    trigger_edge: Option<TriggerEdge>,
    applied: Applied,
    range_settle: Duration,
}

impl Default for ConfigState {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl ConfigState {
    pub fn new(range_settle: Duration) -> Self {
        Self {
            voltage_div: VOLTAGE_DIV_POWER_ON,
            voltage_coupling: VOLTAGE_COUPLING_POWER_ON,
            levels: [TriggerLevel(-128); 2],
            sample_rate: None,
            trigger_channel: None,
            trigger_edge: None,
            applied: Applied::default(),
            range_settle,
        }
    }

    pub fn voltage_div_register(&self) -> u16 {
        self.voltage_div
    }

    pub fn voltage_coupling_register(&self) -> u16 {
        self.voltage_coupling
    }

    pub fn trigger_level_register(&self) -> u16 {
        self.levels[0].code() | (self.levels[1].code() << 8)
    }

    /// Range of an analog channel as encoded in the shadow registers.
    pub fn voltage_range(&self, channel: Channel) -> Option<VoltageRange> {
        let layout = layout(channel).ok()?;
        let nibble = (self.voltage_div >> layout.div_shift) & NIBBLE_MASK;
        let band = Band::from_field((self.voltage_coupling >> layout.band_shift) & FIELD_MASK)?;
        VoltageRange::from_fields(band, nibble)
    }

    pub fn coupling(&self, channel: Channel) -> Option<Coupling> {
        let layout = layout(channel).ok()?;
        Coupling::from_field((self.voltage_coupling >> layout.coupling_shift) & FIELD_MASK)
    }

    pub fn trigger_level(&self, channel: Channel) -> Option<TriggerLevel> {
        layout(channel).ok().map(|l| self.levels[l.index])
    }

    pub fn sample_rate(&self) -> Option<SampleRate> {
        self.sample_rate
    }

    pub fn trigger_channel(&self) -> Option<Channel> {
        self.trigger_channel
    }

    pub fn trigger_edge(&self) -> Option<TriggerEdge> {
        self.trigger_edge
    }

    /// Drop the write-coalescing memory so the next setter always writes.
    pub fn forget_applied(&mut self) {
        self.applied = Applied::default();
    }

    pub fn set_sample_rate<T: UsbTransport>(
        &mut self,
        ral: &mut RegisterAccess<T>,
        rate: SampleRate,
    ) -> Result<bool, ConfigError> {
        if self.applied.sample_rate == Some(rate) {
            return Ok(false);
        }
        self.write_sample_rate(ral, rate)?;
        Ok(true)
    }

    pub(crate) fn write_sample_rate<T: UsbTransport>(
        &mut self,
        ral: &mut RegisterAccess<T>,
        rate: SampleRate,
    ) -> Result<(), ConfigError> {
        log::info!("Set sample rate {}", rate);
        ral.set_register(Reg::SampleRate, rate.code())?;
        self.sample_rate = Some(rate);
        self.applied.sample_rate = Some(rate);
        Ok(())
    }

    pub fn set_voltage_range<T: UsbTransport>(
        &mut self,
        ral: &mut RegisterAccess<T>,
        channel: Channel,
        range: VoltageRange,
    ) -> Result<bool, ConfigError> {
        let layout = layout(channel)?;
        if self.applied.range[layout.index] == Some(range) {
            return Ok(false);
        }
        self.write_voltage_range(ral, channel, range)?;
        Ok(true)
    }

    fn write_voltage_range<T: UsbTransport>(
        &mut self,
        ral: &mut RegisterAccess<T>,
        channel: Channel,
        range: VoltageRange,
    ) -> Result<(), ConfigError> {
        let layout = layout(channel)?;
        log::info!("Set voltage range {} {}", channel, range);
        self.merge_range(layout, range);
        ral.set_register(Reg::VoltageDiv, self.voltage_div)?;
        self.latch_coupling(ral, self.voltage_coupling)?;
        self.applied.range[layout.index] = Some(range);
        Ok(())
    }

    fn merge_range(&mut self, layout: &ChannelLayout, range: VoltageRange) {
        self.voltage_div = merge(self.voltage_div, layout.div_shift, NIBBLE_MASK, range.nibble());
        self.voltage_coupling = merge(
            self.voltage_coupling,
            layout.band_shift,
            FIELD_MASK,
            range.band().field(),
        );
    }

    fn merge_coupling(&mut self, layout: &ChannelLayout, coupling: Coupling) {
        self.voltage_coupling = merge(
            self.voltage_coupling,
            layout.coupling_shift,
            FIELD_MASK,
            coupling.field(),
        );
    }

    pub fn set_coupling<T: UsbTransport>(
        &mut self,
        ral: &mut RegisterAccess<T>,
        channel: Channel,
        coupling: Coupling,
    ) -> Result<bool, ConfigError> {
        let layout = layout(channel)?;
        if self.applied.coupling[layout.index] == Some(coupling) {
            return Ok(false);
        }
        self.write_coupling(ral, channel, coupling)?;
        Ok(true)
    }

    fn write_coupling<T: UsbTransport>(
        &mut self,
        ral: &mut RegisterAccess<T>,
        channel: Channel,
        coupling: Coupling,
    ) -> Result<(), ConfigError> {
        let layout = layout(channel)?;
        log::info!("Set coupling {} {:?}", channel, coupling);
        self.merge_coupling(layout, coupling);
        self.latch_coupling(ral, self.voltage_coupling)?;
        self.applied.coupling[layout.index] = Some(coupling);
        Ok(())
    }

    /// Latch `word` into `VOLTAGE_COUPLING` with acquisition paused.
    ///
    /// The shadow is not touched; bring-up uses this for its captured words.
    pub(crate) fn latch_coupling<T: UsbTransport>(
        &self,
        ral: &mut RegisterAccess<T>,
        word: u16,
    ) -> Result<(), TransportError> {
        ral.set_acquisition(false)?;
        if !self.range_settle.is_zero() {
            std::thread::sleep(self.range_settle);
        }
        // Latched by the value/value/zero pattern.
        ral.set_register(Reg::VoltageCoupling, word)?;
        ral.set_register(Reg::VoltageCoupling, word)?;
        ral.set_register(Reg::VoltageCoupling, 0x0000)?;
        ral.pulse_reset()?;
        ral.set_acquisition(true)
    }

    /// Record what the front-end of `channel` holds without writing anything.
    pub(crate) fn assume_channel(
        &mut self,
        channel: Channel,
        range: VoltageRange,
        coupling: Coupling,
    ) -> Result<(), ConfigError> {
        let layout = layout(channel)?;
        self.merge_range(layout, range);
        self.merge_coupling(layout, coupling);
        Ok(())
    }

    /// Write every composite register from its shadow.
    ///
    /// Brings a device of unknown configuration in line with the shadows, so a
    /// later single-channel setter cannot carry stale bits for the other channel.
    pub(crate) fn commit_shadows<T: UsbTransport>(
        &self,
        ral: &mut RegisterAccess<T>,
    ) -> Result<(), TransportError> {
        log::debug!(
            "Commit shadows div 0x{:04x} coupling 0x{:04x} level 0x{:04x}",
            self.voltage_div,
            self.voltage_coupling,
            self.trigger_level_register()
        );
        ral.set_register(Reg::VoltageDiv, self.voltage_div)?;
        self.latch_coupling(ral, self.voltage_coupling)?;
        ral.set_register(Reg::TrigLevel, self.trigger_level_register())
    }

    pub fn set_trigger_channel<T: UsbTransport>(
        &mut self,
        ral: &mut RegisterAccess<T>,
        channel: Channel,
    ) -> Result<bool, ConfigError> {
        if self.applied.trigger_channel == Some(channel) {
            return Ok(false);
        }
        self.write_trigger_channel(ral, channel)?;
        Ok(true)
    }

    pub(crate) fn write_trigger_channel<T: UsbTransport>(
        &mut self,
        ral: &mut RegisterAccess<T>,
        channel: Channel,
    ) -> Result<(), ConfigError> {
        log::info!("Set trigger channel {}", channel);
        ral.set_register(Reg::TrigChannel, channel.code())?;
        self.trigger_channel = Some(channel);
        self.applied.trigger_channel = Some(channel);
        Ok(())
    }

    /// Writes `TRIG_EDGE` and then re-commits `TRIG_LEVEL` from the shadow.
    pub fn set_trigger_edge<T: UsbTransport>(
        &mut self,
        ral: &mut RegisterAccess<T>,
        edge: TriggerEdge,
    ) -> Result<bool, ConfigError> {
        if self.applied.trigger_edge == Some(edge) {
            return Ok(false);
        }
        log::info!("Set trigger edge {:?}", edge);
        ral.set_register(Reg::TrigEdge, edge.code())?;
        ral.set_register(Reg::TrigLevel, self.trigger_level_register())?;
        self.trigger_edge = Some(edge);
        self.applied.trigger_edge = Some(edge);
        Ok(true)
    }

    pub fn set_trigger_level<T: UsbTransport>(
        &mut self,
        ral: &mut RegisterAccess<T>,
        channel: Channel,
        level: TriggerLevel,
    ) -> Result<bool, ConfigError> {
        let layout = layout(channel)?;
        if self.applied.level[layout.index] == Some(level) {
            return Ok(false);
        }
        log::info!("Set trigger level {} {:+}", channel, level.0);
        self.levels[layout.index] = level;
        ral.set_register(Reg::TrigLevel, self.trigger_level_register())?;
        self.applied.level[layout.index] = Some(level);
        Ok(true)
    }

    /// Write a raw `TRIG_LEVEL` value and adopt it as the new shadow.
    pub(crate) fn write_raw_trigger_level<T: UsbTransport>(
        &mut self,
        ral: &mut RegisterAccess<T>,
        raw: u16,
    ) -> Result<(), ConfigError> {
        self.assume_raw_trigger_level(raw);
        ral.set_register(Reg::TrigLevel, raw)?;
        Ok(())
    }

    pub(crate) fn assume_raw_trigger_level(&mut self, raw: u16) {
        let [ch1, ch2] = raw.to_le_bytes();
        self.levels = [TriggerLevel::from_code(ch1), TriggerLevel::from_code(ch2)];
    }

    /// Apply a full trigger setting; returns the number of fields written.
    pub fn apply_trigger<T: UsbTransport>(
        &mut self,
        ral: &mut RegisterAccess<T>,
        setting: &TriggerSetting,
    ) -> Result<usize, ConfigError> {
        let written = [
            self.set_trigger_channel(ral, setting.channel)?,
            self.set_trigger_edge(ral, setting.edge)?,
            self.set_trigger_level(ral, Channel::Ch1, setting.level1)?,
            self.set_trigger_level(ral, Channel::Ch2, setting.level2)?,
        ];
        Ok(written.iter().filter(|w| **w).count())
    }
}
