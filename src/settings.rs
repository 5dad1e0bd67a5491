//! Closed protocol enumerations with their wire encodings.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Ch1,
    Ch2,
    Ch3,
    Ch4,
    Ext,
}

impl Channel {
    pub const ALL: [Self; 5] = [Self::Ch1, Self::Ch2, Self::Ch3, Self::Ch4, Self::Ext];

    /// Value written to `TRIG_CHANNEL`.
    pub fn code(self) -> u16 {
        match self {
            Self::Ch1 => 0,
            Self::Ch2 => 1,
            Self::Ch3 => 2,
            Self::Ch4 => 3,
            Self::Ext => 4,
        }
    }

    /// Only the first two analog channels are wired through the front-end.
    pub fn is_analog(self) -> bool {
        matches!(self, Self::Ch1 | Self::Ch2)
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Ch1 => "CH1",
            Self::Ch2 => "CH2",
            Self::Ch3 => "CH3",
            Self::Ch4 => "CH4",
            Self::Ext => "EXT",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coupling {
    Dc,
    Ac,
}

impl Coupling {
    /// Two-bit field in `VOLTAGE_COUPLING`.
    pub(crate) fn field(self) -> u16 {
        match self {
            Self::Ac => 0b10,
            Self::Dc => 0b01,
        }
    }

    pub(crate) fn from_field(field: u16) -> Option<Self> {
        match field {
            0b10 => Some(Self::Ac),
            0b01 => Some(Self::Dc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SampleRate {
    S1,
    S2,
    S4,
    S10,
    S20,
    S40,
    S100,
    S200,
    S400,
    KS1,
    KS2,
    KS4,
    KS10,
    KS20,
    KS40,
    KS100,
    KS200,
    KS400,
    MS1,
    MS2,
    MS4,
    MS10,
    MS20,
    MS40,
    MS100,
    MS200,
    MS400,
}

impl SampleRate {
    pub const ALL: [Self; 27] = [
        Self::S1,
        Self::S2,
        Self::S4,
        Self::S10,
        Self::S20,
        Self::S40,
        Self::S100,
        Self::S200,
        Self::S400,
        Self::KS1,
        Self::KS2,
        Self::KS4,
        Self::KS10,
        Self::KS20,
        Self::KS40,
        Self::KS100,
        Self::KS200,
        Self::KS400,
        Self::MS1,
        Self::MS2,
        Self::MS4,
        Self::MS10,
        Self::MS20,
        Self::MS40,
        Self::MS100,
        Self::MS200,
        Self::MS400,
    ];

    /// Value written to `SAMPLE_RATE`. Code 0 is reserved by the firmware.
    pub fn code(self) -> u16 {
        self as u16 + 1
    }

    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.get(usize::from(code).checked_sub(1)?).copied()
    }

    pub fn samples_per_second(self) -> u32 {
        // Each decade is split 1-2-4.
        let index = self as u32;
        let decade = 10u32.pow(index / 3);
        decade * [1, 2, 4][(index % 3) as usize]
    }

    pub fn sample_period_secs(self) -> f64 {
        1.0 / f64::from(self.samples_per_second())
    }
}

impl std::fmt::Display for SampleRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sps = self.samples_per_second();
        match sps {
            0..=999 => write!(f, "{sps} S/s"),
            1_000..=999_999 => write!(f, "{} kS/s", sps / 1_000),
            _ => write!(f, "{} MS/s", sps / 1_000_000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VoltageRange {
    MV10,
    MV20,
    MV50,
    MV100,
    MV200,
    MV500,
    V1,
    V2,
    V5,
    V10,
}

/// Analog front-end band selected in `VOLTAGE_COUPLING`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Band {
    Low,
    High,
}

impl Band {
    pub(crate) fn field(self) -> u16 {
        match self {
            Self::Low => 0b01,
            Self::High => 0b10,
        }
    }

    pub(crate) fn from_field(field: u16) -> Option<Self> {
        match field {
            0b01 => Some(Self::Low),
            0b10 => Some(Self::High),
            _ => None,
        }
    }
}

const LOW_BAND_FIRST_NIBBLE: u16 = 5;

impl VoltageRange {
    pub const ALL: [Self; 10] = [
        Self::MV10,
        Self::MV20,
        Self::MV50,
        Self::MV100,
        Self::MV200,
        Self::MV500,
        Self::V1,
        Self::V2,
        Self::V5,
        Self::V10,
    ];

    /// Volts per division.
    pub fn volts(self) -> f64 {
        match self {
            Self::MV10 => 0.010,
            Self::MV20 => 0.020,
            Self::MV50 => 0.050,
            Self::MV100 => 0.100,
            Self::MV200 => 0.200,
            Self::MV500 => 0.500,
            Self::V1 => 1.0,
            Self::V2 => 2.0,
            Self::V5 => 5.0,
            Self::V10 => 10.0,
        }
    }

    pub(crate) fn band(self) -> Band {
        if self < Self::MV100 {
            Band::Low
        } else {
            Band::High
        }
    }

    /// Nibble written to `VOLTAGE_DIV`.
    ///
    /// The high band counts from 0 at 100 mV; the low band counts from 5 at 10 mV.
    pub(crate) fn nibble(self) -> u16 {
        match self.band() {
            Band::Low => self as u16 + LOW_BAND_FIRST_NIBBLE,
            Band::High => self as u16 - Self::MV100 as u16,
        }
    }

    pub(crate) fn from_fields(band: Band, nibble: u16) -> Option<Self> {
        let index = match band {
            Band::Low if (LOW_BAND_FIRST_NIBBLE..LOW_BAND_FIRST_NIBBLE + 3).contains(&nibble) => {
                nibble - LOW_BAND_FIRST_NIBBLE
            }
            Band::High if nibble < 7 => nibble + Self::MV100 as u16,
            _ => return None,
        };
        Self::ALL.get(usize::from(index)).copied()
    }
}

impl std::fmt::Display for VoltageRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let volts = self.volts();
        if volts < 1.0 {
            write!(f, "{} mV", (volts * 1000.0).round())
        } else {
            write!(f, "{volts} V")
        }
    }
}
