use crate::settings::Channel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEdge {
    Rising,
    Falling,
}

impl TriggerEdge {
    /// Value written to `TRIG_EDGE`.
    pub fn code(self) -> u16 {
        match self {
            Self::Rising => 2,
            Self::Falling => 1,
        }
    }
}

/// Signed trigger threshold in ADC counts relative to mid-scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct TriggerLevel(pub i8);

impl TriggerLevel {
    /// Byte code as stored in one half of `TRIG_LEVEL`.
    pub fn code(self) -> u16 {
        (i16::from(self.0) + 0x80) as u16
    }

    pub fn from_code(code: u8) -> Self {
        Self((i16::from(code) - 0x80) as i8)
    }
}

impl From<i8> for TriggerLevel {
    fn from(level: i8) -> Self {
        Self(level)
    }
}

/// Complete trigger configuration: source, edge and both analog thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerSetting {
    pub channel: Channel,
    pub edge: TriggerEdge,
    pub level1: TriggerLevel,
    pub level2: TriggerLevel,
}

impl Default for TriggerSetting {
    fn default() -> Self {
        Self {
            channel: Channel::Ch1,
            edge: TriggerEdge::Rising,
            level1: TriggerLevel(10),
            level2: TriggerLevel(10),
        }
    }
}

impl TriggerSetting {
    pub fn start_capturing_when(channel: Channel) -> TriggerBuilder {
        TriggerBuilder {
            setting: Self {
                channel,
                ..Self::default()
            },
        }
    }

    /// Threshold of an analog channel, `None` for channels without one.
    pub fn level(&self, channel: Channel) -> Option<TriggerLevel> {
        match channel {
            Channel::Ch1 => Some(self.level1),
            Channel::Ch2 => Some(self.level2),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct TriggerBuilder {
    setting: TriggerSetting,
}

impl TriggerBuilder {
    pub fn rises_above(mut self, level: i8) -> TriggerSetting {
        self.setting.edge = TriggerEdge::Rising;
        self.set_source_level(level);
        self.setting
    }

    pub fn falls_below(mut self, level: i8) -> TriggerSetting {
        self.setting.edge = TriggerEdge::Falling;
        self.set_source_level(level);
        self.setting
    }

    /// Threshold of the channel that is not the trigger source.
    pub fn other_level(mut self, level: i8) -> Self {
        match self.setting.channel {
            Channel::Ch2 => self.setting.level1 = TriggerLevel(level),
            _ => self.setting.level2 = TriggerLevel(level),
        }
        self
    }

    fn set_source_level(&mut self, level: i8) {
        match self.setting.channel {
            Channel::Ch2 => self.setting.level2 = TriggerLevel(level),
            // Ch3/Ch4/Ext have no threshold register, keep Ch1's slot in sync.
            _ => self.setting.level1 = TriggerLevel(level),
        }
    }
}
