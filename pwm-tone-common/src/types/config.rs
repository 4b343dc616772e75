use serde::{Deserialize, Serialize};

/// PWM counter top used for every tone.
///
/// Fixed at 1000 so one tenth of a volume percent is one duty-cycle count.
pub const TONE_PWM_TOP: u16 = 1000;

/// Alarm used when nothing else is configured.
pub const DEFAULT_HARDWARE_ALARM: u8 = 3;

/// Same capacity as the SDK default alarm pool.
pub const DEFAULT_MAX_TIMERS: u16 = 16;

/// Slice settings applied before each tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PwmSliceConfig {
    pub phase_correct: bool,
    pub clk_div_int: u8,
    pub wrap: u16,
}

impl PwmSliceConfig {
    /// Phase-correct, undivided system clock, counter top of [`TONE_PWM_TOP`].
    ///
    /// At a stock 125 MHz clock this gives a 62.5 kHz carrier.
    pub const fn tone() -> Self {
        Self {
            phase_correct: true,
            clk_div_int: 1,
            wrap: TONE_PWM_TOP,
        }
    }
}

impl Default for PwmSliceConfig {
    fn default() -> Self {
        Self::tone()
    }
}

/// Per-instance timer resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct ToneConfig {
    /// Hardware alarm claimed by this instance's pool. Give each instance its own.
    pub hardware_alarm: u8,
    pub max_timers: u16,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            hardware_alarm: DEFAULT_HARDWARE_ALARM,
            max_timers: DEFAULT_MAX_TIMERS,
        }
    }
}

impl ToneConfig {
    pub const fn with_alarm(hardware_alarm: u8) -> Self {
        Self {
            hardware_alarm,
            max_timers: DEFAULT_MAX_TIMERS,
        }
    }
}
