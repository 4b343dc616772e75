use serde::{Deserialize, Serialize};

use crate::traits::PwmDriver;
use crate::types::ConfigError;

/// GPIO 编号
pub type Gpio = u8;

/// PWM slice 编号
pub type SliceNum = u8;

/// Output wiring of one tone generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinTopology {
    /// One driven pin, the other speaker lead on ground.
    SingleEnded { pin: Gpio },
    /// Two complementary channels of the same slice.
    Differential { plus: Gpio, minus: Gpio },
}

impl PinTopology {
    pub const fn from_pins(plus: Gpio, minus: Option<Gpio>) -> Self {
        match minus {
            Some(minus) => PinTopology::Differential { plus, minus },
            None => PinTopology::SingleEnded { pin: plus },
        }
    }

    pub const fn plus(&self) -> Gpio {
        match *self {
            PinTopology::SingleEnded { pin } => pin,
            PinTopology::Differential { plus, .. } => plus,
        }
    }

    pub const fn minus(&self) -> Option<Gpio> {
        match *self {
            PinTopology::SingleEnded { .. } => None,
            PinTopology::Differential { minus, .. } => Some(minus),
        }
    }

    pub const fn is_differential(&self) -> bool {
        matches!(self, PinTopology::Differential { .. })
    }

    /// Returns the slice shared by every pin of the topology.
    pub fn resolve_slice<P: PwmDriver>(&self, pwm: &P) -> Result<SliceNum, ConfigError> {
        let plus_slice = pwm.gpio_to_slice(self.plus());
        if let Some(minus) = self.minus() {
            let minus_slice = pwm.gpio_to_slice(minus);
            if minus_slice != plus_slice {
                return Err(ConfigError::SliceMismatch {
                    plus: self.plus(),
                    minus,
                    plus_slice,
                    minus_slice,
                });
            }
        }
        Ok(plus_slice)
    }
}
