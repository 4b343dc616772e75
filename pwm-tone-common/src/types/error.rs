use thiserror::Error;

use crate::types::{Gpio, SliceNum};

/// Wiring errors found at construction. These are programming errors; callers
/// are expected to halt on them.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    #[error(
        "differential pins {plus} and {minus} are on different PWM slices ({plus_slice} != {minus_slice})"
    )]
    SliceMismatch {
        plus: Gpio,
        minus: Gpio,
        plus_slice: SliceNum,
        minus_slice: SliceNum,
    },
}

/// Errors from starting a tone.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ToneError<E> {
    #[error("frequency must be finite and greater than zero")]
    InvalidFrequency,

    #[error("alarm pool error: {0:?}")]
    Alarm(E),
}

pub type ToneResult<T, E> = core::result::Result<T, ToneError<E>>;
