//! 音调请求

use serde::{Deserialize, Serialize};

/// Unit of a tone duration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeUnit {
    #[default]
    Milliseconds,
    Microseconds,
}

impl TimeUnit {
    pub const fn micros_per_unit(&self) -> u64 {
        match self {
            TimeUnit::Milliseconds => 1000,
            TimeUnit::Microseconds => 1,
        }
    }
}

/// One tone as asked for by the caller.
///
/// `frequency` is in Hz and must be finite and positive. `volume` is a
/// percentage, clamped to 0..=100 and kept to one decimal place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToneRequest {
    pub frequency: f32,
    pub volume: f32,
    pub duration: u32,
    #[serde(default)]
    pub unit: TimeUnit,
}

impl ToneRequest {
    pub const fn new(frequency: f32, volume: f32, duration: u32, unit: TimeUnit) -> Self {
        Self {
            frequency,
            volume,
            duration,
            unit,
        }
    }

    pub const fn millis(frequency: f32, volume: f32, duration_ms: u32) -> Self {
        Self::new(frequency, volume, duration_ms, TimeUnit::Milliseconds)
    }

    pub const fn micros(frequency: f32, volume: f32, duration_us: u32) -> Self {
        Self::new(frequency, volume, duration_us, TimeUnit::Microseconds)
    }
}
