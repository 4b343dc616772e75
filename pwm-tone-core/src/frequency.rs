//! 频率换算
//!
//! The output toggles once per half-period, so everything downstream is
//! expressed in whole microseconds per half-period. Rounding to whole
//! microseconds costs accuracy as the frequency goes up: about 200 Hz of error
//! at 20 kHz.

/// Lowest frequency the driver is rated for.
pub const MIN_PRACTICAL_FREQUENCY_HZ: f32 = 7.5;

pub fn is_valid_frequency(frequency: f32) -> bool {
    frequency.is_finite() && frequency > 0.0
}

/// Half-period of `frequency` (Hz) in microseconds, rounded to nearest.
///
/// Only meaningful for frequencies accepted by [`is_valid_frequency`].
pub fn half_period_us(frequency: f32) -> u32 {
    libm::round(1e6 / (2.0 * frequency as f64)) as u32
}

/// Frequency actually produced when toggling every `half_period_us`.
pub fn apparent_frequency(half_period_us: u32) -> f32 {
    if half_period_us == 0 {
        return f32::INFINITY;
    }
    (1e6 / (2.0 * half_period_us as f64)) as f32
}
