//! 音调参数解析

use pwm_tone_common::{PinTopology, TONE_PWM_TOP, TimeUnit, ToneRequest};

use crate::frequency::half_period_us;

/// Clamps `volume` to 0..=100 and quantizes it to tenths, giving a compare
/// level on the 0..=[`TONE_PWM_TOP`] scale. NaN is treated as silence.
pub fn resolve_level(volume: f32) -> u16 {
    if volume.is_nan() {
        return 0;
    }
    let clamped = volume.clamp(0.0, 100.0);
    let level = libm::roundf(clamped * 10.0) as u16;
    level.min(TONE_PWM_TOP)
}

/// Number of half-period toggles that fit in `duration`, truncated.
///
/// A zero half-period yields zero toggles.
pub fn toggle_count(duration: u32, unit: TimeUnit, half_period_us: u32) -> u32 {
    if half_period_us == 0 {
        return 0;
    }
    let toggles = duration as u64 * unit.micros_per_unit() / half_period_us as u64;
    u32::try_from(toggles).unwrap_or(u32::MAX)
}

/// Immutable snapshot of everything the toggle callback needs for one tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ToneParams {
    pub topology: PinTopology,
    pub level: u16,
    pub half_period_us: u32,
    pub total_toggles: u32,
}

impl ToneParams {
    /// Resolves a request whose frequency has already been validated.
    pub fn resolve(request: &ToneRequest, topology: PinTopology) -> Self {
        let half_period_us = half_period_us(request.frequency);
        Self {
            topology,
            level: resolve_level(request.volume),
            half_period_us,
            total_toggles: toggle_count(request.duration, request.unit, half_period_us),
        }
    }

    /// Period handed to the repeating timer. A zero half-period is run at 1 us
    /// so the schedule still reaches its silencing tick.
    pub fn timer_period_us(&self) -> u32 {
        self.half_period_us.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_quantizes_to_tenths() {
        assert_eq!(resolve_level(50.0), 500);
        assert_eq!(resolve_level(95.11), 951);
        assert_eq!(resolve_level(95.15), 952);
        assert_eq!(resolve_level(0.04), 0);
        assert_eq!(resolve_level(0.05), 1);
        assert_eq!(resolve_level(100.0), 1000);
    }

    #[test]
    fn test_level_clamps() {
        assert_eq!(resolve_level(-3.0), 0);
        assert_eq!(resolve_level(250.0), 1000);
        assert_eq!(resolve_level(f32::INFINITY), 1000);
        assert_eq!(resolve_level(f32::NEG_INFINITY), 0);
        assert_eq!(resolve_level(f32::NAN), 0);
    }

    #[test]
    fn test_level_non_decreasing() {
        let mut previous = 0;
        let mut volume = -10.0f32;
        while volume <= 110.0 {
            let level = resolve_level(volume);
            assert!(level >= previous, "volume {} -> {} after {}", volume, level, previous);
            assert!(level <= TONE_PWM_TOP);
            previous = level;
            volume += 0.037;
        }
        assert_eq!(previous, 1000);
    }

    #[test]
    fn test_toggle_count_formulas() {
        assert_eq!(toggle_count(1000, TimeUnit::Milliseconds, 1136), 880);
        assert_eq!(toggle_count(1, TimeUnit::Milliseconds, 500), 2);
        assert_eq!(toggle_count(1000, TimeUnit::Microseconds, 500), 2);
        assert_eq!(toggle_count(1999, TimeUnit::Microseconds, 500), 3);
    }

    #[test]
    fn test_toggle_count_truncates_to_zero() {
        assert_eq!(toggle_count(499, TimeUnit::Microseconds, 500), 0);
        assert_eq!(toggle_count(0, TimeUnit::Milliseconds, 500), 0);
        assert_eq!(toggle_count(100, TimeUnit::Milliseconds, 0), 0);
    }

    #[test]
    fn test_toggle_count_large_duration() {
        assert_eq!(
            toggle_count(u32::MAX, TimeUnit::Milliseconds, 1),
            u32::MAX
        );
        assert_eq!(
            toggle_count(u32::MAX, TimeUnit::Milliseconds, 1000),
            u32::MAX
        );
        assert_eq!(
            toggle_count(4_000_000, TimeUnit::Milliseconds, 1000),
            4_000_000
        );
    }

    #[test]
    fn test_resolve_440() {
        let params = ToneParams::resolve(
            &ToneRequest::millis(440.0, 50.0, 1000),
            PinTopology::from_pins(2, None),
        );
        assert_eq!(params.half_period_us, 1136);
        assert_eq!(params.total_toggles, 880);
        assert_eq!(params.level, 500);
        assert_eq!(params.timer_period_us(), 1136);
    }

    #[test]
    fn test_resolve_zero_half_period() {
        let params = ToneParams::resolve(
            &ToneRequest::millis(4_000_000.0, 50.0, 1000),
            PinTopology::from_pins(2, None),
        );
        assert_eq!(params.half_period_us, 0);
        assert_eq!(params.total_toggles, 0);
        assert_eq!(params.timer_period_us(), 1);
    }
}
