use std::sync::{Arc, Mutex, MutexGuard};

use pwm_tone_common::{Gpio, PwmDriver, PwmSliceConfig, SliceNum, info, trace};

pub const SLICE_COUNT: usize = 8;

/// Stock RP2040 system clock.
pub const SYS_CLOCK_HZ: u32 = 125_000_000;

#[derive(Debug, Clone, Copy, Default)]
struct SliceState {
    config: Option<PwmSliceConfig>,
    enabled: bool,
    counter: u16,
    levels: [u16; 2],
}

/// Per-pin activity since the last [`SimulatorPwm::take_report`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PinReport {
    pub writes: u32,
    pub changes: u32,
    pub driven: u32,
}

#[derive(Debug, Default)]
struct PwmBlock {
    slices: [SliceState; SLICE_COUNT],
    reports: [PinReport; SLICE_COUNT * 2],
}

/// RP2040-style PWM block: GPIO `n` is channel `n & 1` of slice `(n >> 1) & 7`.
#[derive(Debug, Clone, Default)]
pub struct SimulatorPwm {
    block: Arc<Mutex<PwmBlock>>,
}

impl SimulatorPwm {
    pub fn new() -> Self {
        Self::default()
    }

    fn block(&self) -> MutexGuard<'_, PwmBlock> {
        self.block.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn level(&self, pin: Gpio) -> u16 {
        let slice = self.gpio_to_slice(pin) as usize;
        self.block().slices[slice].levels[channel(pin)]
    }

    pub fn is_enabled(&self, slice: SliceNum) -> bool {
        self.block().slices[slice as usize].enabled
    }

    pub fn take_report(&self, pin: Gpio) -> PinReport {
        core::mem::take(&mut self.block().reports[report_index(pin)])
    }
}

fn channel(pin: Gpio) -> usize {
    (pin & 1) as usize
}

fn report_index(pin: Gpio) -> usize {
    pin as usize % (SLICE_COUNT * 2)
}

/// Carrier frequency produced by `config`.
pub fn carrier_hz(config: &PwmSliceConfig) -> u32 {
    let steps = (config.wrap as u32 + 1) * config.clk_div_int.max(1) as u32;
    let steps = if config.phase_correct { steps * 2 } else { steps };
    SYS_CLOCK_HZ / steps
}

impl PwmDriver for SimulatorPwm {
    fn gpio_to_slice(&self, pin: Gpio) -> SliceNum {
        (pin >> 1) & (SLICE_COUNT as u8 - 1)
    }

    fn init_slice(&mut self, slice: SliceNum, config: &PwmSliceConfig) {
        let mut block = self.block();
        let state = &mut block.slices[slice as usize];
        if state.config.as_ref() != Some(config) {
            info!(
                "[Simulator PWM] slice {} carrier {} Hz (wrap {}, div {}, phase correct {})",
                slice,
                carrier_hz(config),
                config.wrap,
                config.clk_div_int,
                config.phase_correct
            );
        }
        // Same as the SDK: compare levels and counter reset, output stays off.
        *state = SliceState {
            config: Some(*config),
            ..SliceState::default()
        };
    }

    fn set_enabled(&mut self, slice: SliceNum, enabled: bool) {
        self.block().slices[slice as usize].enabled = enabled;
        trace!("[Simulator PWM] slice {} enabled={}", slice, enabled);
    }

    fn set_gpio_level(&mut self, pin: Gpio, level: u16) {
        let slice = self.gpio_to_slice(pin) as usize;
        let mut block = self.block();
        let previous = core::mem::replace(&mut block.slices[slice].levels[channel(pin)], level);
        let report = &mut block.reports[report_index(pin)];
        report.writes += 1;
        if previous != level {
            report.changes += 1;
            trace!("[Simulator PWM] GPIO{} level {} -> {}", pin, previous, level);
        }
        if level > 0 {
            report.driven += 1;
        }
    }

    fn set_counter(&mut self, slice: SliceNum, value: u16) {
        self.block().slices[slice as usize].counter = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tone_carrier_is_ultrasonic() {
        assert_eq!(carrier_hz(&PwmSliceConfig::tone()), 62_437);
    }

    #[test]
    fn test_levels_and_report() {
        let mut pwm = SimulatorPwm::new();
        pwm.init_slice(1, &PwmSliceConfig::tone());
        pwm.set_gpio_level(2, 0);
        pwm.set_gpio_level(3, 600);
        pwm.set_gpio_level(2, 600);
        pwm.set_gpio_level(3, 0);
        pwm.set_enabled(1, true);

        assert_eq!(pwm.level(2), 600);
        assert_eq!(pwm.level(3), 0);
        assert!(pwm.is_enabled(1));
        assert_eq!(
            pwm.take_report(3),
            PinReport {
                writes: 2,
                changes: 2,
                driven: 1
            }
        );
        assert_eq!(pwm.take_report(3), PinReport::default());
    }

    #[test]
    fn test_init_resets_levels() {
        let mut pwm = SimulatorPwm::new();
        pwm.set_gpio_level(4, 800);
        pwm.set_enabled(2, true);
        pwm.init_slice(2, &PwmSliceConfig::tone());
        assert_eq!(pwm.level(4), 0);
        assert!(!pwm.is_enabled(2));
    }
}
