//! 翻转调度
//!
//! One [`ActiveSchedule`] per running tone. The repeating timer calls
//! [`ActiveSchedule::tick`] every half-period; each tick swaps which lead is
//! driven, and the last tick silences both.

use pwm_tone_common::PwmDriver;

use crate::params::ToneParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActiveSchedule {
    params: ToneParams,
    completed: u32,
    /// Whether the plus lead is currently the driven one.
    high: bool,
    finished: bool,
}

impl ActiveSchedule {
    pub const fn new(params: ToneParams) -> Self {
        Self {
            params,
            completed: 0,
            // First tick drives the plus lead.
            high: false,
            finished: false,
        }
    }

    /// Advances the schedule by one half-period.
    ///
    /// Returns `true` while the timer should keep recurring. Once the toggle
    /// count is reached both leads are set to zero and `false` is returned, on
    /// that tick and on any tick after it.
    pub fn tick<P: PwmDriver>(&mut self, pwm: &mut P) -> bool {
        if self.finished {
            return false;
        }

        self.completed = self.completed.saturating_add(1);

        let plus = self.params.topology.plus();
        let minus = self.params.topology.minus();

        if self.completed >= self.params.total_toggles {
            pwm.set_gpio_level(plus, 0);
            if let Some(minus) = minus {
                pwm.set_gpio_level(minus, 0);
            }
            self.finished = true;
            return false;
        }

        let (plus_level, minus_level) = if self.high {
            (0, self.params.level)
        } else {
            (self.params.level, 0)
        };
        pwm.set_gpio_level(plus, plus_level);
        if let Some(minus) = minus {
            pwm.set_gpio_level(minus, minus_level);
        }

        self.high = !self.high;
        true
    }

    pub fn params(&self) -> &ToneParams {
        &self.params
    }

    pub fn completed(&self) -> u32 {
        self.completed
    }

    pub fn total(&self) -> u32 {
        self.params.total_toggles
    }

    pub fn is_high(&self) -> bool {
        self.high
    }

    pub fn is_running(&self) -> bool {
        !self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pwm_tone_common::mock::MockPwm;
    use pwm_tone_common::{PinTopology, ToneRequest};

    fn schedule(topology: PinTopology, frequency: f32, volume: f32, duration_ms: u32) -> ActiveSchedule {
        ActiveSchedule::new(ToneParams::resolve(
            &ToneRequest::millis(frequency, volume, duration_ms),
            topology,
        ))
    }

    #[test]
    fn test_single_ended_alternates_plus_only() {
        let mut pwm = MockPwm::new();
        let mut s = schedule(PinTopology::from_pins(4, None), 1000.0, 30.0, 3);
        assert_eq!(s.total(), 6);

        for _ in 0..5 {
            assert!(s.tick(&mut pwm));
        }
        assert!(!s.tick(&mut pwm));

        assert_eq!(
            pwm.level_writes(),
            vec![(4, 300), (4, 0), (4, 300), (4, 0), (4, 300), (4, 0)]
        );
        assert!(!s.is_running());
    }

    #[test]
    fn test_differential_one_full_cycle() {
        let mut pwm = MockPwm::new();
        let mut s = schedule(PinTopology::from_pins(0, Some(1)), 1000.0, 100.0, 1);
        assert_eq!(s.total(), 2);

        assert!(s.tick(&mut pwm));
        assert_eq!((pwm.level(0), pwm.level(1)), (1000, 0));
        assert!(s.is_high());

        assert!(!s.tick(&mut pwm));
        assert_eq!((pwm.level(0), pwm.level(1)), (0, 0));
        assert_eq!(
            pwm.level_writes(),
            vec![(0, 1000), (1, 0), (0, 0), (1, 0)]
        );
    }

    #[test]
    fn test_first_tick_drives_plus() {
        let mut pwm = MockPwm::new();
        let mut s = schedule(PinTopology::from_pins(6, Some(7)), 440.0, 50.0, 1000);
        assert!(!s.is_high());
        s.tick(&mut pwm);
        assert_eq!(pwm.level(6), 500);
        assert_eq!(pwm.level(7), 0);
        s.tick(&mut pwm);
        assert_eq!(pwm.level(6), 0);
        assert_eq!(pwm.level(7), 500);
    }

    #[test]
    fn test_settles_after_total_toggles() {
        for (topology, duration_ms) in [
            (PinTopology::from_pins(2, None), 7),
            (PinTopology::from_pins(2, Some(3)), 7),
            (PinTopology::from_pins(2, Some(3)), 8),
        ] {
            let mut pwm = MockPwm::new();
            let mut s = schedule(topology, 1000.0, 75.0, duration_ms);
            let total = s.total();
            let mut ticks = 0;
            while s.tick(&mut pwm) {
                ticks += 1;
                assert!(ticks < total);
            }
            assert_eq!(ticks + 1, total);
            assert_eq!(s.completed(), total);
            assert_eq!(pwm.level(2), 0);
            assert_eq!(pwm.level(3), 0);
        }
    }

    #[test]
    fn test_zero_toggles_silences_on_first_tick() {
        let mut pwm = MockPwm::new();
        let mut s = ActiveSchedule::new(ToneParams::resolve(
            &ToneRequest::micros(1000.0, 80.0, 200),
            PinTopology::from_pins(0, Some(1)),
        ));
        assert_eq!(s.total(), 0);
        assert!(!s.tick(&mut pwm));
        assert_eq!(pwm.level_writes(), vec![(0, 0), (1, 0)]);
    }

    #[test]
    fn test_ticks_after_finish_do_nothing() {
        let mut pwm = MockPwm::new();
        let mut s = schedule(PinTopology::from_pins(0, None), 1000.0, 10.0, 1);
        while s.tick(&mut pwm) {}
        pwm.take_ops();

        assert!(!s.tick(&mut pwm));
        assert!(pwm.ops().is_empty());
        assert_eq!(s.completed(), s.total());
    }
}
