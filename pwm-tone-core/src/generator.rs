//! 音调生命周期管理
//!
//! [`ToneGenerator`] owns one output (single-ended or differential), at most
//! one running schedule, and the alarm pool and repeating timer driving it.
//! Starting a tone abandons the previous one; stopping, superseding and
//! dropping all release resources through [`ToneGenerator::release`], which
//! cancels the timer before anything the callback can reach is freed.

use alloc::boxed::Box;
use alloc::sync::{Arc, Weak};

use pwm_tone_common::{
    AlarmDriver, ConfigError, GpioFunctionSelect, PinTopology, PwmDriver, PwmSliceConfig,
    RepeatingCallback, SharedCell, SliceNum, TONE_PWM_TOP, TimeUnit, ToneConfig, ToneError,
    ToneRequest, ToneResult, debug, info, warn,
};

use crate::frequency::{MIN_PRACTICAL_FREQUENCY_HZ, is_valid_frequency};
use crate::params::ToneParams;
use crate::scheduler::ActiveSchedule;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ToneState {
    Idle,
    Running,
}

/// Resources held while a tone exists. Only [`ToneGenerator::release`]
/// takes it apart.
struct ActiveTone<A: AlarmDriver> {
    schedule: Arc<SharedCell<ActiveSchedule>>,
    pool: A::Pool,
    timer: A::Timer,
}

pub struct ToneGenerator<P, A>
where
    P: PwmDriver + Send + 'static,
    A: AlarmDriver,
{
    pwm: Arc<SharedCell<P>>,
    alarms: A,
    topology: PinTopology,
    slice: SliceNum,
    config: ToneConfig,
    active: Option<ActiveTone<A>>,
}

impl<P, A> ToneGenerator<P, A>
where
    P: PwmDriver + Send + 'static,
    A: AlarmDriver,
{
    /// Claims the pins of `topology` for PWM output.
    ///
    /// Differential pins on different slices are rejected before any pin is
    /// touched.
    pub fn new<G: GpioFunctionSelect>(
        pwm: P,
        gpio: &mut G,
        alarms: A,
        topology: PinTopology,
        config: ToneConfig,
    ) -> Result<Self, ConfigError> {
        let slice = topology.resolve_slice(&pwm)?;

        gpio.select_pwm(topology.plus());
        if let Some(minus) = topology.minus() {
            gpio.select_pwm(minus);
        }

        info!(
            "Tone output on slice {}: plus={} minus={:?} alarm={}",
            slice,
            topology.plus(),
            topology.minus(),
            config.hardware_alarm
        );

        Ok(Self {
            pwm: Arc::new(SharedCell::new(pwm)),
            alarms,
            topology,
            slice,
            config,
            active: None,
        })
    }

    /// Starts a tone without blocking. A tone already running is cut off.
    pub fn tone(
        &mut self,
        frequency: f32,
        volume: f32,
        duration: u32,
        unit: TimeUnit,
    ) -> ToneResult<(), A::Error> {
        self.play(&ToneRequest::new(frequency, volume, duration, unit))
    }

    pub fn play(&mut self, request: &ToneRequest) -> ToneResult<(), A::Error> {
        if !is_valid_frequency(request.frequency) {
            return Err(ToneError::InvalidFrequency);
        }
        if request.frequency < MIN_PRACTICAL_FREQUENCY_HZ {
            warn!(
                "{} Hz is below the rated minimum of {} Hz",
                request.frequency, MIN_PRACTICAL_FREQUENCY_HZ
            );
        }

        if self.active.is_some() {
            debug!("Superseding tone on slice {}", self.slice);
        }
        self.release();

        let params = ToneParams::resolve(request, self.topology);
        debug!(
            "Tone {} Hz vol {}: half period {} us, level {}, {} toggles",
            request.frequency,
            request.volume,
            params.half_period_us,
            params.level,
            params.total_toggles
        );

        let slice = self.slice;
        let topology = self.topology;
        self.pwm.with_mut(|pwm| {
            pwm.set_enabled(slice, false);
            pwm.init_slice(slice, &PwmSliceConfig::tone());
            pwm.set_gpio_level(topology.plus(), 0);
            if let Some(minus) = topology.minus() {
                pwm.set_gpio_level(minus, params.level);
            }
        });

        let schedule = Arc::new(SharedCell::new(ActiveSchedule::new(params)));

        let mut pool = self
            .alarms
            .create_pool(self.config.hardware_alarm, self.config.max_timers)
            .map_err(ToneError::Alarm)?;

        let callback = toggle_callback(Arc::downgrade(&schedule), self.pwm.clone());
        let timer = match self
            .alarms
            .add_repeating_timer_us(&mut pool, params.timer_period_us(), callback)
        {
            Ok(timer) => timer,
            Err(e) => {
                self.alarms.destroy_pool(pool);
                return Err(ToneError::Alarm(e));
            }
        };

        self.pwm.with_mut(|pwm| {
            if topology.is_differential() {
                pwm.set_counter(slice, TONE_PWM_TOP);
            }
            pwm.set_enabled(slice, true);
        });

        self.active = Some(ActiveTone {
            schedule,
            pool,
            timer,
        });
        Ok(())
    }

    /// Cancels the running tone, if any, and pulls both leads to zero.
    pub fn stop_tone(&mut self) {
        if self.active.is_some() {
            debug!("Stopping tone on slice {}", self.slice);
        }
        self.release();

        let topology = self.topology;
        self.pwm.with_mut(|pwm| {
            pwm.set_gpio_level(topology.plus(), 0);
            if let Some(minus) = topology.minus() {
                pwm.set_gpio_level(minus, 0);
            }
        });
    }

    /// Tears down the active tone: timer first, then schedule, then pool.
    fn release(&mut self) {
        if let Some(ActiveTone {
            schedule,
            pool,
            timer,
        }) = self.active.take()
        {
            // After this no callback holds or can upgrade to the schedule.
            self.alarms.cancel_repeating_timer(timer);
            drop(schedule);
            self.alarms.destroy_pool(pool);
        }
    }

    pub fn state(&self) -> ToneState {
        match &self.active {
            Some(active) if active.schedule.with(|s| s.is_running()) => ToneState::Running,
            _ => ToneState::Idle,
        }
    }

    /// `(completed, total)` toggles of the current or last finished tone.
    pub fn progress(&self) -> Option<(u32, u32)> {
        self.active
            .as_ref()
            .map(|active| active.schedule.with(|s| (s.completed(), s.total())))
    }

    pub fn topology(&self) -> PinTopology {
        self.topology
    }

    pub fn slice(&self) -> SliceNum {
        self.slice
    }

    pub fn config(&self) -> &ToneConfig {
        &self.config
    }
}

impl<P, A> Drop for ToneGenerator<P, A>
where
    P: PwmDriver + Send + 'static,
    A: AlarmDriver,
{
    fn drop(&mut self) {
        self.stop_tone();
    }
}

/// Timer body. Holds the schedule weakly so that only the generator owns it.
fn toggle_callback<P>(
    schedule: Weak<SharedCell<ActiveSchedule>>,
    pwm: Arc<SharedCell<P>>,
) -> RepeatingCallback
where
    P: PwmDriver + Send + 'static,
{
    Box::new(move || match schedule.upgrade() {
        Some(schedule) => schedule.with_mut(|s| pwm.with_mut(|pwm| s.tick(pwm))),
        None => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pwm_tone_common::mock::{MockAlarm, MockGpio, MockPwm, PwmOp};

    fn generator(
        minus: Option<u8>,
    ) -> (ToneGenerator<MockPwm, MockAlarm>, MockPwm, MockAlarm) {
        let pwm = MockPwm::new();
        let alarm = MockAlarm::new();
        let mut gpio = MockGpio::new();
        let generator = ToneGenerator::new(
            pwm.clone(),
            &mut gpio,
            alarm.clone(),
            PinTopology::from_pins(2, minus),
            ToneConfig::default(),
        )
        .unwrap();
        (generator, pwm, alarm)
    }

    #[test]
    fn test_tone_configures_slice_in_order() {
        let (mut tone, pwm, alarm) = generator(Some(3));
        tone.tone(1000.0, 40.0, 1, TimeUnit::Milliseconds).unwrap();

        assert_eq!(
            pwm.ops(),
            vec![
                PwmOp::Enable(1, false),
                PwmOp::Init(1, PwmSliceConfig::tone()),
                PwmOp::Level(2, 0),
                PwmOp::Level(3, 400),
                PwmOp::Counter(1, 1000),
                PwmOp::Enable(1, true),
            ]
        );
        assert_eq!(alarm.period_us(), Some(500));
        assert_eq!(tone.state(), ToneState::Running);
        assert_eq!(tone.progress(), Some((0, 2)));
    }

    #[test]
    fn test_single_ended_skips_counter_preset() {
        let (mut tone, pwm, _alarm) = generator(None);
        tone.tone(1000.0, 40.0, 1, TimeUnit::Milliseconds).unwrap();
        assert!(!pwm.ops().iter().any(|op| matches!(op, PwmOp::Counter(..))));
        assert_eq!(pwm.level_writes(), vec![(2, 0)]);
    }

    #[test]
    fn test_callback_runs_schedule() {
        let (mut tone, pwm, alarm) = generator(Some(3));
        tone.tone(1000.0, 100.0, 1, TimeUnit::Milliseconds).unwrap();

        assert_eq!(alarm.fire(), Some(true));
        assert_eq!((pwm.level(2), pwm.level(3)), (1000, 0));
        assert_eq!(alarm.fire(), Some(false));
        assert_eq!((pwm.level(2), pwm.level(3)), (0, 0));

        assert_eq!(tone.state(), ToneState::Idle);
        assert_eq!(tone.progress(), Some((2, 2)));
        // Natural completion keeps the pool until the next tone or stop.
        assert_eq!(alarm.live_pools(), 1);
        assert_eq!(alarm.live_timers(), 0);
    }

    #[test]
    fn test_invalid_frequency_leaves_tone_running() {
        let (mut tone, pwm, alarm) = generator(None);
        tone.tone(440.0, 50.0, 100, TimeUnit::Milliseconds).unwrap();
        pwm.take_ops();

        for frequency in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            assert_eq!(
                tone.tone(frequency, 50.0, 100, TimeUnit::Milliseconds),
                Err(ToneError::InvalidFrequency)
            );
        }
        assert!(pwm.ops().is_empty());
        assert_eq!(tone.state(), ToneState::Running);
        assert_eq!(alarm.live_timers(), 1);
    }

    #[test]
    fn test_zero_half_period_runs_at_one_us() {
        let (mut tone, pwm, alarm) = generator(None);
        tone.tone(3_000_000.0, 50.0, 10, TimeUnit::Milliseconds)
            .unwrap();
        assert_eq!(alarm.period_us(), Some(1));
        assert_eq!(alarm.fire(), Some(false));
        assert_eq!(pwm.level(2), 0);
        assert_eq!(tone.state(), ToneState::Idle);
    }

    #[test]
    fn test_callback_outliving_schedule_stops() {
        let pwm = Arc::new(SharedCell::new(MockPwm::new()));
        let schedule = Arc::new(SharedCell::new(ActiveSchedule::new(ToneParams::resolve(
            &ToneRequest::millis(440.0, 50.0, 100),
            PinTopology::from_pins(0, None),
        ))));
        let mut callback = toggle_callback(Arc::downgrade(&schedule), pwm.clone());
        assert!(callback());
        drop(schedule);
        assert!(!callback());
        assert_eq!(pwm.with(|p| p.level_writes()), vec![(0, 500)]);
    }
}
