//! Host-side drivers for tests
//!
//! Every mock is a cheap `Clone` handle over shared state, so a test keeps one
//! copy for inspection while the code under test owns the other.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::vec::Vec;

use crate::traits::{AlarmDriver, GpioFunctionSelect, PwmDriver, RepeatingCallback};
use crate::types::{Gpio, PwmSliceConfig, SliceNum};

/// One call made on [`MockPwm`], in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwmOp {
    Init(SliceNum, PwmSliceConfig),
    Enable(SliceNum, bool),
    Level(Gpio, u16),
    Counter(SliceNum, u16),
}

#[derive(Debug, Default)]
struct PwmState {
    ops: Vec<PwmOp>,
    levels: HashMap<Gpio, u16>,
    enabled: HashMap<SliceNum, bool>,
}

/// Recording PWM block with the RP2040 pin-to-slice mapping.
#[derive(Debug, Clone, Default)]
pub struct MockPwm {
    state: Arc<Mutex<PwmState>>,
}

impl MockPwm {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, PwmState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Last level written to `pin`, 0 if never written.
    pub fn level(&self, pin: Gpio) -> u16 {
        self.state().levels.get(&pin).copied().unwrap_or(0)
    }

    pub fn is_enabled(&self, slice: SliceNum) -> bool {
        self.state().enabled.get(&slice).copied().unwrap_or(false)
    }

    pub fn ops(&self) -> Vec<PwmOp> {
        self.state().ops.clone()
    }

    /// Returns the recorded calls and starts a fresh record.
    pub fn take_ops(&self) -> Vec<PwmOp> {
        core::mem::take(&mut self.state().ops)
    }

    /// Level writes only, in order.
    pub fn level_writes(&self) -> Vec<(Gpio, u16)> {
        self.state()
            .ops
            .iter()
            .filter_map(|op| match *op {
                PwmOp::Level(pin, level) => Some((pin, level)),
                _ => None,
            })
            .collect()
    }
}

impl PwmDriver for MockPwm {
    fn gpio_to_slice(&self, pin: Gpio) -> SliceNum {
        (pin >> 1) & 7
    }

    fn init_slice(&mut self, slice: SliceNum, config: &PwmSliceConfig) {
        let mut state = self.state();
        state.ops.push(PwmOp::Init(slice, *config));
        state.enabled.insert(slice, false);
    }

    fn set_enabled(&mut self, slice: SliceNum, enabled: bool) {
        let mut state = self.state();
        state.ops.push(PwmOp::Enable(slice, enabled));
        state.enabled.insert(slice, enabled);
    }

    fn set_gpio_level(&mut self, pin: Gpio, level: u16) {
        let mut state = self.state();
        state.ops.push(PwmOp::Level(pin, level));
        state.levels.insert(pin, level);
    }

    fn set_counter(&mut self, slice: SliceNum, value: u16) {
        self.state().ops.push(PwmOp::Counter(slice, value));
    }
}

/// Records which pins were routed to PWM.
#[derive(Debug, Clone, Default)]
pub struct MockGpio {
    selected: Arc<Mutex<Vec<Gpio>>>,
}

impl MockGpio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Vec<Gpio> {
        self.selected.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl GpioFunctionSelect for MockGpio {
    fn select_pwm(&mut self, pin: Gpio) {
        self.selected
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(pin);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockAlarmError {
    AlarmInUse(u8),
    PoolFull,
    /// Injected with [`MockAlarm::fail_next_timer`].
    Injected,
}

#[derive(Debug, PartialEq, Eq)]
pub struct MockPool {
    id: u32,
    hardware_alarm: u8,
    max_timers: u16,
}

#[derive(Debug, PartialEq, Eq)]
pub struct MockTimer {
    id: u32,
}

struct TimerEntry {
    pool: u32,
    period_us: u32,
    /// `None` while the callback is running or after it stopped itself.
    callback: Option<RepeatingCallback>,
    stopped: bool,
}

#[derive(Default)]
struct AlarmState {
    next_id: u32,
    claimed_alarms: BTreeSet<u8>,
    pools: BTreeMap<u32, u8>,
    timers: BTreeMap<u32, TimerEntry>,
    pools_created: usize,
    pools_destroyed: usize,
    timers_added: usize,
    timers_cancelled: usize,
    fail_next_timer: bool,
}

impl AlarmState {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

/// Alarm pool whose timers only run when a test fires them.
#[derive(Clone, Default)]
pub struct MockAlarm {
    state: Arc<Mutex<AlarmState>>,
}

impl MockAlarm {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, AlarmState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn live_pools(&self) -> usize {
        self.state().pools.len()
    }

    /// Registered timers that have neither been cancelled nor stopped themselves.
    pub fn live_timers(&self) -> usize {
        self.state().timers.values().filter(|t| !t.stopped).count()
    }

    /// Registered timers still holding a resource slot, stopped or not.
    pub fn registered_timers(&self) -> usize {
        self.state().timers.len()
    }

    pub fn pools_created(&self) -> usize {
        self.state().pools_created
    }

    pub fn pools_destroyed(&self) -> usize {
        self.state().pools_destroyed
    }

    pub fn timers_added(&self) -> usize {
        self.state().timers_added
    }

    pub fn timers_cancelled(&self) -> usize {
        self.state().timers_cancelled
    }

    pub fn is_alarm_claimed(&self, hardware_alarm: u8) -> bool {
        self.state().claimed_alarms.contains(&hardware_alarm)
    }

    /// Period of the newest running timer.
    pub fn period_us(&self) -> Option<u32> {
        self.state()
            .timers
            .values()
            .rev()
            .find(|t| !t.stopped)
            .map(|t| t.period_us)
    }

    /// Makes the next `add_repeating_timer_us` fail.
    pub fn fail_next_timer(&self) {
        self.state().fail_next_timer = true;
    }

    /// Runs one tick of the newest running timer.
    ///
    /// Returns the callback's continuation flag, or `None` if nothing is running.
    pub fn fire(&self) -> Option<bool> {
        let (id, mut callback) = {
            let mut state = self.state();
            let (id, entry) = state.timers.iter_mut().rev().find(|(_, t)| !t.stopped)?;
            (*id, entry.callback.take()?)
        };

        // Lock released: the callback may take its own locks.
        let keep_going = callback();

        let mut state = self.state();
        if let Some(entry) = state.timers.get_mut(&id) {
            if keep_going {
                entry.callback = Some(callback);
            } else {
                entry.stopped = true;
            }
        }
        Some(keep_going)
    }

    /// Fires until the running timer stops itself or `limit` ticks have run.
    /// Returns the number of ticks fired.
    pub fn run_to_completion(&self, limit: usize) -> usize {
        let mut fired = 0;
        while fired < limit {
            match self.fire() {
                Some(keep_going) => {
                    fired += 1;
                    if !keep_going {
                        break;
                    }
                }
                None => break,
            }
        }
        fired
    }
}

impl AlarmDriver for MockAlarm {
    type Pool = MockPool;
    type Timer = MockTimer;
    type Error = MockAlarmError;

    fn create_pool(&mut self, hardware_alarm: u8, max_timers: u16) -> Result<MockPool, MockAlarmError> {
        let mut state = self.state();
        if !state.claimed_alarms.insert(hardware_alarm) {
            return Err(MockAlarmError::AlarmInUse(hardware_alarm));
        }
        let id = state.next_id();
        state.pools.insert(id, hardware_alarm);
        state.pools_created += 1;
        Ok(MockPool {
            id,
            hardware_alarm,
            max_timers,
        })
    }

    fn destroy_pool(&mut self, pool: MockPool) {
        let mut state = self.state();
        let before = state.timers.len();
        state.timers.retain(|_, t| t.pool != pool.id);
        let dropped = before - state.timers.len();
        state.timers_cancelled += dropped;
        state.pools.remove(&pool.id);
        state.claimed_alarms.remove(&pool.hardware_alarm);
        state.pools_destroyed += 1;
    }

    fn add_repeating_timer_us(
        &mut self,
        pool: &mut MockPool,
        period_us: u32,
        callback: RepeatingCallback,
    ) -> Result<MockTimer, MockAlarmError> {
        let mut state = self.state();
        if core::mem::take(&mut state.fail_next_timer) {
            return Err(MockAlarmError::Injected);
        }
        let in_pool = state.timers.values().filter(|t| t.pool == pool.id).count();
        if in_pool >= pool.max_timers as usize {
            return Err(MockAlarmError::PoolFull);
        }
        let id = state.next_id();
        state.timers.insert(
            id,
            TimerEntry {
                pool: pool.id,
                period_us,
                callback: Some(callback),
                stopped: false,
            },
        );
        state.timers_added += 1;
        Ok(MockTimer { id })
    }

    fn cancel_repeating_timer(&mut self, timer: MockTimer) -> bool {
        let mut state = self.state();
        match state.timers.remove(&timer.id) {
            Some(entry) => {
                state.timers_cancelled += 1;
                !entry.stopped
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::boxed::Box;
    use core::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_mock_pwm_records_levels() {
        let mut pwm = MockPwm::new();
        let probe = pwm.clone();

        pwm.init_slice(1, &PwmSliceConfig::tone());
        pwm.set_gpio_level(2, 500);
        pwm.set_gpio_level(3, 0);
        pwm.set_enabled(1, true);

        assert_eq!(probe.level(2), 500);
        assert_eq!(probe.level(3), 0);
        assert_eq!(probe.level(4), 0);
        assert!(probe.is_enabled(1));
        assert_eq!(probe.level_writes(), vec![(2, 500), (3, 0)]);
        assert_eq!(probe.take_ops().len(), 4);
        assert!(probe.ops().is_empty());
    }

    #[test]
    fn test_mock_alarm_claims_hardware_alarm() {
        let mut alarm = MockAlarm::new();
        let pool = alarm.create_pool(3, 4).unwrap();
        assert_eq!(alarm.create_pool(3, 4), Err(MockAlarmError::AlarmInUse(3)));
        assert!(alarm.is_alarm_claimed(3));

        alarm.destroy_pool(pool);
        assert!(!alarm.is_alarm_claimed(3));
        assert!(alarm.create_pool(3, 4).is_ok());
    }

    #[test]
    fn test_mock_alarm_fire_until_stopped() {
        let mut alarm = MockAlarm::new();
        let mut pool = alarm.create_pool(0, 4).unwrap();
        let count = Arc::new(AtomicU32::new(0));
        let seen = count.clone();
        let timer = alarm
            .add_repeating_timer_us(
                &mut pool,
                500,
                Box::new(move || seen.fetch_add(1, Ordering::SeqCst) + 1 < 3),
            )
            .unwrap();

        assert_eq!(alarm.period_us(), Some(500));
        assert_eq!(alarm.run_to_completion(10), 3);
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(alarm.live_timers(), 0);
        assert_eq!(alarm.fire(), None);

        // Already stopped by its own callback.
        assert!(!alarm.cancel_repeating_timer(timer));
        alarm.destroy_pool(pool);
        assert_eq!(alarm.live_pools(), 0);
    }

    #[test]
    fn test_mock_alarm_pool_capacity() {
        let mut alarm = MockAlarm::new();
        let mut pool = alarm.create_pool(0, 1).unwrap();
        alarm
            .add_repeating_timer_us(&mut pool, 10, Box::new(|| true))
            .unwrap();
        assert_eq!(
            alarm
                .add_repeating_timer_us(&mut pool, 10, Box::new(|| true))
                .err(),
            Some(MockAlarmError::PoolFull)
        );
    }
}
