use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle, Thread};
use std::time::{Duration, Instant};

use pwm_tone_common::{AlarmDriver, RepeatingCallback, debug};
use thiserror::Error;

/// Hardware alarms on an RP2040 timer.
pub const HARDWARE_ALARMS: u8 = 4;

#[derive(Error, Debug)]
pub enum AlarmError {
    #[error("hardware alarm {0} does not exist")]
    NoSuchAlarm(u8),

    #[error("hardware alarm {0} is already claimed")]
    AlarmInUse(u8),

    #[error("alarm pool is full")]
    PoolFull,

    #[error("failed to spawn timer thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Alarm pools backed by one host thread per repeating timer.
#[derive(Debug, Clone, Default)]
pub struct SimulatorAlarm {
    claimed: Arc<Mutex<[bool; HARDWARE_ALARMS as usize]>>,
}

pub struct SimulatorPool {
    hardware_alarm: u8,
    max_timers: u16,
    running: Arc<AtomicUsize>,
    attached: Vec<(Arc<AtomicBool>, Thread)>,
}

pub struct SimulatorTimer {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl SimulatorAlarm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_claimed(&self, hardware_alarm: u8) -> bool {
        let claimed = self.claimed.lock().unwrap_or_else(|e| e.into_inner());
        claimed.get(hardware_alarm as usize).copied().unwrap_or(false)
    }
}

impl AlarmDriver for SimulatorAlarm {
    type Pool = SimulatorPool;
    type Timer = SimulatorTimer;
    type Error = AlarmError;

    fn create_pool(
        &mut self,
        hardware_alarm: u8,
        max_timers: u16,
    ) -> Result<SimulatorPool, AlarmError> {
        let mut claimed = self.claimed.lock().unwrap_or_else(|e| e.into_inner());
        let slot = claimed
            .get_mut(hardware_alarm as usize)
            .ok_or(AlarmError::NoSuchAlarm(hardware_alarm))?;
        if *slot {
            return Err(AlarmError::AlarmInUse(hardware_alarm));
        }
        *slot = true;

        Ok(SimulatorPool {
            hardware_alarm,
            max_timers,
            running: Arc::new(AtomicUsize::new(0)),
            attached: Vec::new(),
        })
    }

    fn destroy_pool(&mut self, pool: SimulatorPool) {
        // Timers still attached stop recurring.
        for (stop, thread) in &pool.attached {
            stop.store(true, Ordering::Release);
            thread.unpark();
        }
        let mut claimed = self.claimed.lock().unwrap_or_else(|e| e.into_inner());
        claimed[pool.hardware_alarm as usize] = false;
    }

    fn add_repeating_timer_us(
        &mut self,
        pool: &mut SimulatorPool,
        period_us: u32,
        mut callback: RepeatingCallback,
    ) -> Result<SimulatorTimer, AlarmError> {
        if pool.running.load(Ordering::Acquire) >= pool.max_timers as usize {
            return Err(AlarmError::PoolFull);
        }
        pool.attached.retain(|(stop, _)| !stop.load(Ordering::Acquire));

        let stop = Arc::new(AtomicBool::new(false));
        let running = pool.running.clone();
        let thread_stop = stop.clone();
        let period = Duration::from_micros(period_us as u64);

        running.fetch_add(1, Ordering::AcqRel);
        let spawned = thread::Builder::new()
            .name(format!("alarm{}", pool.hardware_alarm))
            .spawn(move || {
                let mut deadline = Instant::now() + period;
                while wait_until(deadline, &thread_stop) && callback() {
                    // Fixed schedule: a late tick does not push the next one back.
                    deadline += period;
                }
                running.fetch_sub(1, Ordering::AcqRel);
            });

        let thread = match spawned {
            Ok(thread) => thread,
            Err(e) => {
                pool.running.fetch_sub(1, Ordering::AcqRel);
                return Err(e.into());
            }
        };

        debug!(
            "[Simulator Alarm] alarm {} repeating every {} us",
            pool.hardware_alarm, period_us
        );
        pool.attached.push((stop.clone(), thread.thread().clone()));
        Ok(SimulatorTimer { stop, thread })
    }

    fn cancel_repeating_timer(&mut self, timer: SimulatorTimer) -> bool {
        let was_running = !timer.thread.is_finished();
        timer.stop.store(true, Ordering::Release);
        timer.thread.thread().unpark();
        // Joining drops the callback together with the thread.
        let _ = timer.thread.join();
        was_running
    }
}

/// Parks until `deadline`. Returns `false` as soon as `stop` is raised.
fn wait_until(deadline: Instant, stop: &AtomicBool) -> bool {
    loop {
        if stop.load(Ordering::Acquire) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::park_timeout(deadline - now);
    }
}
