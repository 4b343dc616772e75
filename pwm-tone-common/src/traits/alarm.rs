use alloc::boxed::Box;

/// Callback invoked once per period from the timer context.
///
/// Returning `false` stops the timer from recurring.
pub type RepeatingCallback = Box<dyn FnMut() -> bool + Send + 'static>;

/// 硬件定时器资源池接口
///
/// A pool is bound to one hardware alarm and hosts up to `max_timers` repeating
/// timers. Handles are consumed by `destroy_pool` and `cancel_repeating_timer`,
/// so each acquisition is released at most once.
pub trait AlarmDriver {
    type Pool;
    type Timer;
    type Error: core::fmt::Debug;

    fn create_pool(&mut self, hardware_alarm: u8, max_timers: u16)
    -> Result<Self::Pool, Self::Error>;

    /// Releases the pool and its hardware alarm. Timers still registered on it
    /// stop recurring.
    fn destroy_pool(&mut self, pool: Self::Pool);

    /// Registers `callback` to run every `period_us` microseconds, first run one
    /// period from now. Invocations for one timer never overlap.
    fn add_repeating_timer_us(
        &mut self,
        pool: &mut Self::Pool,
        period_us: u32,
        callback: RepeatingCallback,
    ) -> Result<Self::Timer, Self::Error>;

    /// Stops the timer synchronously: when this returns the callback is not
    /// running, will never run again, and has been dropped.
    ///
    /// Returns `false` if the timer had already stopped itself.
    fn cancel_repeating_timer(&mut self, timer: Self::Timer) -> bool;
}
