use crate::types::{Gpio, PwmSliceConfig, SliceNum};

/// PWM 外设控制接口
///
/// Mirrors the register-level operations of an RP2040-style PWM block: pins are
/// grouped into slices, each slice has one counter shared by its two channels.
/// Register writes cannot fail, so none of these return a `Result`.
pub trait PwmDriver {
    /// Hardware group (slice) that drives `pin`.
    fn gpio_to_slice(&self, pin: Gpio) -> SliceNum;

    /// Applies `config` to `slice` and leaves its output disabled.
    fn init_slice(&mut self, slice: SliceNum, config: &PwmSliceConfig);

    fn set_enabled(&mut self, slice: SliceNum, enabled: bool);

    /// Sets the compare level of the channel connected to `pin`.
    fn set_gpio_level(&mut self, pin: Gpio, level: u16);

    fn set_counter(&mut self, slice: SliceNum, value: u16);
}
