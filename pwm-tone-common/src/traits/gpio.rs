use crate::types::Gpio;

/// GPIO 功能复用
pub trait GpioFunctionSelect {
    /// Routes `pin` to its PWM channel.
    fn select_pwm(&mut self, pin: Gpio);
}
