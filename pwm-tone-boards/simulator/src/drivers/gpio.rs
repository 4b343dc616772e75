use std::sync::{Arc, Mutex};

use pwm_tone_common::{Gpio, GpioFunctionSelect, debug, warn};

pub const GPIO_COUNT: usize = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GpioFunction {
    #[default]
    Null,
    Pwm,
}

#[derive(Debug, Clone, Default)]
pub struct SimulatorGpio {
    functions: Arc<Mutex<[GpioFunction; GPIO_COUNT]>>,
}

impl SimulatorGpio {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` for a pin the chip does not have.
    pub fn function(&self, pin: Gpio) -> Option<GpioFunction> {
        let functions = self.functions.lock().unwrap_or_else(|e| e.into_inner());
        functions.get(pin as usize).copied()
    }
}

impl GpioFunctionSelect for SimulatorGpio {
    fn select_pwm(&mut self, pin: Gpio) {
        let mut functions = self.functions.lock().unwrap_or_else(|e| e.into_inner());
        match functions.get_mut(pin as usize) {
            Some(function) => {
                *function = GpioFunction::Pwm;
                debug!("[Simulator GPIO] GPIO{} -> PWM", pin);
            }
            None => warn!("[Simulator GPIO] GPIO{} does not exist, ignored", pin),
        }
    }
}
