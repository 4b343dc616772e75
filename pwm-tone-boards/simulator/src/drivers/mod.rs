mod alarm;
mod gpio;
mod pwm;

pub use alarm::{AlarmError, HARDWARE_ALARMS, SimulatorAlarm};
pub use gpio::{GpioFunction, SimulatorGpio};
pub use pwm::{PinReport, SimulatorPwm, carrier_hz};
