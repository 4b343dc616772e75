pub mod alarm;
pub mod gpio;
pub mod pwm;

pub use alarm::*;
pub use gpio::*;
pub use pwm::*;
