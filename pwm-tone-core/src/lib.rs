#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod frequency;
pub mod generator;
pub mod params;
pub mod scheduler;

pub use frequency::{apparent_frequency, half_period_us, is_valid_frequency};
pub use generator::{ToneGenerator, ToneState};
pub use params::{ToneParams, resolve_level, toggle_count};
pub use scheduler::ActiveSchedule;
