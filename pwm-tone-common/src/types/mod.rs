pub mod config;
pub mod error;
pub mod tone;
pub mod topology;

pub use config::*;
pub use error::*;
pub use tone::*;
pub use topology::*;
