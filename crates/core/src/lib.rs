#![forbid(unsafe_code)]

pub mod aggregate;
pub mod error;
pub mod model;
pub mod time;

pub use aggregate::{Percentage, Progress, overall_progress, section_progress};
pub use error::ErrorKind;
pub use time::Clock;
