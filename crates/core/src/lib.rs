#![forbid(unsafe_code)]

pub mod error;
pub mod hierarchy;
pub mod model;
pub mod planner;
pub mod subjects;
pub mod time;

pub use error::Error;
pub use time::Clock;
