#![forbid(unsafe_code)]

pub mod leveling;
pub mod model;
pub mod streak;
pub mod time;
pub mod unlock;

pub use time::{Calendar, CalendarError, Clock};
