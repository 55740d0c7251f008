//! GPIO access and task helpers.

pub mod gpio;
pub mod task_pin;
