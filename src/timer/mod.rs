pub mod controller;
pub mod state;

pub use controller::{FocusTimer, TimerSnapshot};
pub use state::{FocusTimerState, TimerStatus};
