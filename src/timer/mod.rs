pub mod clock;
pub mod commands;
pub mod controller;
pub mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{TimerController, TimerSnapshot};
pub use state::{AlarmLatch, GameSelection, TimerState, TimerStatus};
