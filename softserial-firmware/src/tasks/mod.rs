//! Embassy async tasks
//!
//! Each task runs independently and talks to the serial port through the
//! shared `SERIAL` state.

pub mod echo;
pub mod monitor;

pub use echo::echo_task;
pub use monitor::monitor_task;
