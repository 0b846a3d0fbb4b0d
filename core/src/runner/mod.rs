//! External process execution with concurrent output capture.

mod io_pump;
mod process;

pub use io_pump::{pump, replay, OutputStream};
pub use process::{run_command, CommandOutput, CommandSpec};
