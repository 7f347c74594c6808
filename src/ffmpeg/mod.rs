mod wrapper;
mod probe;
mod commands;
mod progress;
mod job;

pub use wrapper::*;
pub use probe::*;
pub use commands::*;
pub use progress::*;
pub use job::*;
