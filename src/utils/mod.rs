mod paths;
mod time;

pub use paths::*;
pub use time::*;
