mod runner;
pub mod shutdown;

pub use runner::{run, Exit, RunOptions, RunReport, ShutdownOptions};
