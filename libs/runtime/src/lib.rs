//! Process runtime: layered configuration and logging initialization.

pub mod config;
pub mod logging;

pub use config::{
    default_logging_config, AppConfig, CliArgs, DatabaseConfig, LoggingConfig, PaginationConfig,
    Section, ServerConfig,
};
pub use logging::init_logging_from_config;
