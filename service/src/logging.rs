//! Terminal logging for the idea platform binaries.
//!
//! Everything goes through the `log` facade; `simplelog` only renders it.
//! Database and HTTP client crates are chatty at DEBUG, so their records are
//! dropped unless the configured level is TRACE.
use crate::config::Config;
use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

/// Crates behind the ORM and the embedding client.
const FILTERED_MODULES: &[&str] = &["sqlx", "sea_orm", "reqwest", "hyper", "rustls"];

pub struct Logger {}

impl Logger {
    /// Installs the global terminal logger at `config.log_level_filter`.
    ///
    /// Fails when a logger is already installed, for instance when a test
    /// harness got there first.
    pub fn init_logger(config: &Config) -> Result<(), log::SetLoggerError> {
        TermLogger::init(
            config.log_level_filter,
            Self::build_log_config(config.log_level_filter),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        )
    }

    fn shows_dependency_records(level: LevelFilter) -> bool {
        level == LevelFilter::Trace
    }

    fn build_log_config(level: LevelFilter) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();

        if !Self::shows_dependency_records(level) {
            for module in FILTERED_MODULES {
                builder.add_filter_ignore_str(module);
            }
        }

        builder.build()
    }
}
