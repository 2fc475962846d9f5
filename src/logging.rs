use log::LevelFilter;
use log4rs::{
    append::console::{ConsoleAppender, Target},
    config::{Appender, Config as LogConfig, Root},
    encode::pattern::PatternEncoder,
};

use crate::config::Config;
use crate::error::{Error, Result};

const CONSOLE_APPENDER: &str = "stderr";
const CONSOLE_PATTERN: &str = "{d(%H:%M:%S%.3f)} {h({l:<5})} {t} - {m}{n}";

/// Build the fallback logger: everything at `level` or above goes to stderr.
pub fn console_config(level: LevelFilter) -> Result<LogConfig> {
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(CONSOLE_PATTERN)))
        .build();
    LogConfig::builder()
        .appender(Appender::builder().build(CONSOLE_APPENDER, Box::new(stderr)))
        .build(Root::builder().appender(CONSOLE_APPENDER).build(level))
        .map_err(|e| Error::Logging(e.to_string()))
}

/// Install the global logger. Uses the configured log4rs file if there is
/// one, and the stderr console logger otherwise. Fails if a logger is
/// already installed.
pub fn init(config: &Config) -> Result<()> {
    match config.log_config() {
        Some(path) => log4rs::init_file(path, Default::default())
            .map_err(|e| Error::Logging(format!("{}: {e}", path.display())))?,
        None => {
            log4rs::init_config(console_config(config.log_level())?)
                .map_err(|e| Error::Logging(e.to_string()))?;
        }
    }
    info!("Initialised logging");
    Ok(())
}
