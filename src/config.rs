use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Config file read when no other is given.
pub const DEFAULT_CONFIG_FILE: &str = "VoteInspect.toml";

/// Prefix of environment variables overriding the config file.
pub const ENV_PREFIX: &str = "VOTE_INSPECT_";

/// Configuration of the inspection tool, derived from `VoteInspect.toml` and
/// `VOTE_INSPECT_*` environment variables. Every key is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    log_level: LevelFilter,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_config: Option<PathBuf>,
    pretty: bool,
    show_pending: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LevelFilter::Warn,
            log_config: None,
            pretty: true,
            show_pending: false,
        }
    }
}

impl Config {
    /// Layer the defaults, the TOML file at `file` (if it exists) and the
    /// environment, later sources winning.
    pub fn figment(file: &Path) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load the config from `file`, or from [`DEFAULT_CONFIG_FILE`].
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file = file.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        let config = Self::figment(file).extract()?;
        Ok(config)
    }

    /// Maximum level logged when no log4rs file is configured.
    /// Configured via `log_level`.
    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    /// Optional log4rs YAML file that replaces the built-in console logger.
    pub fn log_config(&self) -> Option<&Path> {
        self.log_config.as_deref()
    }

    /// Whether the JSON report is pretty-printed.
    pub fn pretty(&self) -> bool {
        self.pretty
    }

    /// Whether the report includes the insert/move/delete counts a
    /// persistence layer would see for the loaded aggregates.
    pub fn show_pending(&self) -> bool {
        self.show_pending
    }
}
