use figment::Error as ConfigError;
use serde_json::Error as JsonError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// An answer was recorded against a variant that does not belong to the
    /// vote schema being answered.
    #[error("Invalid answer variant: {0}")]
    InvalidAnswerVariant(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Json(#[from] JsonError),
    #[error(transparent)]
    Config(#[from] Box<ConfigError>),
    #[error("Failed to initialise logging: {0}")]
    Logging(String),
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(Box::new(err))
    }
}

impl Error {
    /// Is this a rejected cross-aggregate reference?
    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, Self::InvalidAnswerVariant(_))
    }
}
