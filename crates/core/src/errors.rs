use thiserror::Error;

use crate::config::ConfigError;
use crate::filter::FilterConfigError;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ApplicationError {
    #[error(transparent)]
    Filter(#[from] FilterConfigError),
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("invalid input: {0}")]
    Input(String),
}

impl From<ConfigError> for ApplicationError {
    fn from(value: ConfigError) -> Self {
        match value {
            ConfigError::Filter(error) => Self::Filter(error),
            other => Self::Configuration(other.to_string()),
        }
    }
}

impl ApplicationError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Filter(_) | Self::Configuration(_) => "config_validation",
            Self::Input(_) => "input",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Filter(_) | Self::Configuration(_) => 2,
            Self::Input(_) => 3,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Filter(_) | Self::Configuration(_) => {
                "The filter configuration is invalid. Fix the config file or environment and retry."
            }
            Self::Input(_) => "The input could not be read. Check the file and try again.",
        }
    }
}
