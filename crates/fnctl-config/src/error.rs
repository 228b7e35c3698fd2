use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Invalid context name: '{0}'")]
    InvalidContextName(String),

    #[error("Failed to parse config file ({path}): {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Config file must contain a mapping at the top level: {0}")]
    NotAMapping(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

impl From<ConfigError> for fnctl_core::FnError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(io) => fnctl_core::FnError::Io(io),
            other => fnctl_core::FnError::Config(other.to_string()),
        }
    }
}
