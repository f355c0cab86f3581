use thiserror::Error;

use crate::config::ConfigError;
use crate::registry::RegistryError;
use crate::store::CacheError;

/// Invalid user-supplied option values. Fatal to the current invocation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OptionError {
    #[error("invalid --since value {0:?}: expected \"last\", a duration like 1d or a date like 2024-01-01 12:00:00")]
    InvalidSince(String),

    #[error("invalid color mapping {0:?}: expected entries like 1:2,3:4")]
    InvalidColorMap(String),

    #[error("invalid proxy URL {0:?}: {1}")]
    InvalidProxy(String, String),

    #[error("invalid feed URL {0:?}: {1}")]
    InvalidUrl(String, String),

    #[error("invalid {0} value {1}")]
    OutOfRange(&'static str, u64),
}

#[derive(Error, Debug)]
pub enum TributaryError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Option(#[from] OptionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TributaryError>;
