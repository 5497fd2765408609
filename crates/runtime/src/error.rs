use crate::tools::RegistryError;
use thiserror::Error;

/// Errors that prevent an exchange from running or being recorded.
///
/// Model and tool failures are not errors at this level: they end up in the
/// transcript or in the exchange outcome.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Storage(#[from] storage::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
