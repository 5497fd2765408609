//! CLI error types.

use crate::config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// CLI errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The transcript database does not exist yet.
    #[error("no transcripts at {path}. Run 'touchline chat' or 'touchline ask' first")]
    DatabaseNotFound { path: PathBuf },

    /// No transcript exists for the given session key.
    #[error("no session named '{key}'")]
    SessionNotFound { key: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Runtime(#[from] runtime::Error),

    #[error(transparent)]
    Registry(#[from] runtime::RegistryError),

    #[error(transparent)]
    Storage(#[from] storage::Error),

    #[error(transparent)]
    Fpl(#[from] fpl::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
