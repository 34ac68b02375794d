//! CLI error types.

use std::path::PathBuf;

use twigify_config::ConfigError;
use twigify_core::ConvertError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Failure of a single document. Reported without stopping the batch.
#[derive(Debug, thiserror::Error)]
pub(crate) enum DocumentError {
    #[error("failed to read: {0}")]
    Read(#[from] std::io::Error),

    #[error("{0}")]
    Convert(#[from] ConvertError),
}
