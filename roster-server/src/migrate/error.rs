//! Migration error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or running migrations
#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid migration file name {path:?}: {reason}")]
    InvalidFileName { path: PathBuf, reason: String },

    #[error("failed to parse migration {path:?}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("duplicate migration version {version}: {first:?} and {second:?}")]
    DuplicateVersion {
        version: i64,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("migration bookkeeping failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration {version} ({name}) failed: {source}")]
    Apply {
        version: i64,
        name: String,
        source: sqlx::Error,
    },

    #[error("reverting migration {version} ({name}) failed: {source}")]
    Revert {
        version: i64,
        name: String,
        source: sqlx::Error,
    },

    #[error("migration {version} ({name}) has no down section")]
    NoDownSection { version: i64, name: String },

    #[error("migration {version} is recorded as applied but has no file in the migrations directory")]
    MissingSource { version: i64 },
}

impl MigrateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_file_name(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidFileName {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
