use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while locating or reading external inputs
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("modifications directory {path} does not exist")]
    MissingDirectory { path: PathBuf },

    #[error("no modification tracking files found in {dir}")]
    NoModificationFiles { dir: PathBuf },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Errors raised when validating a category registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("category name must not be empty")]
    EmptyCategoryName,

    #[error("category {category:?} has no parameter patterns")]
    NoPatterns { category: String },

    #[error("category {category:?} contains an empty pattern")]
    EmptyPattern { category: String },

    #[error("pattern {pattern:?} is declared twice in category {category:?}")]
    DuplicatePattern { category: String, pattern: String },

    #[error("category {category:?} is declared twice")]
    DuplicateCategory { category: String },

    #[error("invalid pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// Errors that abort a multi-level analysis run
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The run was cancelled through its progress handle
    #[error("analysis cancelled")]
    Cancelled,

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

pub type Result<T, E = AnalysisError> = std::result::Result<T, E>;
