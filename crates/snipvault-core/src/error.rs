//! Error types for the core crate.

use snipvault_store::StoreError;
use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Remote content store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// An `index.md` could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Snippet input was rejected before touching the store.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// True when the underlying store reported a missing path or commit.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_not_found())
    }

    /// True when an optimistic-concurrency precondition failed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_conflict())
    }
}

/// Front-matter encoding/decoding errors.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The text does not start with a `---` block.
    #[error("missing front-matter block")]
    MissingFrontmatter,

    /// The opening `---` has no closing delimiter.
    #[error("missing closing front-matter delimiter")]
    Unterminated,

    /// The front-matter is not valid YAML for an index.
    #[error("invalid front-matter YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The index has no usable title.
    #[error("index has no title")]
    MissingTitle,
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("cannot read config at {path}: {message}")]
    Unreadable { path: String, message: String },

    /// Invalid JSON syntax.
    #[error("invalid config at {path}: {message}")]
    InvalidJson { path: String, message: String },

    /// A required setting is missing.
    #[error("missing required setting: {name}")]
    Missing { name: String },

    /// A setting has a value that cannot be used.
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_keep_their_kind() {
        let err: CoreError = StoreError::conflict("stale").into();
        assert!(err.is_conflict());
        assert!(!err.is_not_found());

        let err: CoreError = StoreError::not_found("x").into();
        assert!(err.is_not_found());
    }

    #[test]
    fn config_error_displays_setting() {
        let err = ConfigError::Missing {
            name: "github.owner".to_string(),
        };
        assert_eq!(err.to_string(), "missing required setting: github.owner");
    }
}
