//! Error types for sudosql-core.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias using sudosql-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The source database could not be read or the schema generator failed.
    #[error("schema generation failed for {database}: {message}")]
    SchemaGeneration { database: String, message: String },

    /// A cache entry or result log could not be read or written.
    #[error("storage error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A provider failed to produce text (transport, auth, rate limit, malformed response).
    #[error("generation failed ({provider}): {message}")]
    Generation { provider: String, message: String },

    /// A provider call exceeded its deadline.
    #[error("generation timed out ({provider}) after {seconds}s")]
    Timeout { provider: String, seconds: u64 },

    #[error("configuration error: {0}")]
    Configuration(String),

    /// Dataset files missing or malformed.
    #[error("dataset error: {message}")]
    Dataset { message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn schema_generation(database: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaGeneration {
            database: database.into(),
            message: message.into(),
        }
    }

    pub fn storage(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn generation(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Generation {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn dataset(message: impl Into<String>) -> Self {
        Self::Dataset {
            message: message.into(),
        }
    }

    /// Provider-side failures: the caller may retry the whole operation.
    pub fn is_generation(&self) -> bool {
        matches!(self, Error::Generation { .. } | Error::Timeout { .. })
    }

    /// Cache/log/schema failures. Never downgraded to warnings.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Error::SchemaGeneration { .. } | Error::Storage { .. } | Error::Serialization(_)
        )
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_) | Error::Dataset { .. })
    }
}

/// Attach a path to an `io::Result`, turning it into a storage error.
pub(crate) trait StorageContext<T> {
    fn at_path(self, path: &Path) -> Result<T>;
}

impl<T> StorageContext<T> for std::io::Result<T> {
    fn at_path(self, path: &Path) -> Result<T> {
        self.map_err(|e| Error::storage(path, e))
    }
}
