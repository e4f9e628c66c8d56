//! Error types for defstore_core operations.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for defstore_core operations.
///
/// "Nothing matched" is never an error: lookups report that with `Ok(None)`
/// or an empty list. Every variant here is either a broken contract or
/// unreadable state.
#[derive(Error, Debug)]
pub enum StoreError {
    /// An index was queried or written before it was built or read.
    #[error("index not ready: {0}")]
    NotReady(String),

    /// An index slot was filled a second time.
    #[error("index already built or read: {0}")]
    AlreadyReady(String),

    /// Defs and offsets handed to a build are not positionally aligned.
    #[error("offset count mismatch: {defs} defs but {offsets} offsets")]
    OffsetCountMismatch {
        /// Number of defs
        defs: usize,
        /// Number of offsets
        offsets: usize,
    },

    /// Automaton keys must arrive strictly ascending.
    #[error("automaton insert out of order: {key:?} does not sort after {previous:?}")]
    UnsortedInsert {
        /// The previously inserted key
        previous: String,
        /// The offending key
        key: String,
    },

    /// Encoding an in-memory structure to bytes failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Serialization error during typed record operations.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error during typed record operations.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Persisted bytes are truncated, malformed or internally inconsistent.
    #[error("corrupt index data: {reason}")]
    Corrupt {
        /// Description of the corruption
        reason: String,
    },

    /// Persisted data was written by an incompatible format version.
    #[error("format version mismatch: found {found}, expected {expected}")]
    VersionMismatch {
        /// Version found in the data
        found: u32,
        /// Version this build understands
        expected: u32,
    },

    /// Payload checksum verification failed.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The checksum recorded in the envelope
        expected: String,
        /// The checksum computed over the payload
        actual: String,
    },

    /// Compression or decompression failed.
    #[error("compression error: {0}")]
    Compression(String),

    /// An offset does not address a record in the def blob.
    #[error("bad def offset {offset}: {reason}")]
    BadOffset {
        /// The offending offset
        offset: u64,
        /// Why it could not be resolved
        reason: String,
    },

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error (loading, parsing, invalid values).
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Another process is building into the same store directory.
    #[error("store locked by another process: {}", path.display())]
    StoreLocked {
        /// Path to the lock file
        path: PathBuf,
    },

    /// A manifest or config names an index kind this build does not know.
    #[error("unknown index kind: {0}")]
    UnknownIndex(String),
}

impl StoreError {
    /// Shorthand for [`StoreError::Corrupt`].
    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        Self::Corrupt {
            reason: reason.into(),
        }
    }

    /// Returns a user-friendly recovery suggestion for the error, if available.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Corrupt { .. } | Self::ChecksumMismatch { .. } | Self::Compression(_) => {
                Some("Rebuild the store with 'defstore build' from the original defs.")
            }
            Self::VersionMismatch { .. } => {
                Some("The store was written by a different defstore version. Rebuild it.")
            }
            Self::StoreLocked { .. } => Some(
                "Wait for the other build to finish, or remove the LOCK file if no build is running.",
            ),
            Self::BadOffset { .. } => {
                Some("The def blob and its indexes are out of sync. Rebuild the store.")
            }
            Self::UnknownIndex(_) => {
                Some("Check the [indexes] section of config.toml for typos.")
            }
            _ => None,
        }
    }
}

/// Convenience Result type for defstore_core operations.
pub type Result<T> = std::result::Result<T, StoreError>;
