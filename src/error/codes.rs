//! Standardized error codes for machine-parseable output.
//!
//! Error codes follow a numeric taxonomy:
//! - 1xx: Query analysis errors
//! - 2xx: Index errors
//! - 3xx: Config errors
//! - 4xx: Search errors
//! - 6xx: Storage errors
//! - 9xx: Internal errors

use serde::{Deserialize, Serialize};

/// Standardized error codes for JSON output.
///
/// Each variant maps to a numeric code (e.g., `QueryMalformed` -> E102).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================
    // Analysis errors (1xx)
    // ========================================
    /// E102: Query could not be analyzed
    QueryMalformed,

    // ========================================
    // Index errors (2xx)
    // ========================================
    /// E201: Index has not been loaded yet or is disabled
    IndexUnavailable,
    /// E202: A stored vector does not match the index dimension
    VectorDimensionMismatch,
    /// E203: Document id is not in the index
    DocumentNotFound,
    /// E204: Document id already exists
    DocumentExists,
    /// E205: Document input is not acceptable
    DocumentInvalid,

    // ========================================
    // Config errors (3xx)
    // ========================================
    /// E302: Config file has invalid syntax or values
    ConfigInvalid,

    // ========================================
    // Search errors (4xx)
    // ========================================
    /// E402: Search scan ran past its deadline
    SearchTimeout,
    /// E405: Result cache could not serve or store an entry
    CacheFailure,

    // ========================================
    // Storage errors (6xx)
    // ========================================
    /// E601: Snapshot could not be read or written
    PersistenceFailed,
    /// E605: Data could not be (de)serialized
    SerializationError,
    /// E606: IO operation failed
    IoError,

    // ========================================
    // Internal errors (9xx)
    // ========================================
    /// E901: Unexpected internal error
    InternalError,
}

impl ErrorCode {
    /// Get the numeric error code (e.g., `QueryMalformed` -> 102).
    #[must_use]
    pub const fn numeric(&self) -> u16 {
        match self {
            Self::QueryMalformed => 102,

            Self::IndexUnavailable => 201,
            Self::VectorDimensionMismatch => 202,
            Self::DocumentNotFound => 203,
            Self::DocumentExists => 204,
            Self::DocumentInvalid => 205,

            Self::ConfigInvalid => 302,

            Self::SearchTimeout => 402,
            Self::CacheFailure => 405,

            Self::PersistenceFailed => 601,
            Self::SerializationError => 605,
            Self::IoError => 606,

            Self::InternalError => 901,
        }
    }

    /// Get the error code as a formatted string (e.g., "E101").
    #[must_use]
    pub fn code_string(&self) -> String {
        format!("E{}", self.numeric())
    }

    /// Get the default suggestion for this error code.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::QueryMalformed => "Simplify the query; it is treated as a single keyword",

            Self::IndexUnavailable => "Wait for the snapshot to finish loading, or check the snapshot path in config",
            Self::VectorDimensionMismatch => "Run `semrank remove <id>` and add or import the document again to recompute its vector",
            Self::DocumentNotFound => "Run `semrank health` to check the index, or search for the document first",
            Self::DocumentExists => "Use `semrank update <id>` to change an existing document",
            Self::DocumentInvalid => "Documents need non-empty content",

            Self::ConfigInvalid => "Run `semrank config` to see current values. Check TOML syntax in config file",

            Self::SearchTimeout => "Narrow the query or raise search.scan_timeout",
            Self::CacheFailure => "The request was served without the cache; no action needed",

            Self::PersistenceFailed => "Check disk space and permissions on the snapshot directory; the next checkpoint retries",
            Self::SerializationError => "The data format may be corrupted. Check input data for validity",
            Self::IoError => "File operation failed. Check path exists and permissions are correct",

            Self::InternalError => "An unexpected error occurred. Please report this issue with full error output",
        }
    }

    /// Check if this error is potentially recoverable by the user.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::QueryMalformed
            | Self::IndexUnavailable
            | Self::VectorDimensionMismatch
            | Self::DocumentNotFound
            | Self::DocumentExists
            | Self::DocumentInvalid
            | Self::ConfigInvalid
            | Self::SearchTimeout
            | Self::CacheFailure
            | Self::PersistenceFailed
            | Self::IoError => true,

            Self::SerializationError | Self::InternalError => false,
        }
    }

    /// Get the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self.numeric() / 100 {
            1 => "analysis",
            2 => "index",
            3 => "config",
            4 => "search",
            6 => "storage",
            9 => "internal",
            _ => "unknown",
        }
    }

    /// Iterate over all error codes.
    pub fn all() -> impl Iterator<Item = Self> {
        [
            Self::QueryMalformed,
            Self::IndexUnavailable,
            Self::VectorDimensionMismatch,
            Self::DocumentNotFound,
            Self::DocumentExists,
            Self::DocumentInvalid,
            Self::ConfigInvalid,
            Self::SearchTimeout,
            Self::CacheFailure,
            Self::PersistenceFailed,
            Self::SerializationError,
            Self::IoError,
            Self::InternalError,
        ]
        .into_iter()
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code_string())
    }
}
