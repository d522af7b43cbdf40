//! Error handling for semrank.
//!
//! This module provides:
//! - [`RankError`]: The main error enum for all engine operations
//! - [`ErrorCode`]: Standardized error codes for machine parsing
//! - [`StructuredError`]: Serializable error with suggestion and context

mod codes;

use std::io;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use codes::ErrorCode;

/// Main error type for semrank operations.
#[derive(Error, Debug)]
pub enum RankError {
    #[error("Query analysis failed: {0}")]
    Analysis(String),

    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Vector dimension mismatch for '{document_id}': expected {expected}, got {actual}")]
    VectorDimensionMismatch {
        document_id: String,
        expected: usize,
        actual: usize,
    },

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Document already exists: {0}")]
    DuplicateDocument(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Timeout: {0}")]
    Timeout(String),
}

impl RankError {
    /// Get the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Analysis(_) => ErrorCode::QueryMalformed,
            Self::IndexUnavailable(_) => ErrorCode::IndexUnavailable,
            Self::VectorDimensionMismatch { .. } => ErrorCode::VectorDimensionMismatch,
            Self::Cache(_) => ErrorCode::CacheFailure,
            Self::Persistence(_) => ErrorCode::PersistenceFailed,
            Self::DocumentNotFound(_) => ErrorCode::DocumentNotFound,
            Self::DuplicateDocument(_) => ErrorCode::DocumentExists,
            Self::InvalidDocument(_) => ErrorCode::DocumentInvalid,
            Self::Config(_) => ErrorCode::ConfigInvalid,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) | Self::TomlDe(_) | Self::TomlSer(_) => ErrorCode::SerializationError,
            Self::Timeout(_) => ErrorCode::SearchTimeout,
        }
    }

    /// Get context information for this error as JSON.
    #[must_use]
    pub fn context(&self) -> Option<Value> {
        match self {
            Self::DocumentNotFound(id) | Self::DuplicateDocument(id) => {
                Some(serde_json::json!({ "document_id": id }))
            }
            Self::VectorDimensionMismatch {
                document_id,
                expected,
                actual,
            } => Some(serde_json::json!({
                "document_id": document_id,
                "expected": expected,
                "actual": actual,
            })),
            _ => None,
        }
    }

    /// Convert this error to a structured error.
    #[must_use]
    pub fn to_structured(&self) -> StructuredError {
        StructuredError::from_rank_error(self)
    }
}

/// A structured error with machine-readable code, suggestion, and context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// The error code (e.g., "DOCUMENT_NOT_FOUND")
    pub code: ErrorCode,

    /// The numeric error code (e.g., 203)
    pub numeric_code: u16,

    /// Human-readable error message
    pub message: String,

    /// Actionable suggestion for recovery
    pub suggestion: String,

    /// Additional context for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,

    /// Whether this error is potentially recoverable by the user
    pub recoverable: bool,

    /// Error category (e.g., "index", "config", "storage")
    pub category: String,
}

impl StructuredError {
    /// Create a new structured error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            numeric_code: code.numeric(),
            suggestion: code.suggestion().to_string(),
            context: None,
            recoverable: code.is_recoverable(),
            category: code.category().to_string(),
            code,
            message: message.into(),
        }
    }

    /// Create a structured error from a `RankError`.
    #[must_use]
    pub fn from_rank_error(err: &RankError) -> Self {
        let mut structured = Self::new(err.code(), err.to_string());
        structured.context = err.context();
        structured
    }

    /// Add context to this error.
    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

impl std::fmt::Display for StructuredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<&RankError> for StructuredError {
    fn from(err: &RankError) -> Self {
        Self::from_rank_error(err)
    }
}

pub type Result<T> = std::result::Result<T, RankError>;
