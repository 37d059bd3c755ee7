//! Error types shared across Montage crates.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level error type for Montage operations.
#[derive(Debug, thiserror::Error)]
pub enum MontageError {
    /// Source unresolvable or unreadable. Fatal to the operation.
    #[error("Resource error: {message}")]
    Resource { message: String },

    /// The decoder handle is gone; recoverable through a refresh.
    #[error("Decoder unavailable: {message}")]
    DecoderUnavailable { message: String },

    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },

    #[error("Out of range: {message}")]
    OutOfRange { message: String },

    #[error("Not decodable: {message}")]
    NotDecodable { message: String },

    #[error("Project error: {message}")]
    Project { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using MontageError.
pub type MontageResult<T> = Result<T, MontageError>;

/// Discriminant of a [`MontageError`], cheap to copy into per-item reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Resource,
    DecoderUnavailable,
    InvalidParameter,
    OutOfRange,
    NotDecodable,
    Timeout,
    Project,
    Config,
    Io,
    Other,
}

impl MontageError {
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource {
            message: msg.into(),
        }
    }

    pub fn decoder_unavailable(msg: impl Into<String>) -> Self {
        Self::DecoderUnavailable {
            message: msg.into(),
        }
    }

    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: msg.into(),
        }
    }

    pub fn out_of_range(msg: impl Into<String>) -> Self {
        Self::OutOfRange {
            message: msg.into(),
        }
    }

    pub fn not_decodable(msg: impl Into<String>) -> Self {
        Self::NotDecodable {
            message: msg.into(),
        }
    }

    pub fn project(msg: impl Into<String>) -> Self {
        Self::Project {
            message: msg.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Resource { .. } => ErrorKind::Resource,
            Self::DecoderUnavailable { .. } => ErrorKind::DecoderUnavailable,
            Self::InvalidParameter { .. } => ErrorKind::InvalidParameter,
            Self::OutOfRange { .. } => ErrorKind::OutOfRange,
            Self::NotDecodable { .. } => ErrorKind::NotDecodable,
            Self::Project { .. } => ErrorKind::Project,
            Self::Config { .. } => ErrorKind::Config,
            Self::FileNotFound { .. } | Self::Io(_) => ErrorKind::Io,
            Self::Json(_) | Self::Other(_) => ErrorKind::Other,
        }
    }

    /// Whether a refresh of the underlying asset may clear this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::DecoderUnavailable { .. })
    }
}
