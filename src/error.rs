//! Error types for drive traversal and download operations.

use reqwest::StatusCode;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while talking to the drive or writing local files.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// I/O error during file operations.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// HTTP request error.
    #[error(transparent)]
    Request(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Malformed API base URL or endpoint.
    #[error(transparent)]
    Url(#[from] url::ParseError),

    /// The drive API answered with a non-success status.
    #[error("api returned {status}: {body}")]
    Api { status: StatusCode, body: String },

    /// The access token is missing, expired or rejected.
    #[error("authentication failed: {0}")]
    Unauthorized(String),

    /// No entry exists at the given remote path.
    #[error("remote path not found: {0}")]
    NotFound(String),

    #[error("remote path is not a folder: {0}")]
    NotAFolder(String),

    #[error("remote path is not a file: {0}")]
    NotAFile(String),

    /// The file detail carried neither a direct link nor a web content link.
    #[error("no download link for file {0}")]
    MissingDownloadLink(String),

    /// Fewer or more bytes were written than the drive reported.
    #[error("size mismatch for {}: expected {expected} bytes, got {actual} bytes", .path.display())]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    /// Streamed content does not hash to the drive's MD5 checksum.
    #[error("MD5 mismatch for {}: expected {expected}, got {actual}", .path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
}

impl DownloadError {
    /// Returns `true` when the error means the session cannot be used at all.
    pub fn is_auth(&self) -> bool {
        matches!(self, DownloadError::Unauthorized(_))
    }
}
