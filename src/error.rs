//! Error types for the docvault library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`VaultError`] — **Fatal**: the request cannot proceed (rejected upload,
//!   undecodable image, unknown document, storage failure). Returned as
//!   `Err(VaultError)` from every [`crate::vault::DocumentVault`] operation.
//!
//! * [`ExtractionError`] — **Non-fatal**: OCR failed for an image that was
//!   otherwise accepted. The pipeline logs it, stores an empty transcription
//!   and carries on, so it never reaches the caller as an `Err`.
//!
//! [`StorageError`] is what the storage collaborators return; the vault
//! converts it into [`VaultError::Storage`] when it is fatal and merely logs
//! it when it is not (binary cleanup on delete).

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the docvault library.
#[derive(Debug, Error)]
pub enum VaultError {
    // ── Ingress errors ────────────────────────────────────────────────────
    /// The multipart request carried no file part under the expected field name.
    #[error("No file uploaded: expected a multipart field named '{field}'")]
    MissingFile { field: &'static str },

    /// Declared content type is not on the allow-list.
    #[error("Invalid file type '{content_type}': only JPEG, PNG and PDF files are accepted")]
    InvalidFileType { content_type: String },

    /// Upload exceeds the configured size cap.
    #[error("File too large: {size} bytes exceeds the {limit} byte limit")]
    FileTooLarge { size: u64, limit: u64 },

    /// The request body as a whole went over the route's body limit.
    #[error("Request body too large: {0}")]
    BodyTooLarge(String),

    // ── Pipeline errors ───────────────────────────────────────────────────
    /// Image could not be decoded or re-encoded. Nothing was persisted.
    #[error("Failed to process document: {detail}")]
    ProcessingFailed { detail: String },

    // ── Record errors ─────────────────────────────────────────────────────
    /// No document with this id exists.
    #[error("Document '{id}' not found")]
    NotFound { id: String },

    /// The document exists but belongs to another owner.
    #[error("Document '{id}' is not owned by the caller")]
    Forbidden { id: String },

    /// Malformed request payload or query parameter.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Bearer token missing, malformed or expired.
    #[error("Not authenticated: {0}")]
    Unauthenticated(String),

    // ── Collaborator errors ───────────────────────────────────────────────
    /// Object storage or document store failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal OCR failure.
///
/// Any variant downgrades the upload to "stored without text" rather than
/// failing it.
#[derive(Debug, Clone, Error)]
pub enum ExtractionError {
    /// OCR is switched off in the configuration.
    #[error("OCR is disabled")]
    Disabled,

    /// No vision provider could be resolved.
    #[error("OCR provider '{provider}' is not configured: {hint}")]
    ProviderUnavailable { provider: String, hint: String },

    /// The provider kept failing after all retries.
    #[error("OCR failed after {retries} retries: {detail}")]
    Failed { retries: u32, detail: String },

    /// A single provider call exceeded the timeout.
    #[error("OCR call timed out after {secs}s")]
    Timeout { secs: u64 },
}

/// Errors raised by [`crate::storage::ObjectStore`] and
/// [`crate::storage::DocumentStore`] implementations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The object or record does not exist.
    #[error("'{key}' does not exist in storage")]
    NotFound { key: String },

    /// Filesystem I/O failure in the local object store.
    #[error("Storage I/O failed for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The object path would escape the storage root.
    #[error("Invalid object path '{0}'")]
    InvalidPath(String),

    /// Any other backend failure.
    #[error("Storage backend error: {0}")]
    Backend(String),
}
