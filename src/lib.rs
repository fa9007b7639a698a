//! # docvault
//!
//! A travel-document vault: upload scans of passports, visas, insurance
//! policies and vaccination certificates, read them with a vision LLM, pull
//! out the fields that matter, and remind the owner before they expire.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload (multipart)
//!  │
//!  ├─ 1. Ingress    MIME allow-list (JPEG, PNG, PDF) and 10 MiB cap
//!  ├─ 2. Normalise  decode, fit within 2048 px, re-encode JPEG, thumbnail
//!  ├─ 3. OCR        vision LLM via edgequake-llm; failure ⇒ empty text
//!  ├─ 4. Cleanup    strip fences, invisible chars, blank-line runs
//!  ├─ 5. Parse      expiry date, document number, names (regex)
//!  ├─ 6. Persist    binary ⇒ ObjectStore, record ⇒ DocumentStore
//!  └─ 7. Notify     one ExpiryNotification row when an expiry is known
//! ```
//!
//! Stages 1, 2 and 6 abort the upload on failure. Stage 3 never does.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docvault::{
//!     DocumentVault, IncomingFile, LocalObjectStore, MemoryDocumentStore, UploadMetadata,
//!     VaultConfig,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = VaultConfig::default();
//!     let vault = DocumentVault::new(
//!         config,
//!         Arc::new(LocalObjectStore::new("./vault-data", "/files")),
//!         Arc::new(MemoryDocumentStore::new()),
//!     );
//!
//!     let file = IncomingFile {
//!         file_name: Some("passport.jpg".into()),
//!         content_type: "image/jpeg".into(),
//!         bytes: std::fs::read("passport.jpg")?.into(),
//!     };
//!     let doc = vault.upload("owner-1", file, UploadMetadata::default()).await?;
//!     println!("{} expires {:?}", doc.name, doc.expiry_date);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docvault` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when embedding the vault in another service:
//! ```toml
//! docvault = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod notify;
pub mod pipeline;
pub mod prompts;
pub mod share;
pub mod storage;
pub mod vault;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use api::{router, AppState, TokenKeys};
pub use cache::{OcrCache, TtlCache};
pub use config::{VaultConfig, VaultConfigBuilder};
pub use error::{ExtractionError, StorageError, VaultError};
pub use model::{
    BinaryRef, DocumentCategory, DocumentPatch, ExpiryAlert, ExpiryNotification,
    ExtractedFields, IncomingFile, ListOptions, ScanOutcome, ShareMethod, ShareOutcome,
    ShareRecord, SortField, SortOrder, UploadMetadata, UploadResponse, UploadedDocument,
};
pub use pipeline::ocr::{DisabledRecognizer, TextRecognizer, VisionRecognizer};
pub use storage::{DocumentStore, LocalObjectStore, MemoryDocumentStore, ObjectStore};
pub use vault::DocumentVault;
