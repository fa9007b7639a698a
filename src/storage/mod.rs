//! Storage collaborators.
//!
//! The vault talks to storage only through two traits:
//!
//! * [`ObjectStore`] — put/get/delete of binaries by path.
//! * [`DocumentStore`] — CRUD of document records keyed by id, with
//!   equality and array-contains filtering, plus the write-only
//!   notification and share-audit collections.
//!
//! [`LocalObjectStore`] and [`MemoryDocumentStore`] are the implementations
//! shipped with the crate. Neither offers cross-object transactions; the
//! vault does not need them.

mod local;
mod memory;

pub use local::LocalObjectStore;
pub use memory::MemoryDocumentStore;

use crate::error::StorageError;
use crate::model::{BinaryRef, DocumentQuery, ExpiryNotification, ShareRecord, UploadedDocument};
use async_trait::async_trait;
use bytes::Bytes;

/// Binary object storage addressed by slash-separated paths.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `bytes` at `path`, replacing any existing object.
    async fn put(&self, path: &str, bytes: Bytes, content_type: &str)
        -> Result<BinaryRef, StorageError>;

    /// Read the object at `path`.
    async fn get(&self, path: &str) -> Result<Bytes, StorageError>;

    /// Delete the object at `path`. Missing objects are [`StorageError::NotFound`].
    async fn delete(&self, path: &str) -> Result<(), StorageError>;
}

/// Record storage for documents and their side records.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create(&self, doc: UploadedDocument) -> Result<UploadedDocument, StorageError>;

    async fn get(&self, id: &str) -> Result<Option<UploadedDocument>, StorageError>;

    /// All documents matching `query`, in no particular order.
    async fn query(&self, query: &DocumentQuery) -> Result<Vec<UploadedDocument>, StorageError>;

    /// Replace an existing record. Missing records are [`StorageError::NotFound`].
    async fn update(&self, doc: UploadedDocument) -> Result<UploadedDocument, StorageError>;

    async fn delete(&self, id: &str) -> Result<(), StorageError>;

    async fn put_notification(&self, notification: ExpiryNotification) -> Result<(), StorageError>;

    async fn notifications_for(&self, owner_id: &str)
        -> Result<Vec<ExpiryNotification>, StorageError>;

    async fn put_share(&self, share: ShareRecord) -> Result<(), StorageError>;

    async fn shares_for(&self, document_id: &str) -> Result<Vec<ShareRecord>, StorageError>;
}

/// Storage path of a document's original (normalised) binary.
pub fn original_path(owner_id: &str, document_id: &str, extension: &str) -> String {
    format!("documents/{owner_id}/{document_id}/original.{extension}")
}

/// Storage path of a document's thumbnail.
pub fn thumbnail_path(owner_id: &str, document_id: &str) -> String {
    format!("documents/{owner_id}/{document_id}/thumbnail.jpg")
}
