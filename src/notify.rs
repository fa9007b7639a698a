//! Expiry reminder scheduling.
//!
//! Only the write side exists: a reminder row is recorded whenever a document
//! gains a known expiry date. Nothing in this crate delivers or marks them sent.

use crate::error::StorageError;
use crate::model::{ExpiryNotification, UploadedDocument};
use crate::storage::DocumentStore;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

/// Record an unsent reminder for `document` if it has an expiry date.
///
/// Returns the written row, or `None` when the document has no expiry.
pub async fn schedule_expiry_reminder(
    store: &dyn DocumentStore,
    document: &UploadedDocument,
) -> Result<Option<ExpiryNotification>, StorageError> {
    let Some(expiry_date) = document.expiry_date else {
        return Ok(None);
    };

    let notification = ExpiryNotification {
        id: Uuid::new_v4().to_string(),
        document_id: document.id.clone(),
        owner_id: document.owner_id.clone(),
        expiry_date,
        is_sent: false,
        created_at: Utc::now(),
    };
    store.put_notification(notification.clone()).await?;

    info!(
        document_id = %document.id,
        owner_id = %document.owner_id,
        %expiry_date,
        "Scheduled expiry reminder"
    );
    Ok(Some(notification))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BinaryRef, DocumentCategory, ExtractedFields};
    use crate::storage::MemoryDocumentStore;
    use chrono::NaiveDate;

    fn doc(expiry: Option<NaiveDate>) -> UploadedDocument {
        let now = Utc::now();
        UploadedDocument {
            id: "d1".into(),
            owner_id: "u1".into(),
            name: "Passport".into(),
            category: DocumentCategory::Passport,
            binary: BinaryRef {
                path: "documents/u1/d1/original.jpg".into(),
                content_type: "image/jpeg".into(),
                size: 3,
                url: "/files/documents/u1/d1/original.jpg".into(),
            },
            thumbnail: None,
            raw_text: String::new(),
            extracted_fields: ExtractedFields::default(),
            tags: vec![],
            expiry_date: expiry,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn writes_unsent_reminder_when_expiry_known() {
        let store = MemoryDocumentStore::new();
        let expiry = NaiveDate::from_ymd_opt(2031, 5, 1).unwrap();

        let row = schedule_expiry_reminder(&store, &doc(Some(expiry)))
            .await
            .unwrap()
            .expect("reminder written");
        assert!(!row.is_sent);
        assert_eq!(row.expiry_date, expiry);

        let stored = store.notifications_for("u1").await.unwrap();
        assert_eq!(stored, vec![row]);
    }

    #[tokio::test]
    async fn skips_documents_without_expiry() {
        let store = MemoryDocumentStore::new();
        let row = schedule_expiry_reminder(&store, &doc(None)).await.unwrap();
        assert!(row.is_none());
        assert!(store.notifications_for("u1").await.unwrap().is_empty());
    }
}
