//! In-memory document store.

use super::DocumentStore;
use crate::error::StorageError;
use crate::model::{DocumentQuery, ExpiryNotification, ShareRecord, UploadedDocument};
use async_trait::async_trait;
use dashmap::DashMap;

/// Document records held in concurrent maps. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: DashMap<String, UploadedDocument>,
    notifications: DashMap<String, ExpiryNotification>,
    shares: DashMap<String, ShareRecord>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create(&self, doc: UploadedDocument) -> Result<UploadedDocument, StorageError> {
        if self.documents.contains_key(&doc.id) {
            return Err(StorageError::Backend(format!(
                "document '{}' already exists",
                doc.id
            )));
        }
        self.documents.insert(doc.id.clone(), doc.clone());
        Ok(doc)
    }

    async fn get(&self, id: &str) -> Result<Option<UploadedDocument>, StorageError> {
        Ok(self.documents.get(id).map(|d| d.value().clone()))
    }

    async fn query(&self, query: &DocumentQuery) -> Result<Vec<UploadedDocument>, StorageError> {
        Ok(self
            .documents
            .iter()
            .filter(|entry| query.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn update(&self, doc: UploadedDocument) -> Result<UploadedDocument, StorageError> {
        match self.documents.get_mut(&doc.id) {
            Some(mut existing) => {
                *existing = doc.clone();
                Ok(doc)
            }
            None => Err(StorageError::NotFound { key: doc.id }),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        self.documents
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound { key: id.to_string() })
    }

    async fn put_notification(&self, notification: ExpiryNotification) -> Result<(), StorageError> {
        self.notifications
            .insert(notification.id.clone(), notification);
        Ok(())
    }

    async fn notifications_for(
        &self,
        owner_id: &str,
    ) -> Result<Vec<ExpiryNotification>, StorageError> {
        let mut rows: Vec<_> = self
            .notifications
            .iter()
            .filter(|n| n.owner_id == owner_id)
            .map(|n| n.value().clone())
            .collect();
        rows.sort_by_key(|n| n.created_at);
        Ok(rows)
    }

    async fn put_share(&self, share: ShareRecord) -> Result<(), StorageError> {
        self.shares.insert(share.id.clone(), share);
        Ok(())
    }

    async fn shares_for(&self, document_id: &str) -> Result<Vec<ShareRecord>, StorageError> {
        let mut rows: Vec<_> = self
            .shares
            .iter()
            .filter(|s| s.document_id == document_id)
            .map(|s| s.value().clone())
            .collect();
        rows.sort_by_key(|s| s.created_at);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BinaryRef, DocumentCategory, ExtractedFields};
    use chrono::Utc;

    fn doc(id: &str, owner: &str, category: DocumentCategory, tags: &[&str]) -> UploadedDocument {
        let now = Utc::now();
        UploadedDocument {
            id: id.into(),
            owner_id: owner.into(),
            name: format!("doc {id}"),
            category,
            binary: BinaryRef {
                path: format!("documents/{owner}/{id}/original.jpg"),
                content_type: "image/jpeg".into(),
                size: 1,
                url: String::new(),
            },
            thumbnail: None,
            raw_text: String::new(),
            extracted_fields: ExtractedFields::default(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            expiry_date: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn query_filters_owner_category_and_tag() {
        let store = MemoryDocumentStore::new();
        store.create(doc("1", "alice", DocumentCategory::Passport, &["travel"])).await.unwrap();
        store.create(doc("2", "alice", DocumentCategory::Visa, &["travel", "japan"])).await.unwrap();
        store.create(doc("3", "bob", DocumentCategory::Visa, &["japan"])).await.unwrap();

        let all = store.query(&DocumentQuery::owner("alice")).await.unwrap();
        assert_eq!(all.len(), 2);

        let visas = store
            .query(&DocumentQuery {
                category: Some(DocumentCategory::Visa),
                ..DocumentQuery::owner("alice")
            })
            .await
            .unwrap();
        assert_eq!(visas.len(), 1);
        assert_eq!(visas[0].id, "2");

        let japan = store
            .query(&DocumentQuery {
                tag: Some("japan".into()),
                ..DocumentQuery::owner("bob")
            })
            .await
            .unwrap();
        assert_eq!(japan.len(), 1);
        assert_eq!(japan[0].id, "3");
    }

    #[tokio::test]
    async fn create_rejects_duplicate_ids() {
        let store = MemoryDocumentStore::new();
        store.create(doc("1", "alice", DocumentCategory::Other, &[])).await.unwrap();
        assert!(store.create(doc("1", "alice", DocumentCategory::Other, &[])).await.is_err());
    }

    #[tokio::test]
    async fn update_and_delete_missing_are_not_found() {
        let store = MemoryDocumentStore::new();
        let missing = doc("x", "alice", DocumentCategory::Other, &[]);
        assert!(matches!(store.update(missing).await, Err(StorageError::NotFound { .. })));
        assert!(matches!(store.delete("x").await, Err(StorageError::NotFound { .. })));
    }
}
