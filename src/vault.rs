//! The document vault service.
//!
//! [`DocumentVault`] owns the collaborators (object store, document store,
//! recognizer, OCR cache) and runs the upload pipeline:
//!
//! ```text
//! validate ─▶ normalize ─▶ OCR ─▶ parse ─▶ put binary ─▶ create record ─▶ notify
//! ```
//!
//! Every other operation is owner-scoped: a document belonging to someone
//! else is [`VaultError::Forbidden`], which the HTTP layer reports exactly
//! like a missing one.

use crate::cache::OcrCache;
use crate::config::VaultConfig;
use crate::error::VaultError;
use crate::model::{
    DocumentCategory, DocumentPatch, DocumentQuery, ExpiryAlert, IncomingFile, ListOptions,
    ScanOutcome, ShareMethod, ShareOutcome, ShareRecord, SortField, SortOrder, UploadMetadata,
    UploadedDocument,
};
use crate::notify;
use crate::pipeline::{fields, ingress, normalize, ocr};
use crate::pipeline::ocr::{DisabledRecognizer, TextRecognizer, VisionRecognizer};
use crate::share;
use crate::storage::{self, DocumentStore, ObjectStore};
use bytes::Bytes;
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Name given to an upload with neither a caller-supplied name nor a file name.
pub const UNTITLED: &str = "Untitled document";

/// Default look-ahead window for expiry alerts, in days.
pub const DEFAULT_ALERT_DAYS: i64 = 30;

/// The vault: upload pipeline plus owner-scoped record operations.
pub struct DocumentVault {
    config: VaultConfig,
    objects: Arc<dyn ObjectStore>,
    documents: Arc<dyn DocumentStore>,
    recognizer: Arc<dyn TextRecognizer>,
    ocr_cache: OcrCache,
}

impl DocumentVault {
    /// Build a vault. The recognizer is a [`VisionRecognizer`] when OCR is
    /// enabled and a [`DisabledRecognizer`] otherwise.
    pub fn new(
        config: VaultConfig,
        objects: Arc<dyn ObjectStore>,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        let recognizer: Arc<dyn TextRecognizer> = if config.ocr_enabled {
            Arc::new(VisionRecognizer::new(config.clone()))
        } else {
            Arc::new(DisabledRecognizer)
        };
        let ocr_cache = OcrCache::new(
            config.cache_capacity,
            Duration::from_secs(config.cache_ttl_secs),
        );
        Self {
            config,
            objects,
            documents,
            recognizer,
            ocr_cache,
        }
    }

    /// Replace the OCR engine.
    pub fn with_recognizer(mut self, recognizer: Arc<dyn TextRecognizer>) -> Self {
        self.recognizer = recognizer;
        self
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn documents(&self) -> &Arc<dyn DocumentStore> {
        &self.documents
    }

    pub fn objects(&self) -> &Arc<dyn ObjectStore> {
        &self.objects
    }

    // ── Upload & scan ─────────────────────────────────────────────────────

    /// Run the full upload pipeline and persist the result.
    ///
    /// Nothing is written unless validation and normalisation succeed. OCR
    /// failure only empties `raw_text`. If the record write fails after the
    /// binary was stored, the binary is left behind.
    pub async fn upload(
        &self,
        owner_id: &str,
        file: IncomingFile,
        meta: UploadMetadata,
    ) -> Result<UploadedDocument, VaultError> {
        let start = Instant::now();
        let kind = ingress::validate_upload(
            &file.content_type,
            file.size(),
            self.config.max_upload_bytes,
        )?;

        let normalized =
            normalize::normalize(file.bytes, kind, self.config.normalize_limits()).await?;
        let raw_text =
            ocr::extract_text(self.recognizer.as_ref(), &self.ocr_cache, &normalized).await;

        let category = meta.category.unwrap_or_default();
        let extracted_fields = fields::parse_fields(&raw_text, category);

        let id = Uuid::new_v4().to_string();
        let binary_path =
            storage::original_path(owner_id, &id, extension_for(normalized.content_type));
        let binary = self
            .objects
            .put(&binary_path, normalized.bytes, normalized.content_type)
            .await?;
        let thumbnail = match normalized.thumbnail {
            Some(thumb) => Some(
                self.objects
                    .put(
                        &storage::thumbnail_path(owner_id, &id),
                        thumb,
                        ingress::IMAGE_JPEG,
                    )
                    .await?,
            ),
            None => None,
        };

        let name = non_empty(meta.name)
            .or_else(|| non_empty(file.file_name))
            .unwrap_or_else(|| UNTITLED.to_string());
        let now = Utc::now();
        let document = UploadedDocument {
            id,
            owner_id: owner_id.to_string(),
            name,
            category,
            binary,
            thumbnail,
            expiry_date: meta.expiry_date.or(extracted_fields.expiry_date),
            raw_text,
            extracted_fields,
            tags: normalize_tags(meta.tags),
            notes: non_empty(meta.notes),
            created_at: now,
            updated_at: now,
        };
        let document = self.documents.create(document).await?;
        notify::schedule_expiry_reminder(self.documents.as_ref(), &document).await?;

        info!(
            document_id = %document.id,
            owner_id,
            category = %document.category,
            bytes = document.binary.size,
            text_chars = document.raw_text.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Stored document"
        );
        Ok(document)
    }

    /// Run validation, normalisation, OCR and field parsing without
    /// persisting anything.
    ///
    /// The category is `category_hint` when given, else detected from the text.
    pub async fn scan(
        &self,
        file: IncomingFile,
        category_hint: Option<DocumentCategory>,
    ) -> Result<ScanOutcome, VaultError> {
        let kind = ingress::validate_upload(
            &file.content_type,
            file.size(),
            self.config.max_upload_bytes,
        )?;
        let normalized =
            normalize::normalize(file.bytes, kind, self.config.normalize_limits()).await?;
        let ocr_text =
            ocr::extract_text(self.recognizer.as_ref(), &self.ocr_cache, &normalized).await;

        let detected_category =
            category_hint.unwrap_or_else(|| fields::detect_category(&ocr_text));
        let extracted_fields = fields::parse_fields(&ocr_text, detected_category);
        let suggestions = fields::suggest(detected_category, &extracted_fields);

        debug!(
            category = %detected_category,
            text_chars = ocr_text.len(),
            "Scanned document"
        );
        Ok(ScanOutcome {
            ocr_text,
            detected_category,
            extracted_fields,
            suggestions,
        })
    }

    // ── Retrieval ─────────────────────────────────────────────────────────

    /// The owner's documents, filtered, searched and sorted.
    pub async fn list(
        &self,
        owner_id: &str,
        options: &ListOptions,
    ) -> Result<Vec<UploadedDocument>, VaultError> {
        let query = DocumentQuery {
            category: options.category,
            tag: options.tag.clone(),
            ..DocumentQuery::owner(owner_id)
        };
        let mut docs = self.documents.query(&query).await?;

        if let Some(needle) = options
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            let needle = needle.to_lowercase();
            docs.retain(|d| matches_search(d, &needle));
        }

        sort_documents(&mut docs, options.sort_by, options.order);
        Ok(docs)
    }

    /// One document, if the caller owns it.
    pub async fn get(&self, owner_id: &str, id: &str) -> Result<UploadedDocument, VaultError> {
        let doc = self
            .documents
            .get(id)
            .await?
            .ok_or_else(|| VaultError::NotFound { id: id.to_string() })?;
        if doc.owner_id != owner_id {
            warn!(document_id = id, owner_id, "Rejected access to another owner's document");
            return Err(VaultError::Forbidden { id: id.to_string() });
        }
        Ok(doc)
    }

    /// The stored binary of a document together with its record.
    pub async fn download(
        &self,
        owner_id: &str,
        id: &str,
    ) -> Result<(UploadedDocument, Bytes), VaultError> {
        let doc = self.get(owner_id, id).await?;
        let bytes = self.objects.get(&doc.binary.path).await?;
        Ok((doc, bytes))
    }

    /// Documents whose expiry date lies `0..=days` days after `today`,
    /// soonest first.
    pub async fn expiry_alerts(
        &self,
        owner_id: &str,
        days: i64,
        today: NaiveDate,
    ) -> Result<Vec<ExpiryAlert>, VaultError> {
        if days < 0 {
            return Err(VaultError::ValidationFailed(format!(
                "days must not be negative, got {days}"
            )));
        }

        let docs = self.documents.query(&DocumentQuery::owner(owner_id)).await?;
        let mut alerts: Vec<ExpiryAlert> = docs
            .into_iter()
            .filter_map(|document| {
                let remaining = (document.expiry_date? - today).num_days();
                (0..=days).contains(&remaining).then_some(ExpiryAlert {
                    document,
                    days_until_expiry: remaining,
                    is_expired: remaining < 0,
                })
            })
            .collect();
        alerts.sort_by(|a, b| {
            a.days_until_expiry
                .cmp(&b.days_until_expiry)
                .then_with(|| a.document.name.cmp(&b.document.name))
        });
        Ok(alerts)
    }

    // ── Mutation ──────────────────────────────────────────────────────────

    /// Apply a partial update. A changed expiry date schedules a new reminder.
    pub async fn update(
        &self,
        owner_id: &str,
        id: &str,
        patch: DocumentPatch,
    ) -> Result<UploadedDocument, VaultError> {
        let mut doc = self.get(owner_id, id).await?;
        let previous_expiry = doc.expiry_date;

        if let Some(name) = patch.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(VaultError::ValidationFailed(
                    "name must not be empty".into(),
                ));
            }
            doc.name = name.to_string();
        }
        if let Some(category) = patch.category {
            doc.category = category;
        }
        if let Some(tags) = patch.tags {
            doc.tags = normalize_tags(tags);
        }
        if let Some(expiry) = patch.expiry_date {
            doc.expiry_date = Some(expiry);
        }
        if let Some(notes) = patch.notes {
            doc.notes = non_empty(Some(notes));
        }
        doc.updated_at = Utc::now();

        let doc = self.documents.update(doc).await?;
        if doc.expiry_date != previous_expiry {
            notify::schedule_expiry_reminder(self.documents.as_ref(), &doc).await?;
        }

        info!(document_id = id, owner_id, "Updated document");
        Ok(doc)
    }

    /// Delete a document. Binary cleanup is best-effort; the record is
    /// always removed once ownership is established.
    pub async fn delete(&self, owner_id: &str, id: &str) -> Result<(), VaultError> {
        let doc = self.get(owner_id, id).await?;

        let paths = std::iter::once(&doc.binary).chain(doc.thumbnail.as_ref());
        for binary in paths {
            if let Err(e) = self.objects.delete(&binary.path).await {
                warn!(
                    document_id = id,
                    path = %binary.path,
                    error = %e,
                    "Failed to delete stored binary, continuing"
                );
            }
        }

        self.documents.delete(id).await?;
        info!(document_id = id, owner_id, "Deleted document");
        Ok(())
    }

    /// Prepare a share and record it for audit.
    pub async fn share(
        &self,
        owner_id: &str,
        id: &str,
        method: ShareMethod,
        recipient: Option<String>,
    ) -> Result<ShareOutcome, VaultError> {
        let doc = self.get(owner_id, id).await?;
        let payload = share::build_payload(method, recipient.as_deref(), &doc);

        let now = Utc::now();
        let record = ShareRecord {
            id: Uuid::new_v4().to_string(),
            document_id: doc.id.clone(),
            owner_id: owner_id.to_string(),
            method,
            recipient: non_empty(recipient),
            created_at: now,
            expires_at: now + ChronoDuration::days(self.config.share_expiry_days),
        };
        self.documents.put_share(record.clone()).await?;

        info!(
            document_id = id,
            owner_id,
            method = method.as_str(),
            "Shared document"
        );
        Ok(ShareOutcome {
            share_id: record.id,
            method,
            status: payload.status.to_string(),
            link: payload.link,
            expires_at: record.expires_at,
        })
    }
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        ingress::APPLICATION_PDF => "pdf",
        ingress::IMAGE_PNG => "png",
        _ => "jpg",
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trim, drop empties and de-duplicate, keeping first occurrences in order.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

fn matches_search(doc: &UploadedDocument, needle: &str) -> bool {
    doc.name.to_lowercase().contains(needle)
        || doc
            .notes
            .as_deref()
            .is_some_and(|n| n.to_lowercase().contains(needle))
        || doc.tags.iter().any(|t| t.to_lowercase().contains(needle))
}

fn sort_documents(docs: &mut [UploadedDocument], field: SortField, order: SortOrder) {
    let directed = |ord: Ordering| match order {
        SortOrder::Asc => ord,
        SortOrder::Desc => ord.reverse(),
    };
    docs.sort_by(|a, b| match field {
        // Undated documents go last in both directions.
        SortField::ExpiryDate => match (a.expiry_date, b.expiry_date) {
            (Some(x), Some(y)) => directed(x.cmp(&y)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortField::CreatedAt => directed(a.created_at.cmp(&b.created_at)),
        SortField::UpdatedAt => directed(a.updated_at.cmp(&b.updated_at)),
        SortField::Name => directed(a.name.to_lowercase().cmp(&b.name.to_lowercase())),
        SortField::Category => directed(a.category.as_str().cmp(b.category.as_str())),
    });
}
