//! Records and request/response shapes shared by the vault, the stores and
//! the HTTP layer.
//!
//! Everything serialises with camelCase keys so the JSON matches what the
//! mobile client already consumes.

use crate::error::VaultError;
use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── Categories ───────────────────────────────────────────────────────────

/// Closed set of document kinds the vault understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentCategory {
    Passport,
    Visa,
    Insurance,
    Vaccination,
    #[default]
    Other,
}

impl DocumentCategory {
    pub const ALL: [DocumentCategory; 5] = [
        DocumentCategory::Passport,
        DocumentCategory::Visa,
        DocumentCategory::Insurance,
        DocumentCategory::Vaccination,
        DocumentCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentCategory::Passport => "passport",
            DocumentCategory::Visa => "visa",
            DocumentCategory::Insurance => "insurance",
            DocumentCategory::Vaccination => "vaccination",
            DocumentCategory::Other => "other",
        }
    }

    /// Human-readable label used for suggested document names.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentCategory::Passport => "Passport",
            DocumentCategory::Visa => "Visa",
            DocumentCategory::Insurance => "Insurance",
            DocumentCategory::Vaccination => "Vaccination",
            DocumentCategory::Other => "Document",
        }
    }

    /// Categories whose last printed date is taken as the expiry date.
    pub fn carries_expiry(&self) -> bool {
        matches!(
            self,
            DocumentCategory::Passport | DocumentCategory::Visa | DocumentCategory::Insurance
        )
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentCategory {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        DocumentCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| {
                VaultError::ValidationFailed(format!(
                    "unknown category '{s}', expected one of passport, visa, insurance, vaccination, other"
                ))
            })
    }
}

// ── Stored records ───────────────────────────────────────────────────────

/// Handle to an object written to object storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryRef {
    pub path: String,
    pub content_type: String,
    pub size: u64,
    pub url: String,
}

/// Structured fields pulled out of OCR text by [`crate::pipeline::fields`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
}

impl ExtractedFields {
    pub fn is_empty(&self) -> bool {
        self.document_number.is_none()
            && self.primary_name.is_none()
            && self.names.is_empty()
            && self.expiry_date.is_none()
    }
}

/// One stored travel document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedDocument {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub category: DocumentCategory,
    pub binary: BinaryRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<BinaryRef>,
    pub raw_text: String,
    pub extracted_fields: ExtractedFields,
    pub tags: Vec<String>,
    pub expiry_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reminder row written when a document has a known expiry date.
///
/// Nothing ever flips `is_sent`; the row is for a future consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryNotification {
    pub id: String,
    pub document_id: String,
    pub owner_id: String,
    pub expiry_date: NaiveDate,
    pub is_sent: bool,
    pub created_at: DateTime<Utc>,
}

/// Channels a document can be shared through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareMethod {
    Whatsapp,
    Email,
    Bluetooth,
    Copy,
}

impl ShareMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShareMethod::Whatsapp => "whatsapp",
            ShareMethod::Email => "email",
            ShareMethod::Bluetooth => "bluetooth",
            ShareMethod::Copy => "copy",
        }
    }
}

/// Audit row for a share. `expires_at` is recorded but never enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRecord {
    pub id: String,
    pub document_id: String,
    pub owner_id: String,
    pub method: ShareMethod,
    pub recipient: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

// ── Requests ─────────────────────────────────────────────────────────────

/// A file handed to the upload or scan pipeline.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Bytes,
}

impl IncomingFile {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Caller-supplied metadata accompanying an upload.
#[derive(Debug, Clone, Default)]
pub struct UploadMetadata {
    pub name: Option<String>,
    pub category: Option<DocumentCategory>,
    pub tags: Vec<String>,
    pub expiry_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Partial update of the mutable fields of a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DocumentPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<DocumentCategory>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Store-level filter: equality on owner and category, array-contains on tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentQuery {
    pub owner_id: String,
    pub category: Option<DocumentCategory>,
    pub tag: Option<String>,
}

impl DocumentQuery {
    pub fn owner(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            category: None,
            tag: None,
        }
    }

    pub fn matches(&self, doc: &UploadedDocument) -> bool {
        doc.owner_id == self.owner_id
            && self.category.is_none_or(|c| doc.category == c)
            && self
                .tag
                .as_ref()
                .is_none_or(|t| doc.tags.iter().any(|dt| dt == t))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Name,
    ExpiryDate,
    Category,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Options for listing an owner's documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub category: Option<DocumentCategory>,
    pub tag: Option<String>,
    pub search: Option<String>,
    pub sort_by: SortField,
    pub order: SortOrder,
}

// ── Responses ────────────────────────────────────────────────────────────

/// Body of a successful upload.
///
/// Carries the public URLs of the stored binaries, never the owner id or the
/// raw OCR text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub id: String,
    pub name: String,
    pub category: DocumentCategory,
    pub tags: Vec<String>,
    pub expiry_date: Option<NaiveDate>,
    pub file_url: String,
    pub thumbnail_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&UploadedDocument> for UploadResponse {
    fn from(doc: &UploadedDocument) -> Self {
        Self {
            id: doc.id.clone(),
            name: doc.name.clone(),
            category: doc.category,
            tags: doc.tags.clone(),
            expiry_date: doc.expiry_date,
            file_url: doc.binary.url.clone(),
            thumbnail_url: doc.thumbnail.as_ref().map(|t| t.url.clone()),
            created_at: doc.created_at,
        }
    }
}

/// A document expiring within the requested window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryAlert {
    #[serde(flatten)]
    pub document: UploadedDocument,
    pub days_until_expiry: i64,
    pub is_expired: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestions {
    pub name: String,
    pub tags: Vec<String>,
}

/// Result of a scan: OCR and field extraction without persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOutcome {
    pub ocr_text: String,
    pub detected_category: DocumentCategory,
    pub extracted_fields: ExtractedFields,
    pub suggestions: Suggestions,
}

/// What the client needs to finish a share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareOutcome {
    pub share_id: String,
    pub method: ShareMethod,
    /// `"ready"` when `link` is set, `"initiated"` for local transfers.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!(
            "Passport".parse::<DocumentCategory>().unwrap(),
            DocumentCategory::Passport
        );
        assert_eq!(
            " visa ".parse::<DocumentCategory>().unwrap(),
            DocumentCategory::Visa
        );
        assert!("driving-licence".parse::<DocumentCategory>().is_err());
    }

    #[test]
    fn extracted_fields_omit_absent_keys() {
        let fields = ExtractedFields {
            document_number: Some("A12345678".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&fields).unwrap();
        assert_eq!(json, serde_json::json!({ "documentNumber": "A12345678" }));
    }

    #[test]
    fn patch_rejects_unknown_fields() {
        let err = serde_json::from_str::<DocumentPatch>(r#"{"ownerId":"someone-else"}"#);
        assert!(err.is_err());

        let patch: DocumentPatch =
            serde_json::from_str(r#"{"name":"Old passport","expiryDate":"2030-01-31"}"#).unwrap();
        assert_eq!(patch.name.as_deref(), Some("Old passport"));
        assert_eq!(patch.expiry_date, NaiveDate::from_ymd_opt(2030, 1, 31));
    }

    #[test]
    fn upload_response_exposes_urls_not_internals() {
        let binary = BinaryRef {
            path: "documents/alice/doc-1/original.jpg".into(),
            content_type: "image/jpeg".into(),
            size: 10,
            url: "/files/documents/alice/doc-1/original.jpg".into(),
        };
        let doc = UploadedDocument {
            id: "doc-1".into(),
            owner_id: "alice".into(),
            name: "Passport".into(),
            category: DocumentCategory::Passport,
            binary: binary.clone(),
            thumbnail: None,
            raw_text: "PASSPORT".into(),
            extracted_fields: ExtractedFields::default(),
            tags: vec!["travel".into()],
            expiry_date: NaiveDate::from_ymd_opt(2030, 1, 31),
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(UploadResponse::from(&doc)).unwrap();
        assert_eq!(json["fileUrl"], binary.url.as_str());
        assert!(json["thumbnailUrl"].is_null());
        assert_eq!(json["expiryDate"], "2030-01-31");
        assert!(json.get("ownerId").is_none());
        assert!(json.get("rawText").is_none());
    }

    #[test]
    fn sort_field_uses_camel_case() {
        let f: SortField = serde_json::from_str(r#""expiryDate""#).unwrap();
        assert_eq!(f, SortField::ExpiryDate);
    }
}
