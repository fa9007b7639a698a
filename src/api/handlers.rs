//! Route handlers.

use super::{ApiResponse, AppState, Owner};
use crate::error::VaultError;
use crate::model::{
    DocumentCategory, DocumentPatch, ExpiryAlert, IncomingFile, ListOptions, ScanOutcome,
    ShareMethod, ShareOutcome, SortField, SortOrder, UploadMetadata, UploadResponse,
    UploadedDocument,
};
use crate::pipeline::ingress;
use crate::vault::DEFAULT_ALERT_DAYS;
use axum::{
    extract::{
        multipart::{Multipart, MultipartError, MultipartRejection},
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::BytesMut;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Multipart field carrying the file on upload.
pub const UPLOAD_FILE_FIELD: &str = "document";
/// Multipart field carrying the file on scan.
pub const SCAN_FILE_FIELD: &str = "image";

type ApiResult<T> = Result<Json<ApiResponse<T>>, VaultError>;

pub async fn healthz() -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::new(serde_json::json!({ "status": "ok" })))
}

// ── Multipart ─────────────────────────────────────────────────────────────

struct Form {
    file: Option<IncomingFile>,
    fields: HashMap<String, String>,
}

impl Form {
    fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}

fn multipart_rejection(rejection: MultipartRejection) -> VaultError {
    VaultError::ValidationFailed(rejection.body_text())
}

/// A body that tripped the route limit is a 413; anything else is malformed.
fn multipart_error(context: &str, e: MultipartError) -> VaultError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        VaultError::BodyTooLarge(e.body_text())
    } else {
        VaultError::ValidationFailed(format!("{context}: {}", e.body_text()))
    }
}

/// Read a multipart body, streaming the file part and aborting as soon as it
/// exceeds `max_bytes`.
async fn read_form(
    multipart: Result<Multipart, MultipartRejection>,
    file_field: &'static str,
    max_bytes: u64,
) -> Result<Form, VaultError> {
    let mut multipart = multipart.map_err(multipart_rejection)?;
    let mut form = Form {
        file: None,
        fields: HashMap::new(),
    };

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Failed to parse multipart data", e))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == file_field {
            let file_name = field.file_name().map(str::to_string);
            let content_type = field
                .content_type()
                .map(str::to_string)
                .unwrap_or_else(|| ingress::guess_content_type(file_name.as_deref()));

            let mut buf = BytesMut::new();
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|e| multipart_error("Failed to read file chunk", e))?
            {
                buf.extend_from_slice(&chunk);
                let size = buf.len() as u64;
                if size > max_bytes {
                    tracing::warn!(
                        size,
                        max_bytes,
                        "File size limit exceeded, aborting upload"
                    );
                    return Err(VaultError::FileTooLarge {
                        size,
                        limit: max_bytes,
                    });
                }
            }

            tracing::debug!(
                file_name = ?file_name,
                content_type = %content_type,
                size = buf.len(),
                "Received file part"
            );
            form.file = Some(IncomingFile {
                file_name,
                content_type,
                bytes: buf.freeze(),
            });
        } else if !name.is_empty() {
            let value = field
                .text()
                .await
                .map_err(|e| multipart_error(&format!("Failed to read field '{name}'"), e))?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

/// `tags` accepts a JSON array (`["a","b"]`) or a comma-separated list (`a, b`).
pub fn parse_tags(raw: &str) -> Result<Vec<String>, VaultError> {
    let raw = raw.trim();
    if raw.starts_with('[') {
        serde_json::from_str::<Vec<String>>(raw)
            .map_err(|e| VaultError::ValidationFailed(format!("tags must be a list of strings: {e}")))
    } else {
        Ok(raw.split(',').map(|t| t.trim().to_string()).collect())
    }
}

pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, VaultError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        VaultError::ValidationFailed(format!("{field} must be a date in YYYY-MM-DD format"))
    })
}

fn upload_metadata(form: &Form) -> Result<UploadMetadata, VaultError> {
    Ok(UploadMetadata {
        name: form.text("name").map(str::to_string),
        category: form
            .text("category")
            .map(str::parse::<DocumentCategory>)
            .transpose()?,
        tags: form.text("tags").map(parse_tags).transpose()?.unwrap_or_default(),
        expiry_date: form
            .text("expiryDate")
            .map(|d| parse_date("expiryDate", d))
            .transpose()?,
        notes: form.text("notes").map(str::to_string),
    })
}

// ── Upload & scan ─────────────────────────────────────────────────────────

pub async fn upload_document(
    State(state): State<AppState>,
    owner: Owner,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<ApiResponse<UploadResponse>>), VaultError> {
    let max_bytes = state.vault.config().max_upload_bytes;
    let mut form = read_form(multipart, UPLOAD_FILE_FIELD, max_bytes).await?;
    let meta = upload_metadata(&form)?;
    let file = form.file.take().ok_or(VaultError::MissingFile {
        field: UPLOAD_FILE_FIELD,
    })?;

    let document = state.vault.upload(owner.id(), file, meta).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(UploadResponse::from(&document))),
    ))
}

pub async fn scan_document(
    State(state): State<AppState>,
    _owner: Owner,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<ScanOutcome> {
    let max_bytes = state.vault.config().max_upload_bytes;
    let mut form = read_form(multipart, SCAN_FILE_FIELD, max_bytes).await?;
    let hint = form
        .text("category")
        .map(str::parse::<DocumentCategory>)
        .transpose()?;
    let file = form.file.take().ok_or(VaultError::MissingFile {
        field: SCAN_FILE_FIELD,
    })?;

    let outcome = state.vault.scan(file, hint).await?;
    Ok(Json(ApiResponse::new(outcome)))
}

// ── Retrieval ─────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    #[serde(rename = "type")]
    pub category: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<SortField>,
    pub sort_order: Option<SortOrder>,
}

impl ListParams {
    fn into_options(self) -> Result<ListOptions, VaultError> {
        let category = self
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::parse::<DocumentCategory>)
            .transpose()?;
        Ok(ListOptions {
            category,
            tag: self.tag.filter(|t| !t.trim().is_empty()),
            search: self.search,
            sort_by: self.sort_by.unwrap_or_default(),
            order: self.sort_order.unwrap_or_default(),
        })
    }
}

fn query_error(rejection: QueryRejection) -> VaultError {
    VaultError::ValidationFailed(rejection.body_text())
}

fn json_error(rejection: JsonRejection) -> VaultError {
    VaultError::ValidationFailed(rejection.body_text())
}

pub async fn list_documents(
    State(state): State<AppState>,
    owner: Owner,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Vec<UploadedDocument>> {
    let Query(params) = params.map_err(query_error)?;
    let docs = state
        .vault
        .list(owner.id(), &params.into_options()?)
        .await?;
    Ok(Json(ApiResponse::new(docs)))
}

#[derive(Debug, Default, Deserialize)]
pub struct AlertParams {
    pub days: Option<i64>,
}

pub async fn expiry_alerts(
    State(state): State<AppState>,
    owner: Owner,
    params: Result<Query<AlertParams>, QueryRejection>,
) -> ApiResult<Vec<ExpiryAlert>> {
    let Query(params) = params.map_err(query_error)?;
    let days = params.days.unwrap_or(DEFAULT_ALERT_DAYS);
    let today = Utc::now().date_naive();
    let alerts = state.vault.expiry_alerts(owner.id(), days, today).await?;
    Ok(Json(ApiResponse::new(alerts)))
}

pub async fn get_document(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<String>,
) -> ApiResult<UploadedDocument> {
    let doc = state.vault.get(owner.id(), &id).await?;
    Ok(Json(ApiResponse::new(doc)))
}

pub async fn download_document(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<String>,
) -> Result<Response, VaultError> {
    let (doc, bytes) = state.vault.download(owner.id(), &id).await?;
    Ok(([(header::CONTENT_TYPE, doc.binary.content_type)], bytes).into_response())
}

// ── Mutation ──────────────────────────────────────────────────────────────

pub async fn update_document(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<String>,
    body: Result<Json<DocumentPatch>, JsonRejection>,
) -> ApiResult<UploadedDocument> {
    let Json(patch) = body.map_err(json_error)?;
    let doc = state.vault.update(owner.id(), &id, patch).await?;
    Ok(Json(ApiResponse::new(doc)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deleted {
    pub id: String,
    pub deleted: bool,
}

pub async fn delete_document(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    state.vault.delete(owner.id(), &id).await?;
    Ok(Json(ApiResponse::new(Deleted { id, deleted: true })))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShareRequest {
    pub method: ShareMethod,
    #[serde(default)]
    pub recipient: Option<String>,
}

pub async fn share_document(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<String>,
    body: Result<Json<ShareRequest>, JsonRejection>,
) -> ApiResult<ShareOutcome> {
    let Json(request) = body.map_err(json_error)?;
    let outcome = state
        .vault
        .share(owner.id(), &id, request.method, request.recipient)
        .await?;
    Ok(Json(ApiResponse::new(outcome)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_accept_json_or_csv() {
        assert_eq!(parse_tags(r#"["travel","japan"]"#).unwrap(), vec!["travel", "japan"]);
        assert_eq!(parse_tags("travel, japan ,").unwrap(), vec!["travel", "japan", ""]);
        assert!(parse_tags("[1, 2]").is_err());
    }

    #[test]
    fn dates_are_iso() {
        assert_eq!(
            parse_date("expiryDate", "2030-02-28").unwrap(),
            NaiveDate::from_ymd_opt(2030, 2, 28).unwrap()
        );
        assert!(parse_date("expiryDate", "28/02/2030").is_err());
    }

    #[test]
    fn list_params_reject_unknown_category() {
        let params = ListParams {
            category: Some("boarding-pass".into()),
            ..Default::default()
        };
        assert!(params.into_options().is_err());
    }
}
