//! HTTP surface.
//!
//! Every route except `/healthz` requires `Authorization: Bearer <jwt>`. Success
//! responses are wrapped as `{ "success": true, "data": … }`, errors as
//! `{ "success": false, "message": … }`.

pub mod auth;
pub mod error;
pub mod handlers;

pub use auth::{Owner, TokenKeys};

use crate::vault::DocumentVault;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Headroom above the upload cap for multipart boundaries and text fields.
/// The cap itself is enforced while the file part streams in.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub vault: Arc<DocumentVault>,
    pub keys: Arc<TokenKeys>,
}

impl AppState {
    pub fn new(vault: DocumentVault, keys: TokenKeys) -> Self {
        Self {
            vault: Arc::new(vault),
            keys: Arc::new(keys),
        }
    }
}

/// Success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let config = state.vault.config();
    let body_limit = usize::try_from(config.max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);
    let expose_detail = config.expose_error_detail;

    let mut router = Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/documents", get(handlers::list_documents))
        .route(
            "/documents/upload",
            post(handlers::upload_document).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route(
            "/documents/scan",
            post(handlers::scan_document).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/documents/expiry-alerts", get(handlers::expiry_alerts))
        .route(
            "/documents/{id}",
            get(handlers::get_document)
                .put(handlers::update_document)
                .delete(handlers::delete_document),
        )
        .route("/documents/{id}/file", get(handlers::download_document))
        .route("/documents/{id}/share", post(handlers::share_document))
        .with_state(state);

    if expose_detail {
        router = router.layer(middleware::from_fn(error::attach_error_detail));
    }

    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
}
