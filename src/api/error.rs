//! HTTP mapping of [`VaultError`].

use crate::error::VaultError;
use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Error envelope.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Carried on every error response so [`attach_error_detail`] can rebuild
/// the body with the underlying error text.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub message: String,
    pub detail: String,
}

impl VaultError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            VaultError::MissingFile { .. }
            | VaultError::InvalidFileType { .. }
            | VaultError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            VaultError::FileTooLarge { .. } | VaultError::BodyTooLarge(_) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            VaultError::ProcessingFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            VaultError::NotFound { .. } | VaultError::Forbidden { .. } => StatusCode::NOT_FOUND,
            VaultError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            VaultError::Storage(_) | VaultError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show any caller. A document owned by someone else is
    /// indistinguishable from a missing one.
    pub fn user_message(&self) -> String {
        match self {
            VaultError::NotFound { .. } | VaultError::Forbidden { .. } => {
                "Document not found".to_string()
            }
            VaultError::Unauthenticated(_) => "Authentication required".to_string(),
            VaultError::Storage(_) | VaultError::Internal(_) => {
                "Internal server error".to_string()
            }
            VaultError::ProcessingFailed { .. } => "Failed to process document".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for VaultError {
    fn into_response(self) -> Response {
        match &self {
            VaultError::Storage(_) | VaultError::Internal(_) => {
                tracing::error!("Internal service error: {}", self);
            }
            VaultError::Unauthenticated(_) | VaultError::Forbidden { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            VaultError::ProcessingFailed { .. } => {
                tracing::warn!("Processing error: {}", self);
            }
            _ => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();
        let message = self.user_message();
        let body = ErrorBody {
            success: false,
            message: message.clone(),
            detail: None,
        };
        let mut response = (status, Json(body)).into_response();
        response.extensions_mut().insert(ErrorReport {
            message,
            detail: self.to_string(),
        });
        response
    }
}

/// Middleware that adds `detail` to error bodies. Installed only when
/// `expose_error_detail` is on.
pub async fn attach_error_detail(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    match response.extensions_mut().remove::<ErrorReport>() {
        Some(report) => {
            let body = ErrorBody {
                success: false,
                message: report.message,
                detail: Some(report.detail),
            };
            (response.status(), Json(body)).into_response()
        }
        None => response,
    }
}
