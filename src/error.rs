/*!
 * API Errors
 * One error type for every handler, rendered as `{ "error": ..., "details": ... }`
 */
use axum::{
    extract::{
        multipart::MultipartError,
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::content::{BlockError, HierarchyError};
use crate::storage::StorageError;

/// Error body shared by every endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("Database not available")]
    ServiceUnavailable,

    #[error("Database error")]
    Database(#[source] sqlx::Error),

    #[error("Storage error")]
    Storage(#[source] std::io::Error),

    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Database(_) | ApiError::Storage(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            ApiError::Database(e) => Some(e.to_string()),
            ApiError::Storage(e) => Some(e.to_string()),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let details = self.details();

        if status.is_server_error() {
            tracing::error!(status = %status, details = ?details, "{}", self);
        } else {
            tracing::debug!(status = %status, "{}", self);
        }

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
                details,
            }),
        )
            .into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => ApiError::not_found("Not found"),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ApiError::Conflict("Slug already exists".to_string())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                ApiError::not_found("Referenced record not found")
            }
            _ => ApiError::Database(e),
        }
    }
}

impl From<BlockError> for ApiError {
    fn from(e: BlockError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<HierarchyError> for ApiError {
    fn from(e: HierarchyError) -> Self {
        match e {
            HierarchyError::PageNotFound(_) | HierarchyError::ParentNotFound(_) => {
                ApiError::NotFound(e.to_string())
            }
            _ => ApiError::BadRequest(e.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::TooLarge { .. } => ApiError::PayloadTooLarge(e.to_string()),
            StorageError::NotFound => ApiError::NotFound(e.to_string()),
            StorageError::Io(io) => ApiError::Storage(io),
            StorageError::Empty | StorageError::NotAnImage | StorageError::InvalidName => {
                ApiError::BadRequest(e.to_string())
            }
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(e.body_text())
        } else {
            ApiError::BadRequest(e.body_text())
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(rejection.body_text())
        } else {
            ApiError::BadRequest(rejection.body_text())
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// `Json` whose rejection renders as an [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Path` whose rejection renders as an [`ApiError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// `Query` whose rejection renders as an [`ApiError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn body_of(err: ApiError) -> (StatusCode, ErrorResponse) {
        let res = err.into_response();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_bad_request_shape() {
        let (status, body) = body_of(ApiError::bad_request("Title is required")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Title is required");
        assert!(body.details.is_none());
    }

    #[tokio::test]
    async fn test_storage_error_carries_details() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only fs");
        let (status, body) = body_of(ApiError::Storage(io)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.details.as_deref(), Some("read-only fs"));
    }

    #[test]
    fn test_hierarchy_errors_map_to_status() {
        let id = Uuid::new_v4();
        assert_eq!(
            ApiError::from(HierarchyError::ParentNotFound(id)).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(HierarchyError::ParentIsNested(id)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(HierarchyError::SelfParent).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_storage_errors_map_to_status() {
        assert_eq!(
            ApiError::from(StorageError::TooLarge { limit_mb: 5 }).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::from(StorageError::NotAnImage).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(StorageError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_row_not_found_is_404() {
        assert_eq!(
            ApiError::from(sqlx::Error::RowNotFound).status(),
            StatusCode::NOT_FOUND
        );
    }
}
