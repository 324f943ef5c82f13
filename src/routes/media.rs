/**
 * Media Routes
 * Uploads into local media storage, listing and deletion
 */
use axum::{
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiQuery, ApiResult};
use crate::routes::auth::verify_auth;
use crate::routes::SuccessResponse;
use crate::storage::{StoredFile, UploadKind};
use crate::AppState;

/// Multipart field carrying the file.
const FILE_FIELD: &str = "file";

/// Room for multipart boundaries and headers on top of the file itself.
pub const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Debug, Serialize)]
pub struct MediaListResponse {
    pub files: Vec<StoredFile>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteMediaQuery {
    pub name: String,
}

/// Body limit for an upload route of the given kind.
pub fn body_limit(kind: UploadKind) -> usize {
    kind.max_bytes() + MULTIPART_OVERHEAD
}

async fn receive_upload(state: &AppState, kind: UploadKind, mut multipart: Multipart) -> ApiResult<StoredFile> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;

        let stored = state
            .storage
            .upload(kind, file_name.as_deref(), content_type.as_deref(), &bytes)
            .await?;
        return Ok(stored);
    }
    Err(ApiError::bad_request("No file provided"))
}

/// GET /api/media
pub async fn list_media(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<MediaListResponse>> {
    verify_auth(&state.config.auth, &headers)?;
    let files = state.storage.list().await?;
    Ok(Json(MediaListResponse { files }))
}

/// POST /api/media
pub async fn upload_media(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<StoredFile>)> {
    verify_auth(&state.config.auth, &headers)?;
    let stored = receive_upload(&state, UploadKind::Media, multipart).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// DELETE /api/media?name=
pub async fn delete_media(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<DeleteMediaQuery>,
) -> ApiResult<Json<SuccessResponse>> {
    verify_auth(&state.config.auth, &headers)?;
    state.storage.delete(&query.name).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// POST /api/upload-image
pub async fn upload_content_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<StoredFile>)> {
    verify_auth(&state.config.auth, &headers)?;
    let stored = receive_upload(&state, UploadKind::ContentImage, multipart).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// POST /api/upload-background
pub async fn upload_background(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<StoredFile>)> {
    verify_auth(&state.config.auth, &headers)?;
    let stored = receive_upload(&state, UploadKind::Background, multipart).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}
