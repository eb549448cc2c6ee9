//! File upload endpoint.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
};
use pollhub_common::{AppError, AppResult};
use serde::Serialize;

use crate::{extractors::AuthUser, middleware::AppState};

/// Multipart framing allowance on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub key: String,
    pub url: String,
    pub size: u64,
    pub content_type: String,
}

async fn upload(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {e}")))?;

        let uploaded = state
            .upload_service
            .upload(&user.id, &file_name, content_type.as_deref(), &data)
            .await?;

        return Ok(Json(UploadResponse {
            key: uploaded.key,
            url: uploaded.url,
            size: uploaded.size,
            content_type: uploaded.content_type,
        }));
    }

    Err(AppError::BadRequest("Missing file field".to_string()))
}

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload))
        .layer(DefaultBodyLimit::max(max_upload_bytes + MULTIPART_OVERHEAD))
}
