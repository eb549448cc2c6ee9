//! Upload service.

use std::sync::Arc;

use pollhub_common::{AppError, AppResult, StorageBackend, UploadedFile, generate_storage_key};

/// Stores user uploads in the configured backend.
#[derive(Clone)]
pub struct UploadService {
    storage: Arc<dyn StorageBackend>,
    max_bytes: usize,
}

impl UploadService {
    /// Create a new upload service.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>, max_bytes: usize) -> Self {
        Self { storage, max_bytes }
    }

    /// Largest accepted upload in bytes.
    #[must_use]
    pub const fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Store a file on behalf of a user.
    pub async fn upload(
        &self,
        user_id: &str,
        file_name: &str,
        content_type: Option<&str>,
        data: &[u8],
    ) -> AppResult<UploadedFile> {
        if data.is_empty() {
            return Err(AppError::BadRequest("File is empty".to_string()));
        }
        if data.len() > self.max_bytes {
            return Err(AppError::BadRequest(format!(
                "File exceeds the {} byte upload limit",
                self.max_bytes
            )));
        }

        let key = generate_storage_key(user_id, file_name);
        let content_type = content_type.unwrap_or("application/octet-stream");
        let uploaded = self.storage.upload(&key, data, content_type).await?;

        tracing::info!(user_id = %user_id, key = %uploaded.key, size = uploaded.size, "Stored upload");
        Ok(uploaded)
    }
}
