//! Object storage abstraction for file uploads.
//!
//! Supports both local filesystem and S3-compatible object storage.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{StorageConfig, StorageKind};
use crate::{AppError, AppResult};

/// Uploaded file metadata.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Storage key (path or object key).
    pub key: String,
    /// Public URL to access the file.
    pub url: String,
    /// File size in bytes.
    pub size: u64,
    /// MIME content type.
    pub content_type: String,
    /// MD5 hash of the file.
    pub md5: String,
}

/// Storage backend trait.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Upload a file.
    async fn upload(&self, key: &str, data: &[u8], content_type: &str)
    -> AppResult<UploadedFile>;

    /// Get the public URL for a key.
    fn public_url(&self, key: &str) -> String;
}

/// Build the backend selected by configuration.
pub async fn build_storage(config: &StorageConfig) -> AppResult<Arc<dyn StorageBackend>> {
    match config.backend {
        StorageKind::Local => Ok(Arc::new(LocalStorage::new(
            config.local_path.clone(),
            config.public_url.clone(),
        ))),
        #[cfg(feature = "s3")]
        StorageKind::S3 => Ok(Arc::new(S3Storage::from_config(config).await?)),
        #[cfg(not(feature = "s3"))]
        StorageKind::S3 => Err(AppError::Config(
            "s3 storage requested but pollhub was built without the `s3` feature".to_string(),
        )),
    }
}

/// Local filesystem storage backend.
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new local storage backend.
    #[must_use]
    pub const fn new(base_path: PathBuf, base_url: String) -> Self {
        Self {
            base_path,
            base_url,
        }
    }
}

#[async_trait::async_trait]
impl StorageBackend for LocalStorage {
    async fn upload(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> AppResult<UploadedFile> {
        let path = self.base_path.join(key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create directory: {e}")))?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write file: {e}")))?;

        Ok(UploadedFile {
            key: key.to_string(),
            url: self.public_url(key),
            size: data.len() as u64,
            content_type: content_type.to_string(),
            md5: format!("{:x}", md5::compute(data)),
        })
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}

/// S3-compatible object storage backend.
#[cfg(feature = "s3")]
pub struct S3Storage {
    client: aws_sdk_s3::Client,
    bucket: String,
    region: String,
    public_url: Option<String>,
    prefix: Option<String>,
}

#[cfg(feature = "s3")]
impl S3Storage {
    /// Create an S3 backend using the default AWS credential chain.
    pub async fn from_config(config: &StorageConfig) -> AppResult<Self> {
        use aws_config::{BehaviorVersion, Region};

        let bucket = config
            .bucket
            .clone()
            .ok_or_else(|| AppError::Config("storage.bucket is not set".to_string()))?;
        let region = config
            .region
            .clone()
            .unwrap_or_else(|| "us-east-1".to_string());

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        // A relative local default ("/files") is meaningless for S3.
        let public_url = config
            .public_url
            .starts_with("http")
            .then(|| config.public_url.clone());

        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            bucket,
            region,
            public_url,
            prefix: config.prefix.clone(),
        })
    }

    fn full_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), key),
            None => key.to_string(),
        }
    }
}

#[cfg(feature = "s3")]
#[async_trait::async_trait]
impl StorageBackend for S3Storage {
    async fn upload(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> AppResult<UploadedFile> {
        use aws_sdk_s3::primitives::ByteStream;

        let full_key = self.full_key(key);
        let md5 = format!("{:x}", md5::compute(data));

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .body(ByteStream::from(data.to_vec()))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("S3 upload failed: {e}")))?;

        tracing::debug!(bucket = %self.bucket, key = %full_key, "Uploaded object");

        Ok(UploadedFile {
            key: key.to_string(),
            url: self.public_url(key),
            size: data.len() as u64,
            content_type: content_type.to_string(),
            md5,
        })
    }

    fn public_url(&self, key: &str) -> String {
        let full_key = self.full_key(key);
        match &self.public_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), full_key),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, full_key
            ),
        }
    }
}

/// Extensions kept on stored keys. Anything else is stored as `.bin` so that
/// markup and scripts are never served back with an active content type.
const PASSIVE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "avif", "txt", "csv", "pdf", "mp3", "ogg", "mp4", "webm",
    "zip",
];

/// Generate a unique storage key for a file.
#[must_use]
pub fn generate_storage_key(user_id: &str, original_name: &str) -> String {
    use chrono::Utc;

    let now = Utc::now();
    let date_path = now.format("%Y/%m/%d").to_string();
    let timestamp = now.timestamp_millis();

    let extension = original_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| PASSIVE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or_else(|| "bin".to_string());

    format!(
        "{}/{}/{}_{}.{}",
        date_path,
        user_id,
        timestamp,
        uuid::Uuid::new_v4(),
        extension
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_storage_key() {
        let key = generate_storage_key("user123", "photo.JPG");
        assert!(key.contains("/user123/"));
        assert!(key.ends_with(".jpg"));
    }

    #[test]
    fn test_generate_storage_key_no_extension() {
        let key = generate_storage_key("user123", "file");
        assert!(key.ends_with(".bin"));
    }

    #[test]
    fn test_generate_storage_key_rejects_path_in_extension() {
        let key = generate_storage_key("user123", "evil.x/../../etc");
        assert!(key.ends_with(".bin"));
    }

    #[test]
    fn test_generate_storage_key_neutralises_active_content() {
        for name in ["page.html", "icon.SVG", "app.js", "x.xhtml", "y.htm"] {
            let key = generate_storage_key("user123", name);
            assert!(key.ends_with(".bin"), "{name} stored as {key}");
        }
    }

    #[tokio::test]
    async fn test_local_upload() {
        let dir = std::env::temp_dir().join(format!("pollhub-storage-{}", uuid::Uuid::new_v4()));
        let storage = LocalStorage::new(dir.clone(), "/files/".to_string());

        let uploaded = storage
            .upload("2025/01/01/u1/a.txt", b"hello", "text/plain")
            .await
            .unwrap();
        assert_eq!(uploaded.size, 5);
        assert_eq!(uploaded.url, "/files/2025/01/01/u1/a.txt");
        assert_eq!(uploaded.md5, "5d41402abc4b2a76b9719d911017c592");
        assert!(dir.join("2025/01/01/u1/a.txt").exists());

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
