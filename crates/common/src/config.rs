//! Application configuration.

use serde::Deserialize;
use std::path::PathBuf;

/// Minimum length of the session secret, in bytes.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Session cookie configuration.
    pub session: SessionConfig,
    /// Upload storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Administrator bootstrap configuration.
    #[serde(default)]
    pub admin: AdminConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Secret used to sign session cookies.
    pub secret: String,
    /// Name of the session cookie.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Only send the cookie over HTTPS.
    #[serde(default)]
    pub secure: bool,
}

/// Which storage backend receives uploads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Local filesystem.
    #[default]
    Local,
    /// S3-compatible object storage.
    S3,
}

/// Upload storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Backend selection.
    #[serde(default)]
    pub backend: StorageKind,
    /// Base path for locally stored files.
    #[serde(default = "default_local_path")]
    pub local_path: PathBuf,
    /// Public URL prefix for serving files.
    #[serde(default = "default_public_url")]
    pub public_url: String,
    /// S3 bucket name.
    #[serde(default)]
    pub bucket: Option<String>,
    /// S3 region.
    #[serde(default)]
    pub region: Option<String>,
    /// Custom S3 endpoint (`MinIO` etc.). AWS is used when unset.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Key prefix within the bucket.
    #[serde(default)]
    pub prefix: Option<String>,
    /// Largest accepted upload.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageKind::Local,
            local_path: default_local_path(),
            public_url: default_public_url(),
            bucket: None,
            region: None,
            endpoint: None,
            prefix: None,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Administrator bootstrap configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminConfig {
    /// Usernames granted the admin flag at startup.
    #[serde(default)]
    pub usernames: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

fn default_cookie_name() -> String {
    "pollhub_session".to_string()
}

fn default_local_path() -> PathBuf {
    PathBuf::from("./files")
}

fn default_public_url() -> String {
    "/files".to_string()
}

const fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

/// `POLLHUB_SECTION__KEY` variables, e.g. `POLLHUB_SESSION__SECRET`.
fn environment() -> config::Environment {
    config::Environment::with_prefix("POLLHUB")
        .prefix_separator("_")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("admin.usernames")
        .try_parsing(true)
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `POLLHUB_ENV`)
    /// 4. Environment variables with `POLLHUB_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        // A missing .env file is normal outside development.
        let _ = dotenvy::dotenv();

        let env = std::env::var("POLLHUB_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(environment())
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.session.secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(config::ConfigError::Message(format!(
                "session.secret must be at least {MIN_SESSION_SECRET_LEN} bytes"
            )));
        }
        if self.storage.backend == StorageKind::S3 && self.storage.bucket.is_none() {
            return Err(config::ConfigError::Message(
                "storage.bucket is required for the s3 backend".to_string(),
            ));
        }
        Ok(())
    }
}
