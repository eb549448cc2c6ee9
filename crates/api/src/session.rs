//! Signed session cookie.

use axum_extra::extract::cookie::{Cookie, Key, SameSite};
use pollhub_common::{AppError, AppResult, config::SessionConfig};
use sha2::{Digest, Sha512};

/// Session cookie settings shared by the login flow and the session middleware.
#[derive(Clone)]
pub struct SessionSettings {
    key: Key,
    cookie_name: String,
    secure: bool,
}

impl SessionSettings {
    /// Derive the signing key from the configured secret.
    pub fn from_config(config: &SessionConfig) -> AppResult<Self> {
        Ok(Self {
            key: derive_key(&config.secret)?,
            cookie_name: config.cookie_name.clone(),
            secure: config.secure,
        })
    }

    /// Key used to sign and verify the cookie.
    #[must_use]
    pub const fn key(&self) -> &Key {
        &self.key
    }

    /// Name of the session cookie.
    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Cookie carrying the id of a freshly logged-in user.
    #[must_use]
    pub fn login_cookie(&self, user_id: String) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), user_id))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .build()
    }

    /// Removal cookie for logout.
    #[must_use]
    pub fn logout_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), "")).path("/").build()
    }
}

/// Signing keys need 64 bytes; SHA-512 stretches any secret to that size.
fn derive_key(secret: &str) -> AppResult<Key> {
    let digest = Sha512::digest(secret.as_bytes());
    Key::try_from(digest.as_slice())
        .map_err(|e| AppError::Config(format!("Invalid session key: {e}")))
}
