//! User service.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use pollhub_common::{AppError, AppResult, IdGenerator};
use pollhub_db::{
    entities::user,
    repositories::{UserRepository, user::new_user},
};
use serde::Deserialize;
use std::sync::LazyLock;
use validator::Validate;

/// Message returned when a username is already registered.
pub const USERNAME_TAKEN: &str = "Username already exists. Please choose another.";

/// Message returned for any failed login.
pub const INVALID_CREDENTIALS: &str = "Invalid username or password.";

/// Checked on logins for unknown usernames so they cost the same argon2 run
/// as a wrong password.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("pollhub-no-such-user").ok());

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

/// Input for registering a new account.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 1, max = 128))]
    pub username: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self {
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new account. Returns the new user's id.
    ///
    /// The unique index on the lowercased username decides whether the name
    /// is free; a lost race yields the same conflict as a plain duplicate.
    pub async fn register(&self, mut input: RegisterInput) -> AppResult<String> {
        input.username = input.username.trim().to_string();
        input.validate()?;

        let password_hash = hash_password(&input.password)?;
        let user_id = self.id_gen.generate();

        let inserted = self
            .user_repo
            .insert_if_absent(new_user(user_id.clone(), &input.username, password_hash))
            .await?;

        if !inserted {
            tracing::debug!(username = %input.username, "Registration rejected: username taken");
            return Err(AppError::Conflict(USERNAME_TAKEN.to_string()));
        }

        tracing::info!(user_id = %user_id, username = %input.username, "Registered user");
        Ok(user_id)
    }

    /// Authenticate a user by username and password.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<user::Model> {
        let Some(user) = self.user_repo.find_by_username(username.trim()).await? else {
            if let Some(hash) = DUMMY_HASH.as_deref() {
                let _ = verify_password(password, hash);
            }
            tracing::info!(username = %username, "Login failed: unknown user");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        if !verify_password(password, &user.password_hash)? {
            tracing::info!(user_id = %user.id, "Login failed: wrong password");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        Ok(user)
    }

    /// Find a user by ID.
    pub async fn find(&self, id: &str) -> AppResult<Option<user::Model>> {
        self.user_repo.find_by_id(id).await
    }

    /// Grant admin to the configured usernames that exist.
    pub async fn promote_admins(&self, usernames: &[String]) -> AppResult<u64> {
        let promoted = self.user_repo.grant_admin(usernames).await?;
        if promoted > 0 {
            tracing::info!(count = promoted, "Promoted configured admins");
        }
        Ok(promoted)
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
