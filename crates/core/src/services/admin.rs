//! Admin service.

use pollhub_common::AppResult;
use pollhub_db::{
    entities::{poll, user},
    repositories::{PollRepository, UserRepository},
};
use serde::Serialize;

/// Admin service for moderation operations.
#[derive(Clone)]
pub struct AdminService {
    user_repo: UserRepository,
    poll_repo: PollRepository,
}

/// Everything the admin panel lists.
#[derive(Debug, Clone, Serialize)]
pub struct AdminDashboard {
    pub polls: Vec<poll::Model>,
    /// Password hashes are never serialized.
    pub users: Vec<user::Model>,
}

/// Result of an admin deleting a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserDeletion {
    Deleted,
    /// The admin targeted their own account; nothing was deleted.
    RefusedSelf,
    NotFound,
}

impl AdminService {
    /// Create a new admin service.
    #[must_use]
    pub const fn new(user_repo: UserRepository, poll_repo: PollRepository) -> Self {
        Self {
            user_repo,
            poll_repo,
        }
    }

    /// Load the dashboard.
    pub async fn dashboard(&self) -> AppResult<AdminDashboard> {
        let polls = self.poll_repo.find_all().await?;
        let users = self.user_repo.find_all().await?;
        Ok(AdminDashboard { polls, users })
    }

    /// Delete a user along with their polls, comments and votes.
    pub async fn delete_user(&self, acting_id: &str, target_id: &str) -> AppResult<UserDeletion> {
        if acting_id == target_id {
            tracing::warn!(admin_id = %acting_id, "Refused admin self-deletion");
            return Ok(UserDeletion::RefusedSelf);
        }

        if self.user_repo.delete_with_votes(target_id).await? {
            tracing::info!(admin_id = %acting_id, user_id = %target_id, "Deleted user");
            Ok(UserDeletion::Deleted)
        } else {
            Ok(UserDeletion::NotFound)
        }
    }

    /// Delete a poll with its options, comments and votes.
    pub async fn delete_poll(&self, acting_id: &str, poll_id: &str) -> AppResult<bool> {
        let deleted = self.poll_repo.delete(poll_id).await?;
        if deleted {
            tracing::info!(admin_id = %acting_id, poll_id = %poll_id, "Deleted poll");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn service(db: Arc<sea_orm::DatabaseConnection>) -> AdminService {
        AdminService::new(UserRepository::new(Arc::clone(&db)), PollRepository::new(db))
    }

    #[tokio::test]
    async fn test_self_deletion_refused_without_db_access() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let outcome = service(Arc::clone(&db))
            .delete_user("admin1", "admin1")
            .await
            .unwrap();
        assert_eq!(outcome, UserDeletion::RefusedSelf);

        let log = Arc::into_inner(db).unwrap().into_transaction_log();
        assert!(log.is_empty());
    }

    fn target_user() -> user::Model {
        user::Model {
            id: "u2".to_string(),
            username: "bob".to_string(),
            username_lower: "bob".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            is_admin: false,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_delete_other_user() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[target_user()]])
                .append_exec_results([exec(2), exec(1)])
                .into_connection(),
        );

        let outcome = service(db).delete_user("admin1", "u2").await.unwrap();
        assert_eq!(outcome, UserDeletion::Deleted);
    }

    #[tokio::test]
    async fn test_delete_missing_user() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let outcome = service(db).delete_user("admin1", "ghost").await.unwrap();
        assert_eq!(outcome, UserDeletion::NotFound);
    }

    #[tokio::test]
    async fn test_dashboard() {
        let poll = poll::Model {
            id: "p1".to_string(),
            question: "Q?".to_string(),
            creator_id: "u1".to_string(),
            created_at: Utc::now().into(),
        };
        let user = user::Model {
            id: "u1".to_string(),
            username: "alice".to_string(),
            username_lower: "alice".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            is_admin: true,
            created_at: Utc::now().into(),
        };
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[poll]])
                .append_query_results([[user]])
                .into_connection(),
        );

        let dashboard = service(db).dashboard().await.unwrap();
        assert_eq!(dashboard.polls.len(), 1);
        assert_eq!(dashboard.users.len(), 1);

        let json = serde_json::to_string(&dashboard).unwrap();
        assert!(!json.contains("argon2"));
    }

    #[tokio::test]
    async fn test_delete_poll() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1), exec(0)])
                .into_connection(),
        );
        let service = service(db);

        assert!(service.delete_poll("admin1", "p1").await.unwrap());
        assert!(!service.delete_poll("admin1", "p1").await.unwrap());
    }
}
