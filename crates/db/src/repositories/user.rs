//! User repository.

use std::sync::Arc;

use crate::entities::{PollOption, PollVote, User, poll_option, poll_vote, user};
use crate::{db_error, is_unique_conflict};
use pollhub_common::AppResult;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
    sea_query::{Expr, OnConflict, Query},
};

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(db_error)
    }

    /// Find a user by username (case-insensitive).
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::UsernameLower.eq(username.to_lowercase()))
            .one(self.db.as_ref())
            .await
            .map_err(db_error)
    }

    /// Insert a user unless the username is taken.
    ///
    /// Returns `false` when the unique index on `username_lower` rejected the
    /// row; the check and the insert are a single statement.
    pub async fn insert_if_absent(&self, model: user::ActiveModel) -> AppResult<bool> {
        let result = User::insert(model)
            .on_conflict(
                OnConflict::column(user::Column::UsernameLower)
                    .do_nothing()
                    .to_owned(),
            )
            .exec(self.db.as_ref())
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) if is_unique_conflict(&e) => Ok(false),
            Err(e) => Err(db_error(e)),
        }
    }

    /// All users, oldest first.
    pub async fn find_all(&self) -> AppResult<Vec<user::Model>> {
        User::find()
            .order_by_asc(user::Column::CreatedAt)
            .order_by_asc(user::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(db_error)
    }

    /// Set the admin flag for the given usernames. Returns rows updated.
    pub async fn grant_admin(&self, usernames: &[String]) -> AppResult<u64> {
        if usernames.is_empty() {
            return Ok(0);
        }

        let lowered: Vec<String> = usernames.iter().map(|u| u.to_lowercase()).collect();
        let result = User::update_many()
            .col_expr(user::Column::IsAdmin, Expr::value(true))
            .filter(user::Column::UsernameLower.is_in(lowered))
            .exec(self.db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected)
    }

    /// Delete a user and everything they own.
    ///
    /// The user row is locked first. Votes by the user that are still in
    /// flight commit before the lock is granted and are decremented below;
    /// later ones fail their foreign key check. Counters are decremented in
    /// the same transaction, before the cascade removes the vote rows.
    /// Returns whether a user row was deleted.
    pub async fn delete_with_votes(&self, user_id: &str) -> AppResult<bool> {
        let txn = self.db.begin().await.map_err(db_error)?;

        let locked = User::find_by_id(user_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(db_error)?;

        if locked.is_none() {
            txn.rollback().await.map_err(db_error)?;
            return Ok(false);
        }

        let voted_options = Query::select()
            .column(poll_vote::Column::OptionId)
            .from(PollVote)
            .and_where(poll_vote::Column::UserId.eq(user_id))
            .to_owned();

        PollOption::update_many()
            .col_expr(
                poll_option::Column::VoteCount,
                Expr::col(poll_option::Column::VoteCount).sub(1),
            )
            .filter(poll_option::Column::Id.in_subquery(voted_options))
            .exec(&txn)
            .await
            .map_err(db_error)?;

        User::delete_by_id(user_id)
            .exec(&txn)
            .await
            .map_err(db_error)?;

        txn.commit().await.map_err(db_error)?;
        Ok(true)
    }
}

/// Build an insertable user row.
#[must_use]
pub fn new_user(id: String, username: &str, password_hash: String) -> user::ActiveModel {
    user::ActiveModel {
        id: Set(id),
        username: Set(username.to_string()),
        username_lower: Set(username.to_lowercase()),
        password_hash: Set(password_hash),
        is_admin: Set(false),
        created_at: Set(chrono::Utc::now().into()),
    }
}
