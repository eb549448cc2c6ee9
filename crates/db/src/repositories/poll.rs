//! Poll repository.

use std::sync::Arc;

use crate::entities::{Poll, PollOption, PollVote, poll, poll_option, poll_vote};
use crate::{db_error, is_unique_conflict};
use pollhub_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
    sea_query::{Expr, OnConflict},
};

/// Poll repository for database operations.
#[derive(Clone)]
pub struct PollRepository {
    db: Arc<DatabaseConnection>,
}

impl PollRepository {
    /// Create a new poll repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a poll by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<poll::Model>> {
        Poll::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(db_error)
    }

    /// Get a poll by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<poll::Model> {
        self.find_by_id(id).await?.ok_or(AppError::PollNotFound)
    }

    /// All polls, newest first.
    pub async fn find_all(&self) -> AppResult<Vec<poll::Model>> {
        Poll::find()
            .order_by_desc(poll::Column::CreatedAt)
            .order_by_desc(poll::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(db_error)
    }

    /// Polls created by a user, newest first.
    pub async fn find_by_creator(&self, creator_id: &str) -> AppResult<Vec<poll::Model>> {
        Poll::find()
            .filter(poll::Column::CreatorId.eq(creator_id))
            .order_by_desc(poll::Column::CreatedAt)
            .order_by_desc(poll::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(db_error)
    }

    /// Insert a poll and its options atomically.
    pub async fn create_with_options(
        &self,
        poll: poll::ActiveModel,
        options: Vec<poll_option::ActiveModel>,
    ) -> AppResult<()> {
        let txn = self.db.begin().await.map_err(db_error)?;

        Poll::insert(poll).exec(&txn).await.map_err(db_error)?;
        PollOption::insert_many(options)
            .exec(&txn)
            .await
            .map_err(db_error)?;

        txn.commit().await.map_err(db_error)
    }

    /// Options of a poll in display order.
    pub async fn find_options(&self, poll_id: &str) -> AppResult<Vec<poll_option::Model>> {
        PollOption::find()
            .filter(poll_option::Column::PollId.eq(poll_id))
            .order_by_asc(poll_option::Column::Position)
            .all(self.db.as_ref())
            .await
            .map_err(db_error)
    }

    /// Find an option, only if it belongs to the given poll.
    pub async fn find_option(
        &self,
        poll_id: &str,
        option_id: &str,
    ) -> AppResult<Option<poll_option::Model>> {
        PollOption::find_by_id(option_id)
            .filter(poll_option::Column::PollId.eq(poll_id))
            .one(self.db.as_ref())
            .await
            .map_err(db_error)
    }

    /// Delete a poll. Options, comments and votes go with it (FK cascade).
    pub async fn delete(&self, id: &str) -> AppResult<bool> {
        let result = Poll::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected > 0)
    }
}

/// Result of trying to record a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The vote row was inserted and the option counter incremented.
    Recorded,
    /// The user already has a vote on this poll; nothing changed.
    AlreadyVoted,
    /// The option disappeared between validation and the write; nothing changed.
    OptionGone,
}

/// Poll vote repository for database operations.
#[derive(Clone)]
pub struct PollVoteRepository {
    db: Arc<DatabaseConnection>,
}

impl PollVoteRepository {
    /// Create a new poll vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the vote a user cast on a poll.
    pub async fn find_by_user_and_poll(
        &self,
        user_id: &str,
        poll_id: &str,
    ) -> AppResult<Option<poll_vote::Model>> {
        PollVote::find()
            .filter(poll_vote::Column::UserId.eq(user_id))
            .filter(poll_vote::Column::PollId.eq(poll_id))
            .one(self.db.as_ref())
            .await
            .map_err(db_error)
    }

    /// Record a vote and bump the option counter in one transaction.
    ///
    /// The `(poll_id, user_id)` unique index decides whether the vote is new;
    /// the counter is only touched after the insert succeeded.
    pub async fn record(
        &self,
        id: String,
        poll_id: &str,
        user_id: &str,
        option_id: &str,
    ) -> AppResult<VoteOutcome> {
        let vote = poll_vote::ActiveModel {
            id: Set(id),
            poll_id: Set(poll_id.to_string()),
            user_id: Set(user_id.to_string()),
            option_id: Set(option_id.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };

        let txn = self.db.begin().await.map_err(db_error)?;

        let inserted = PollVote::insert(vote)
            .on_conflict(
                OnConflict::columns([poll_vote::Column::PollId, poll_vote::Column::UserId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec(&txn)
            .await;

        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_conflict(&e) => {
                txn.rollback().await.map_err(db_error)?;
                return Ok(VoteOutcome::AlreadyVoted);
            }
            Err(e) => return Err(db_error(e)),
        }

        let updated = PollOption::update_many()
            .col_expr(
                poll_option::Column::VoteCount,
                Expr::col(poll_option::Column::VoteCount).add(1),
            )
            .filter(poll_option::Column::Id.eq(option_id))
            .filter(poll_option::Column::PollId.eq(poll_id))
            .exec(&txn)
            .await
            .map_err(db_error)?;

        if updated.rows_affected != 1 {
            txn.rollback().await.map_err(db_error)?;
            return Ok(VoteOutcome::OptionGone);
        }

        txn.commit().await.map_err(db_error)?;
        Ok(VoteOutcome::Recorded)
    }

    /// Number of vote rows referencing an option.
    pub async fn count_by_option(&self, option_id: &str) -> AppResult<u64> {
        use sea_orm::PaginatorTrait;

        PollVote::find()
            .filter(poll_vote::Column::OptionId.eq(option_id))
            .count(self.db.as_ref())
            .await
            .map_err(db_error)
    }
}
