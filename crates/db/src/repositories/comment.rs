//! Comment repository.

use std::sync::Arc;

use crate::db_error;
use crate::entities::{Comment, comment};
use pollhub_common::AppResult;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

/// Comment repository for database operations.
#[derive(Clone)]
pub struct CommentRepository {
    db: Arc<DatabaseConnection>,
}

impl CommentRepository {
    /// Create a new comment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// All comments of a poll, oldest first (id breaks timestamp ties).
    pub async fn find_by_poll(&self, poll_id: &str) -> AppResult<Vec<comment::Model>> {
        Comment::find()
            .filter(comment::Column::PollId.eq(poll_id))
            .order_by_asc(comment::Column::CreatedAt)
            .order_by_asc(comment::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(db_error)
    }

    /// Find a comment, only if it belongs to the given poll.
    pub async fn find_in_poll(
        &self,
        poll_id: &str,
        comment_id: &str,
    ) -> AppResult<Option<comment::Model>> {
        Comment::find_by_id(comment_id)
            .filter(comment::Column::PollId.eq(poll_id))
            .one(self.db.as_ref())
            .await
            .map_err(db_error)
    }

    /// Insert a comment.
    pub async fn create(&self, model: comment::ActiveModel) -> AppResult<()> {
        Comment::insert(model)
            .exec(self.db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(())
    }
}
