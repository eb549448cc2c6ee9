//! Poll service.

use chrono::Utc;
use pollhub_common::{AppError, AppResult, IdGenerator};
use pollhub_db::{
    entities::{poll, poll_option},
    repositories::{CommentRepository, PollRepository, PollVoteRepository, VoteOutcome},
};
use sea_orm::Set;
use serde::Serialize;
use validator::Validate;

use super::comment::{CommentNode, build_thread};

/// Maximum option length in characters.
pub const MAX_OPTION_CHARS: usize = 200;

/// Message returned on a second vote in the same poll.
pub const ALREADY_VOTED: &str = "Cannot vote more than once";

/// Poll service for business logic.
#[derive(Clone)]
pub struct PollService {
    poll_repo: PollRepository,
    vote_repo: PollVoteRepository,
    comment_repo: CommentRepository,
    id_gen: IdGenerator,
}

/// Input for creating a poll.
#[derive(Debug, Validate)]
pub struct CreatePollInput {
    #[validate(length(min = 1, max = 500))]
    pub question: String,

    #[validate(length(min = 2, max = 10))]
    pub options: Vec<String>,
}

impl CreatePollInput {
    /// Build an input from raw form values; blank option entries are dropped.
    #[must_use]
    pub fn new(question: &str, options: Vec<String>) -> Self {
        Self {
            question: question.trim().to_string(),
            options: options
                .into_iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
        }
    }
}

/// A poll with its options, threaded comments and the viewer's vote.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollDetail {
    pub poll: poll::Model,
    pub options: Vec<poll_option::Model>,
    pub comments: Vec<CommentNode>,
    /// Option id the viewer voted for, if any.
    pub my_vote: Option<String>,
}

impl PollService {
    /// Create a new poll service.
    #[must_use]
    pub const fn new(
        poll_repo: PollRepository,
        vote_repo: PollVoteRepository,
        comment_repo: CommentRepository,
    ) -> Self {
        Self {
            poll_repo,
            vote_repo,
            comment_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a poll with its options.
    pub async fn create(&self, creator_id: &str, input: CreatePollInput) -> AppResult<poll::Model> {
        input.validate()?;
        if let Some(long) = input
            .options
            .iter()
            .find(|o| o.chars().count() > MAX_OPTION_CHARS)
        {
            return Err(AppError::Validation(format!(
                "Option is too long (max {MAX_OPTION_CHARS} chars): {long}"
            )));
        }

        let model = poll::Model {
            id: self.id_gen.generate(),
            question: input.question,
            creator_id: creator_id.to_string(),
            created_at: Utc::now().into(),
        };

        let options = input
            .options
            .into_iter()
            .zip(0..)
            .map(|(text, position)| poll_option::ActiveModel {
                id: Set(self.id_gen.generate()),
                poll_id: Set(model.id.clone()),
                text: Set(text),
                position: Set(position),
                vote_count: Set(0),
            })
            .collect();

        let active = poll::ActiveModel {
            id: Set(model.id.clone()),
            question: Set(model.question.clone()),
            creator_id: Set(model.creator_id.clone()),
            created_at: Set(model.created_at),
        };

        self.poll_repo.create_with_options(active, options).await?;

        tracing::info!(poll_id = %model.id, creator_id = %creator_id, "Created poll");
        Ok(model)
    }

    /// All polls, newest first.
    pub async fn list_all(&self) -> AppResult<Vec<poll::Model>> {
        self.poll_repo.find_all().await
    }

    /// Polls created by a user, newest first.
    pub async fn list_by_creator(&self, creator_id: &str) -> AppResult<Vec<poll::Model>> {
        self.poll_repo.find_by_creator(creator_id).await
    }

    /// Load a poll for display.
    pub async fn detail(&self, poll_id: &str, viewer_id: Option<&str>) -> AppResult<PollDetail> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;
        let options = self.poll_repo.find_options(poll_id).await?;
        let comments = build_thread(self.comment_repo.find_by_poll(poll_id).await?);

        let my_vote = match viewer_id {
            Some(user_id) => self
                .vote_repo
                .find_by_user_and_poll(user_id, poll_id)
                .await?
                .map(|v| v.option_id),
            None => None,
        };

        Ok(PollDetail {
            poll,
            options,
            comments,
            my_vote,
        })
    }

    /// Cast a vote.
    ///
    /// The poll must exist and the option must belong to it. Whether the vote
    /// is a duplicate is decided by the database, never by a prior read.
    pub async fn vote(&self, poll_id: &str, option_id: &str, user_id: &str) -> AppResult<()> {
        self.poll_repo.get_by_id(poll_id).await?;

        if self
            .poll_repo
            .find_option(poll_id, option_id)
            .await?
            .is_none()
        {
            return Err(AppError::BadRequest("Invalid option".to_string()));
        }

        let outcome = self
            .vote_repo
            .record(self.id_gen.generate(), poll_id, user_id, option_id)
            .await?;

        match outcome {
            VoteOutcome::Recorded => {
                tracing::info!(poll_id = %poll_id, option_id = %option_id, user_id = %user_id, "Vote recorded");
                Ok(())
            }
            VoteOutcome::AlreadyVoted => {
                tracing::info!(poll_id = %poll_id, user_id = %user_id, "Duplicate vote rejected");
                Err(AppError::Conflict(ALREADY_VOTED.to_string()))
            }
            VoteOutcome::OptionGone => Err(AppError::BadRequest("Invalid option".to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pollhub_db::entities::{comment, poll_vote};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn test_poll() -> poll::Model {
        poll::Model {
            id: "p1".to_string(),
            question: "Tabs or spaces?".to_string(),
            creator_id: "u1".to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn test_option(id: &str, position: i32, vote_count: i32) -> poll_option::Model {
        poll_option::Model {
            id: id.to_string(),
            poll_id: "p1".to_string(),
            text: format!("option {id}"),
            position,
            vote_count,
        }
    }

    fn service(db: Arc<sea_orm::DatabaseConnection>) -> PollService {
        PollService::new(
            PollRepository::new(Arc::clone(&db)),
            PollVoteRepository::new(Arc::clone(&db)),
            CommentRepository::new(db),
        )
    }

    #[test]
    fn test_input_drops_blank_options() {
        let input = CreatePollInput::new(
            "  Q?  ",
            vec!["a".into(), "".into(), "   ".into(), " b ".into()],
        );
        assert_eq!(input.question, "Q?");
        assert_eq!(input.options, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_create_requires_two_options() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let input = CreatePollInput::new("Q?", vec!["only".into(), " ".into()]);
        let err = service(db).create("u1", input).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_too_many_options() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let options = (0..11).map(|i| format!("o{i}")).collect();
        let err = service(db)
            .create("u1", CreatePollInput::new("Q?", options))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_long_option() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let input = CreatePollInput::new("Q?", vec!["ok".into(), "x".repeat(201)]);
        let err = service(db).create("u1", input).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_success() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1), exec(2)])
                .into_connection(),
        );

        let input = CreatePollInput::new("Q?", vec!["a".into(), "b".into()]);
        let poll = service(db).create("u1", input).await.unwrap();
        assert_eq!(poll.question, "Q?");
        assert_eq!(poll.creator_id, "u1");
    }

    #[tokio::test]
    async fn test_vote_unknown_poll() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<poll::Model>::new()])
                .into_connection(),
        );

        let err = service(db).vote("nope", "o1", "u2").await.unwrap_err();
        assert!(matches!(err, AppError::PollNotFound));
    }

    #[tokio::test]
    async fn test_vote_option_of_other_poll() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_poll()]])
                .append_query_results([Vec::<poll_option::Model>::new()])
                .into_connection(),
        );

        let err = service(db).vote("p1", "other", "u2").await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref msg) if msg == "Invalid option"));
    }

    #[tokio::test]
    async fn test_vote_recorded() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_poll()]])
                .append_query_results([[test_option("o1", 0, 0)]])
                .append_exec_results([exec(1), exec(1)])
                .into_connection(),
        );

        service(Arc::clone(&db)).vote("p1", "o1", "u2").await.unwrap();

        let log = Arc::into_inner(db).unwrap().into_transaction_log();
        // Two lookups, then the vote transaction.
        assert_eq!(log.len(), 3);
        let txn = format!("{:?}", log[2]);
        assert!(txn.contains("ON CONFLICT"));
        assert!(txn.contains("UPDATE"));
    }

    #[tokio::test]
    async fn test_second_vote_conflicts_without_increment() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_poll()]])
                .append_query_results([[test_option("o2", 1, 0)]])
                .append_exec_results([exec(0)])
                .into_connection(),
        );

        let err = service(Arc::clone(&db))
            .vote("p1", "o2", "u2")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref msg) if msg == ALREADY_VOTED));

        let log = Arc::into_inner(db).unwrap().into_transaction_log();
        let txn = format!("{:?}", log[2]);
        assert!(txn.contains("ON CONFLICT"));
        assert!(!txn.contains("UPDATE"));
    }

    #[tokio::test]
    async fn test_detail_for_viewer() {
        let vote = poll_vote::Model {
            id: "v1".to_string(),
            poll_id: "p1".to_string(),
            user_id: "u2".to_string(),
            option_id: "o2".to_string(),
            created_at: Utc::now().into(),
        };
        let reply = comment::Model {
            id: "c2".to_string(),
            poll_id: "p1".to_string(),
            user_id: "u2".to_string(),
            text: "me too".to_string(),
            parent_id: Some("c1".to_string()),
            created_at: Utc::now().into(),
        };
        let root = comment::Model {
            id: "c1".to_string(),
            parent_id: None,
            text: "first".to_string(),
            created_at: (Utc::now() - chrono::Duration::minutes(1)).into(),
            ..reply.clone()
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_poll()]])
                .append_query_results([[test_option("o1", 0, 3), test_option("o2", 1, 1)]])
                .append_query_results([[root, reply]])
                .append_query_results([[vote]])
                .into_connection(),
        );

        let detail = service(db).detail("p1", Some("u2")).await.unwrap();
        assert_eq!(detail.options.len(), 2);
        assert_eq!(detail.comments.len(), 1);
        assert_eq!(detail.comments[0].replies.len(), 1);
        assert_eq!(detail.my_vote.as_deref(), Some("o2"));
    }

    #[tokio::test]
    async fn test_detail_anonymous_skips_vote_lookup() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_poll()]])
                .append_query_results([[test_option("o1", 0, 0)]])
                .append_query_results([Vec::<comment::Model>::new()])
                .into_connection(),
        );

        let detail = service(db).detail("p1", None).await.unwrap();
        assert!(detail.my_vote.is_none());
        assert!(detail.comments.is_empty());
    }
}
