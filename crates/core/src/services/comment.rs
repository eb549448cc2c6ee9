//! Comment service and reply threading.

use std::collections::HashMap;

use chrono::Utc;
use pollhub_common::{AppError, AppResult, IdGenerator};
use pollhub_db::{
    entities::comment,
    repositories::{CommentRepository, PollRepository},
};
use sea_orm::Set;
use serde::Serialize;

/// Maximum comment length in characters.
pub const MAX_COMMENT_CHARS: usize = 2000;

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    poll_repo: PollRepository,
    id_gen: IdGenerator,
}

/// A comment together with its replies, oldest first.
#[derive(Debug, Clone, Serialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: comment::Model,
    pub replies: Vec<CommentNode>,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(comment_repo: CommentRepository, poll_repo: PollRepository) -> Self {
        Self {
            comment_repo,
            poll_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Add a top-level comment to a poll. Returns the new comment id.
    pub async fn add_comment(&self, poll_id: &str, user_id: &str, text: &str) -> AppResult<String> {
        let text = validate_text(text)?;
        self.poll_repo.get_by_id(poll_id).await?;

        let id = self.id_gen.generate();
        self.comment_repo
            .create(new_comment(&id, poll_id, user_id, text, None))
            .await?;

        tracing::debug!(comment_id = %id, poll_id = %poll_id, "Added comment");
        Ok(id)
    }

    /// Reply to an existing comment of the same poll. Returns the new comment id.
    pub async fn add_reply(
        &self,
        poll_id: &str,
        parent_id: &str,
        user_id: &str,
        text: &str,
    ) -> AppResult<String> {
        let text = validate_text(text)?;
        self.poll_repo.get_by_id(poll_id).await?;

        if self
            .comment_repo
            .find_in_poll(poll_id, parent_id)
            .await?
            .is_none()
        {
            return Err(AppError::BadRequest("Invalid parent comment".to_string()));
        }

        let id = self.id_gen.generate();
        if id == parent_id {
            return Err(AppError::BadRequest(
                "A comment cannot reply to itself".to_string(),
            ));
        }

        self.comment_repo
            .create(new_comment(&id, poll_id, user_id, text, Some(parent_id)))
            .await?;

        tracing::debug!(comment_id = %id, parent_id = %parent_id, "Added reply");
        Ok(id)
    }
}

fn validate_text(text: &str) -> AppResult<&str> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::Validation("Comment cannot be empty".to_string()));
    }
    if text.chars().count() > MAX_COMMENT_CHARS {
        return Err(AppError::Validation(format!(
            "Comment is too long (max {MAX_COMMENT_CHARS} chars)"
        )));
    }
    Ok(text)
}

fn new_comment(
    id: &str,
    poll_id: &str,
    user_id: &str,
    text: &str,
    parent_id: Option<&str>,
) -> comment::ActiveModel {
    comment::ActiveModel {
        id: Set(id.to_string()),
        poll_id: Set(poll_id.to_string()),
        user_id: Set(user_id.to_string()),
        text: Set(text.to_string()),
        parent_id: Set(parent_id.map(str::to_string)),
        created_at: Set(Utc::now().into()),
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Active,
    Done,
}

/// Arrange the comments of one poll into a forest.
///
/// Siblings keep ascending `(created_at, id)` order. A comment whose parent
/// is not in the set becomes a root. Parent cycles are cut at their earliest
/// comment, so every comment appears exactly once.
#[must_use]
pub fn build_thread(mut comments: Vec<comment::Model>) -> Vec<CommentNode> {
    comments.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));

    let index: HashMap<&str, usize> = comments
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id.as_str(), i))
        .collect();

    let mut parent: Vec<Option<usize>> = comments
        .iter()
        .enumerate()
        .map(|(i, c)| {
            c.parent_id
                .as_deref()
                .and_then(|p| index.get(p).copied())
                .filter(|&p| p != i)
        })
        .collect();

    // Break cycles: follow each parent chain once.
    let mut state = vec![Visit::New; comments.len()];
    for start in 0..comments.len() {
        let mut path = Vec::new();
        let mut cur = start;
        let cycle_at = loop {
            match state[cur] {
                Visit::Done => break None,
                Visit::Active => break Some(cur),
                Visit::New => {}
            }
            state[cur] = Visit::Active;
            path.push(cur);
            match parent[cur] {
                Some(p) => cur = p,
                None => break None,
            }
        };

        if let Some(entry) = cycle_at {
            if let Some(pos) = path.iter().position(|&n| n == entry) {
                if let Some(&earliest) = path[pos..].iter().min() {
                    parent[earliest] = None;
                }
            }
        }
        for n in path {
            state[n] = Visit::Done;
        }
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); comments.len()];
    let mut roots = Vec::new();
    for (i, p) in parent.iter().enumerate() {
        match p {
            Some(p) => children[*p].push(i),
            None => roots.push(i),
        }
    }

    // Assemble bottom-up without recursion; reply chains can be deep.
    let mut slots: Vec<Option<comment::Model>> = comments.into_iter().map(Some).collect();
    let mut built: Vec<Option<CommentNode>> = vec![None; slots.len()];
    let mut stack: Vec<(usize, bool)> = roots.iter().rev().map(|&r| (r, false)).collect();

    while let Some((node, expanded)) = stack.pop() {
        if expanded {
            let replies = children[node]
                .iter()
                .filter_map(|&c| built[c].take())
                .collect();
            if let Some(comment) = slots[node].take() {
                built[node] = Some(CommentNode { comment, replies });
            }
        } else {
            stack.push((node, true));
            stack.extend(children[node].iter().rev().map(|&c| (c, false)));
        }
    }

    roots.iter().filter_map(|&r| built[r].take()).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pollhub_db::entities::poll;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn c(id: &str, parent: Option<&str>, minute: i64) -> comment::Model {
        let base = chrono::DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z").unwrap();
        comment::Model {
            id: id.to_string(),
            poll_id: "p1".to_string(),
            user_id: "u1".to_string(),
            text: format!("text {id}"),
            parent_id: parent.map(str::to_string),
            created_at: base + Duration::minutes(minute),
        }
    }

    fn ids(nodes: &[CommentNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.comment.id.as_str()).collect()
    }

    fn count(nodes: &[CommentNode]) -> usize {
        nodes.iter().map(|n| 1 + count(&n.replies)).sum()
    }

    fn test_poll() -> poll::Model {
        poll::Model {
            id: "p1".to_string(),
            question: "Q?".to_string(),
            creator_id: "u1".to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn service(db: sea_orm::DatabaseConnection) -> CommentService {
        let db = Arc::new(db);
        CommentService::new(
            CommentRepository::new(Arc::clone(&db)),
            PollRepository::new(db),
        )
    }

    #[test]
    fn test_thread_two_roots_with_one_reply() {
        let forest = build_thread(vec![
            c("c1", None, 0),
            c("c2", Some("c1"), 1),
            c("c3", None, 2),
        ]);

        assert_eq!(ids(&forest), vec!["c1", "c3"]);
        assert_eq!(ids(&forest[0].replies), vec!["c2"]);
        assert!(forest[1].replies.is_empty());
    }

    #[test]
    fn test_thread_siblings_in_time_order() {
        let forest = build_thread(vec![
            c("c4", Some("c1"), 5),
            c("c1", None, 0),
            c("c2", Some("c1"), 1),
            c("c3", Some("c2"), 2),
        ]);

        assert_eq!(ids(&forest), vec!["c1"]);
        assert_eq!(ids(&forest[0].replies), vec!["c2", "c4"]);
        assert_eq!(ids(&forest[0].replies[0].replies), vec!["c3"]);
    }

    #[test]
    fn test_thread_timestamp_tie_broken_by_id() {
        let forest = build_thread(vec![c("b", None, 0), c("a", None, 0)]);
        assert_eq!(ids(&forest), vec!["a", "b"]);
    }

    #[test]
    fn test_thread_orphan_becomes_root() {
        let forest = build_thread(vec![c("c1", None, 0), c("c2", Some("gone"), 1)]);
        assert_eq!(ids(&forest), vec!["c1", "c2"]);
    }

    #[test]
    fn test_thread_self_parent_becomes_root() {
        let forest = build_thread(vec![c("c1", Some("c1"), 0)]);
        assert_eq!(ids(&forest), vec!["c1"]);
        assert!(forest[0].replies.is_empty());
    }

    #[test]
    fn test_thread_cycle_rendered_once() {
        let forest = build_thread(vec![
            c("c1", Some("c3"), 0),
            c("c2", Some("c1"), 1),
            c("c3", Some("c2"), 2),
            c("c4", None, 3),
        ]);

        assert_eq!(count(&forest), 4);
        // Cut at the earliest member of the cycle.
        assert_eq!(ids(&forest), vec!["c1", "c4"]);
        assert_eq!(ids(&forest[0].replies), vec!["c2"]);
        assert_eq!(ids(&forest[0].replies[0].replies), vec!["c3"]);
    }

    #[test]
    fn test_thread_deep_chain() {
        let mut comments = vec![c("n0000", None, 0)];
        for i in 1..500 {
            comments.push(c(&format!("n{i:04}"), Some(&format!("n{:04}", i - 1)), i));
        }

        let forest = build_thread(comments);
        assert_eq!(forest.len(), 1);
        let mut depth = 0;
        let mut node = &forest[0];
        while let Some(next) = node.replies.first() {
            depth += 1;
            node = next;
        }
        assert_eq!(depth, 499);
    }

    #[test]
    fn test_thread_empty() {
        assert!(build_thread(Vec::new()).is_empty());
    }

    #[tokio::test]
    async fn test_add_comment_unknown_poll() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<poll::Model>::new()])
            .into_connection();

        let err = service(db).add_comment("nope", "u1", "hi").await.unwrap_err();
        assert!(matches!(err, AppError::PollNotFound));
    }

    #[tokio::test]
    async fn test_add_comment_blank_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let err = service(db).add_comment("p1", "u1", "   ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_add_comment_success() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_poll()]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let id = service(db).add_comment("p1", "u1", "hello").await.unwrap();
        assert_eq!(id.len(), 26);
    }

    #[tokio::test]
    async fn test_add_reply_parent_from_other_poll_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_poll()]])
            .append_query_results([Vec::<comment::Model>::new()])
            .into_connection();

        let err = service(db)
            .add_reply("p1", "c-other", "u1", "reply")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_add_reply_success() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_poll()]])
            .append_query_results([[c("c1", None, 0)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let id = service(db)
            .add_reply("p1", "c1", "u1", "reply")
            .await
            .unwrap();
        assert_ne!(id, "c1");
    }
}
