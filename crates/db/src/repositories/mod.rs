//! Repositories: one per aggregate, each owning a shared connection handle.

pub mod comment;
pub mod poll;
pub mod user;

pub use comment::CommentRepository;
pub use poll::{PollRepository, PollVoteRepository, VoteOutcome};
pub use user::UserRepository;
