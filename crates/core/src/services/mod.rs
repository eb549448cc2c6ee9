//! Business logic services.

#![allow(missing_docs)]

pub mod admin;
pub mod comment;
pub mod poll;
pub mod upload;
pub mod user;

pub use admin::{AdminDashboard, AdminService, UserDeletion};
pub use comment::{CommentNode, CommentService, build_thread};
pub use poll::{CreatePollInput, PollDetail, PollService};
pub use upload::UploadService;
pub use user::{RegisterInput, UserService};
