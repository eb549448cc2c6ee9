//! HTTP layer for pollhub.
//!
//! - **Endpoints**: form posts that redirect, JSON views for reads
//! - **Session**: signed cookie resolved to a user on every request
//! - **Admin gate**: one middleware in front of every `/admin` route
//!
//! Built on Axum 0.8.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod session;

pub use endpoints::router;
pub use middleware::AppState;
pub use session::SessionSettings;
