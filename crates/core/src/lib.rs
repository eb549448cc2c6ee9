//! Core business logic for pollhub.

pub mod services;

pub use services::*;
