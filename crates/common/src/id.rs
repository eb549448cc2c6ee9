//! ID generation utilities.

use ulid::Ulid;

/// ID generator for entities.
///
/// Every row id in pollhub is a lowercase ULID, so ids sort in creation order
/// and can break ties between rows sharing a timestamp.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new ULID-based ID.
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }
}
