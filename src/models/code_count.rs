//! Per-prefix code counters

use sqlx::FromRow;

/// Monotonic counter backing generated codes. One row per prefix, created
/// lazily on first allocation, incremented under optimistic locking.
#[derive(Debug, Clone, FromRow)]
pub struct CodeCount {
    pub key: String,
    pub last_value: i64,
    pub version: i64,
}

impl CodeCount {
    /// First allocation for a prefix: the row starts at 1
    pub fn first(key: &str) -> Self {
        Self {
            key: key.to_string(),
            last_value: 1,
            version: 0,
        }
    }
}
