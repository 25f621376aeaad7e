//! Durable key/value storage abstraction

use anyhow::Result;

/// A named collection of string values.
///
/// Writes are synchronous: once `put` returns the value is durable for the
/// backing implementation.
pub trait KeyValueCollection: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn put(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}
