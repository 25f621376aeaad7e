use crate::core::kv::KeyValueCollection;
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

/// In-memory collection used when no durable store is available and in tests
#[derive(Default)]
pub struct MemoryCollection {
    inner: RwLock<HashMap<String, String>>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueCollection for MemoryCollection {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let map = self
            .inner
            .read()
            .map_err(|_| anyhow!("Memory collection lock poisoned"))?;
        let value = map.get(key).cloned();
        debug!(key, hit = value.is_some(), "Memory GET");
        Ok(value)
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| anyhow!("Memory collection lock poisoned"))?;
        debug!(key, "Memory PUT");
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| anyhow!("Memory collection lock poisoned"))?;
        debug!(key, "Memory REMOVE");
        map.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_get_put() {
        let collection = MemoryCollection::new();

        // Initially, collection is empty
        assert!(collection.get("key1").unwrap().is_none());

        collection.put("key1", "value1").unwrap();
        assert_eq!(collection.get("key1").unwrap().as_deref(), Some("value1"));

        // Overwrite keeps the latest value
        collection.put("key1", "value2").unwrap();
        assert_eq!(collection.get("key1").unwrap().as_deref(), Some("value2"));

        assert!(collection.get("key2").unwrap().is_none());
    }

    #[test]
    fn test_memory_remove() {
        let collection = MemoryCollection::new();

        collection.put("key1", "value1").unwrap();
        collection.remove("key1").unwrap();
        assert!(collection.get("key1").unwrap().is_none());

        // Removing a missing key is not an error
        collection.remove("missing").unwrap();
    }
}
