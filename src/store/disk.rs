use crate::core::kv::KeyValueCollection;
use anyhow::{Context, Result};
use fjall::{Keyspace, PartitionHandle, PersistMode};
use tracing::debug;

/// Collection backed by an fjall partition.
///
/// Every write is flushed with `SyncAll` before returning.
pub struct DiskCollection {
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl DiskCollection {
    pub fn new(keyspace: Keyspace, partition: PartitionHandle) -> Self {
        Self {
            keyspace,
            partition,
        }
    }

    fn persist(&self) -> Result<()> {
        self.keyspace
            .persist(PersistMode::SyncAll)
            .context("Failed to flush keyspace")
    }
}

impl KeyValueCollection for DiskCollection {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .partition
            .get(key.as_bytes())
            .with_context(|| format!("Failed to read key: {key}"))?;
        debug!(key, hit = value.is_some(), "Disk GET");
        value
            .map(|bytes| {
                String::from_utf8(bytes.to_vec())
                    .with_context(|| format!("Value for key {key} is not valid UTF-8"))
            })
            .transpose()
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.partition
            .insert(key.as_bytes(), value.as_bytes())
            .with_context(|| format!("Failed to write key: {key}"))?;
        debug!(key, "Disk PUT");
        self.persist()
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.partition
            .remove(key.as_bytes())
            .with_context(|| format!("Failed to remove key: {key}"))?;
        debug!(key, "Disk REMOVE");
        self.persist()
    }
}
