pub mod disk;
pub mod memory;

use crate::core::kv::KeyValueCollection;
use anyhow::{Context, Result, anyhow};
use disk::DiskCollection;
use fjall::{Keyspace, PartitionCreateOptions};
use memory::MemoryCollection;
use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, RwLock},
};
use tracing::{debug, warn};

/// Holds named collections, either durable (fjall) or in-memory.
pub struct KeyValueStore {
    collections: RwLock<HashMap<String, Arc<dyn KeyValueCollection>>>,
    keyspace: Option<Keyspace>,
}

impl KeyValueStore {
    /// Opens a durable store rooted at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create data directory: {}", path.display()))?;
        let keyspace = fjall::Config::new(path)
            .open()
            .with_context(|| format!("Failed to open store at {}", path.display()))?;
        debug!("Opened store at {}", path.display());

        Ok(Self {
            collections: RwLock::new(HashMap::new()),
            keyspace: Some(keyspace),
        })
    }

    /// A store whose collections live only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            keyspace: None,
        }
    }

    /// Opens a durable store, degrading to memory if that fails.
    pub fn open_or_memory(path: &Path) -> Self {
        Self::open(path).unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to in-memory store, custom tokens will not persist");
            Self::in_memory()
        })
    }

    pub fn is_durable(&self) -> bool {
        self.keyspace.is_some()
    }

    /// Returns the named collection, creating it on first use.
    pub fn collection(&self, name: &str) -> Result<Arc<dyn KeyValueCollection>> {
        if let Some(existing) = self
            .collections
            .read()
            .map_err(|_| anyhow!("Store lock poisoned"))?
            .get(name)
        {
            return Ok(Arc::clone(existing));
        }

        let mut collections = self
            .collections
            .write()
            .map_err(|_| anyhow!("Store lock poisoned"))?;
        if let Some(existing) = collections.get(name) {
            return Ok(Arc::clone(existing));
        }

        let collection: Arc<dyn KeyValueCollection> = match &self.keyspace {
            Some(keyspace) => {
                let partition = keyspace
                    .open_partition(name, PartitionCreateOptions::default())
                    .with_context(|| format!("Failed to open collection: {name}"))?;
                Arc::new(DiskCollection::new(keyspace.clone(), partition))
            }
            None => Arc::new(MemoryCollection::new()),
        };
        collections.insert(name.to_string(), Arc::clone(&collection));
        Ok(collection)
    }
}
