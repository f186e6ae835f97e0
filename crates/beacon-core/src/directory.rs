//! Directory (naming service) contract.
//!
//! The protocol consumes four operations: bind, unbind, lookup, and list.
//! `MemoryDirectory` keeps the bindings in process and is shared by every
//! node of an in-process cluster, or served over HTTP by `beacond directory`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{DirectoryError, DirectoryResult};

/// Name ↔ endpoint registry shared by all nodes.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Register `name` at `endpoint`. Fails if the name is already bound.
    async fn bind(&self, name: &str, endpoint: &str) -> DirectoryResult<()>;

    /// Remove `name`. Returns `false` if it was not bound.
    async fn unbind(&self, name: &str) -> DirectoryResult<bool>;

    /// Endpoint bound to `name`, if any.
    async fn lookup(&self, name: &str) -> DirectoryResult<Option<String>>;

    /// All currently bound names, sorted.
    async fn list(&self) -> DirectoryResult<Vec<String>>;
}

/// In-memory directory. Cheap to clone; clones share the same bindings.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    bindings: Arc<RwLock<BTreeMap<String, String>>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bound names.
    pub async fn len(&self) -> usize {
        self.bindings.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.bindings.read().await.is_empty()
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn bind(&self, name: &str, endpoint: &str) -> DirectoryResult<()> {
        let mut bindings = self.bindings.write().await;
        if bindings.contains_key(name) {
            return Err(DirectoryError::AlreadyBound(name.to_string()));
        }
        bindings.insert(name.to_string(), endpoint.to_string());
        info!(%name, %endpoint, "name bound");
        Ok(())
    }

    async fn unbind(&self, name: &str) -> DirectoryResult<bool> {
        let removed = self.bindings.write().await.remove(name).is_some();
        if removed {
            info!(%name, "name unbound");
        } else {
            debug!(%name, "unbind of unknown name");
        }
        Ok(removed)
    }

    async fn lookup(&self, name: &str) -> DirectoryResult<Option<String>> {
        Ok(self.bindings.read().await.get(name).cloned())
    }

    async fn list(&self) -> DirectoryResult<Vec<String>> {
        Ok(self.bindings.read().await.keys().cloned().collect())
    }
}
