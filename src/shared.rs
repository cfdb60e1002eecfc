//! A lock-guarded map for callers that read from several threads while one
//! editor writes.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::TopologyConfig;
use crate::error::Result;
use crate::map::TopologyMap;

#[derive(Clone, Default)]
pub struct SharedTopology {
    inner: Arc<RwLock<TopologyMap>>,
}

impl SharedTopology {
    pub fn new(config: TopologyConfig) -> Result<Self> {
        Ok(Self::from_map(TopologyMap::new(config)?))
    }

    pub fn from_map(map: TopologyMap) -> Self {
        Self {
            inner: Arc::new(RwLock::new(map)),
        }
    }

    /// Applies `f` and settles under the write lock. Readers never observe
    /// the map between the edit and its settle, and a failed edit is rolled
    /// back before the lock is released.
    pub fn edit<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut TopologyMap) -> Result<T>,
    {
        self.inner.write().edit(f)
    }

    pub fn read<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&TopologyMap) -> T,
    {
        f(&self.inner.read())
    }

    /// An owned copy of the current map.
    pub fn snapshot(&self) -> TopologyMap {
        self.inner.read().clone()
    }
}
