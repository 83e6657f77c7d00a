//! Per-collection caches shared by the resolvers

use super::{CacheConfig, CacheStats, MemoizedCache};
use crate::error::Result;
use crate::store::{ApplicationStore, ConnectionDirectory, GroupStore};
use crate::types::{Application, Connection, Group};

use std::sync::Arc;
use tracing::info;

/// Key used when a store does not expose a fingerprint
const GROUPS_KEY: &str = "groups";
const APPLICATIONS_KEY: &str = "applications";
const CONNECTIONS_KEY: &str = "connections";

/// Connection fields requested from the directory
pub const CONNECTION_FIELDS: &[&str] = &["id", "name", "strategy"];

/// Caches for every collection the resolvers read
///
/// Each collection is cached whole under the store's fingerprint, so a store
/// whose content changes under a new fingerprint is loaded fresh rather than
/// served from the old entry.
pub struct DataCache {
    groups: MemoizedCache<String, Vec<Group>>,
    applications: MemoizedCache<String, Vec<Application>>,
    connections: MemoizedCache<String, Vec<Connection>>,
    connection_by_id: MemoizedCache<String, Connection>,
}

/// Statistics for each cache in a [`DataCache`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataCacheStats {
    pub groups: CacheStats,
    pub applications: CacheStats,
    pub connections: CacheStats,
    pub connection_lookup: CacheStats,
}

impl DataCache {
    /// Create the caches
    ///
    /// # Arguments
    ///
    /// * `data` - settings for the group, application and connection lists
    /// * `connection_lookup` - settings for single-connection lookups
    pub fn new(data: CacheConfig, connection_lookup: CacheConfig) -> Self {
        info!(
            capacity = data.capacity,
            ttl_ms = data.ttl.as_millis() as u64,
            "initialising data cache"
        );

        Self {
            groups: MemoizedCache::new("groups", data.clone()),
            applications: MemoizedCache::new("applications", data.clone()),
            connections: MemoizedCache::new("connections", data),
            connection_by_id: MemoizedCache::new("connection", connection_lookup),
        }
    }

    /// All groups from `store`
    pub async fn groups(&self, store: &dyn GroupStore) -> Result<Arc<Vec<Group>>> {
        let key = store.fingerprint().unwrap_or_else(|| GROUPS_KEY.to_string());
        self.groups.get_with(key, || store.get_groups()).await
    }

    /// All applications from `store`
    pub async fn applications(
        &self,
        store: &dyn ApplicationStore,
    ) -> Result<Arc<Vec<Application>>> {
        let key = store
            .fingerprint()
            .unwrap_or_else(|| APPLICATIONS_KEY.to_string());
        self.applications.get_with(key, || store.get_applications()).await
    }

    /// All connections from `directory`, sorted by case-insensitive name
    pub async fn connections(
        &self,
        directory: &dyn ConnectionDirectory,
    ) -> Result<Arc<Vec<Connection>>> {
        let key = directory
            .fingerprint()
            .unwrap_or_else(|| CONNECTIONS_KEY.to_string());

        self.connections
            .get_with(key, || async move {
                let mut connections = directory.get_connections(CONNECTION_FIELDS).await?;
                connections.sort_by_key(|c| c.name.to_lowercase());
                Ok(connections)
            })
            .await
    }

    /// A single connection by id
    pub async fn connection(
        &self,
        directory: &dyn ConnectionDirectory,
        id: &str,
    ) -> Result<Arc<Connection>> {
        self.connection_by_id
            .get_with(id.to_string(), || directory.get_connection(id))
            .await
    }

    /// Drop every cached entry
    pub fn invalidate_all(&self) {
        self.groups.clear();
        self.applications.clear();
        self.connections.clear();
        self.connection_by_id.clear();
    }

    pub fn stats(&self) -> DataCacheStats {
        DataCacheStats {
            groups: self.groups.stats(),
            applications: self.applications.stats(),
            connections: self.connections.stats(),
            connection_lookup: self.connection_by_id.stats(),
        }
    }
}

impl Default for DataCache {
    fn default() -> Self {
        Self::new(
            CacheConfig::default(),
            CacheConfig::new(super::DEFAULT_CAPACITY, std::time::Duration::from_secs(600)),
        )
    }
}
