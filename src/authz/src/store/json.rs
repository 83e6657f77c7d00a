//! Read-only store backed by a JSON snapshot file

use super::{ApplicationStore, ConnectionDirectory, DataSource, GroupStore, IdentityProvider};
use crate::error::{AuthzError, Result};
use crate::types::{Application, Connection, Group, User, UserId};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Snapshot document layout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub groups: Vec<Group>,

    #[serde(default)]
    pub applications: Vec<Application>,

    #[serde(default)]
    pub connections: Vec<Connection>,

    #[serde(default)]
    pub users: Vec<User>,
}

struct Loaded {
    snapshot: Snapshot,
    fingerprint: String,
}

/// Store serving groups, applications, connections and users from one file
///
/// The fingerprint is the BLAKE3 hash of the file contents. After
/// [`reload`](JsonFileStore::reload) picks up changed content, caches keyed
/// by the fingerprint load the new snapshot instead of serving the old one.
pub struct JsonFileStore {
    path: PathBuf,
    state: RwLock<Loaded>,
}

impl JsonFileStore {
    /// Read and parse the snapshot at `path`
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let loaded = Self::read(&path).await?;

        info!(
            path = %path.display(),
            groups = loaded.snapshot.groups.len(),
            applications = loaded.snapshot.applications.len(),
            "opened snapshot store"
        );

        Ok(Self {
            path,
            state: RwLock::new(loaded),
        })
    }

    /// Re-read the file; returns true if its content changed
    pub async fn reload(&self) -> Result<bool> {
        let loaded = Self::read(&self.path).await?;
        let mut state = self.state.write();

        if state.fingerprint == loaded.fingerprint {
            return Ok(false);
        }

        info!(path = %self.path.display(), fingerprint = %loaded.fingerprint, "snapshot changed");
        *state = loaded;
        Ok(true)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(path: &Path) -> Result<Loaded> {
        let contents = tokio::fs::read(path).await?;
        let snapshot: Snapshot = serde_json::from_slice(&contents).map_err(|e| {
            AuthzError::Serialization(format!("{}: {}", path.display(), e))
        })?;

        Ok(Loaded {
            snapshot,
            fingerprint: blake3::hash(&contents).to_hex().to_string(),
        })
    }
}

impl DataSource for JsonFileStore {
    fn fingerprint(&self) -> Option<String> {
        Some(self.state.read().fingerprint.clone())
    }
}

#[async_trait]
impl GroupStore for JsonFileStore {
    async fn get_groups(&self) -> Result<Vec<Group>> {
        Ok(self.state.read().snapshot.groups.clone())
    }
}

#[async_trait]
impl ApplicationStore for JsonFileStore {
    async fn get_applications(&self) -> Result<Vec<Application>> {
        Ok(self.state.read().snapshot.applications.clone())
    }
}

#[async_trait]
impl ConnectionDirectory for JsonFileStore {
    async fn get_connections(&self, _fields: &[&str]) -> Result<Vec<Connection>> {
        Ok(self.state.read().snapshot.connections.clone())
    }
}

#[async_trait]
impl IdentityProvider for JsonFileStore {
    async fn get_users_by_id(&self, ids: &[UserId]) -> Result<Vec<User>> {
        let state = self.state.read();
        Ok(ids
            .iter()
            .filter_map(|id| state.snapshot.users.iter().find(|u| &u.user_id == id).cloned())
            .collect())
    }
}
