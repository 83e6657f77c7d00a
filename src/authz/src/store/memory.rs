//! In-memory store and directory implementations

use super::{ApplicationStore, ConnectionDirectory, DataSource, GroupStore, IdentityProvider};
use crate::error::{AuthzError, Result};
use crate::types::{Application, Connection, Group, GroupMapping, User, UserId};

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// In-memory group and application store
///
/// Collections keep insertion order, which is the order the resolvers see.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    groups: Arc<RwLock<Vec<Group>>>,
    applications: Arc<RwLock<Vec<Application>>>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `groups` and `applications`
    pub fn with_data(groups: Vec<Group>, applications: Vec<Application>) -> Self {
        Self {
            groups: Arc::new(RwLock::new(groups)),
            applications: Arc::new(RwLock::new(applications)),
        }
    }

    /// Insert a new group, assigning an id when it has none
    pub async fn create_group(&self, mut group: Group) -> Result<Group> {
        let mut groups = self.groups.write().await;

        if group.id.is_empty() {
            group.id = Uuid::new_v4().to_string();
        } else if groups.iter().any(|g| g.id == group.id) {
            return Err(AuthzError::Store(format!("group '{}' already exists", group.id)));
        }

        debug!(group_id = %group.id, name = %group.name, "creating group");
        groups.push(group.clone());
        Ok(group)
    }

    /// Replace a group, keeping its id
    pub async fn update_group(&self, id: &str, mut group: Group) -> Result<Group> {
        group.id = id.to_string();
        self.modify(id, |existing| *existing = group.clone()).await?;
        Ok(group)
    }

    pub async fn delete_group(&self, id: &str) -> Result<()> {
        let mut groups = self.groups.write().await;
        let before = groups.len();
        groups.retain(|g| g.id != id);

        if groups.len() == before {
            return Err(AuthzError::not_found("group", id));
        }
        Ok(())
    }

    /// Add direct members, skipping ones already present
    pub async fn add_members(&self, id: &str, members: &[UserId]) -> Result<()> {
        self.modify(id, |group| {
            for member in members {
                if !group.members.contains(member) {
                    group.members.push(member.clone());
                }
            }
        })
        .await
    }

    pub async fn remove_member(&self, id: &str, user_id: &str) -> Result<()> {
        self.modify(id, |group| group.members.retain(|m| m != user_id))
            .await
    }

    /// Nest child groups under `id`, skipping duplicates and `id` itself
    ///
    /// Longer cycles are accepted; traversals tolerate them.
    pub async fn add_nested(&self, id: &str, nested: &[String]) -> Result<()> {
        self.modify(id, |group| {
            for child in nested {
                if child != id && !group.nested.contains(child) {
                    group.nested.push(child.clone());
                }
            }
        })
        .await
    }

    pub async fn remove_nested(&self, id: &str, child_id: &str) -> Result<()> {
        self.modify(id, |group| group.nested.retain(|n| n != child_id))
            .await
    }

    /// Append a mapping, assigning an id when it has none
    pub async fn add_mapping(&self, id: &str, mut mapping: GroupMapping) -> Result<GroupMapping> {
        if mapping.id.is_none() {
            mapping.id = Some(Uuid::new_v4().to_string());
        }

        let stored = mapping.clone();
        self.modify(id, move |group| group.mappings.push(stored)).await?;
        Ok(mapping)
    }

    /// Remove a mapping by its id; unknown mapping ids are ignored
    pub async fn remove_mapping(&self, id: &str, mapping_id: &str) -> Result<()> {
        self.modify(id, |group| {
            if let Some(pos) = group
                .mappings
                .iter()
                .position(|m| m.id.as_deref() == Some(mapping_id))
            {
                group.mappings.remove(pos);
            }
        })
        .await
    }

    /// Insert or replace an application
    pub async fn put_application(&self, application: Application) {
        let mut applications = self.applications.write().await;
        match applications.iter_mut().find(|a| a.id == application.id) {
            Some(existing) => *existing = application,
            None => applications.push(application),
        }
    }

    async fn modify<F>(&self, id: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Group),
    {
        let mut groups = self.groups.write().await;
        let group = groups
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or_else(|| AuthzError::not_found("group", id))?;
        f(group);
        Ok(())
    }
}

impl DataSource for InMemoryStore {}

#[async_trait]
impl GroupStore for InMemoryStore {
    async fn get_groups(&self) -> Result<Vec<Group>> {
        Ok(self.groups.read().await.clone())
    }

    async fn get_group(&self, id: &str) -> Result<Group> {
        self.groups
            .read()
            .await
            .iter()
            .find(|g| g.id == id)
            .cloned()
            .ok_or_else(|| AuthzError::not_found("group", id))
    }
}

#[async_trait]
impl ApplicationStore for InMemoryStore {
    async fn get_applications(&self) -> Result<Vec<Application>> {
        Ok(self.applications.read().await.clone())
    }
}

/// In-memory connection directory and identity provider
#[derive(Clone, Default)]
pub struct InMemoryDirectory {
    connections: Arc<RwLock<Vec<Connection>>>,
    users: Arc<RwLock<Vec<User>>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(connections: Vec<Connection>, users: Vec<User>) -> Self {
        Self {
            connections: Arc::new(RwLock::new(connections)),
            users: Arc::new(RwLock::new(users)),
        }
    }

    pub async fn add_connection(&self, connection: Connection) {
        self.connections.write().await.push(connection);
    }

    pub async fn remove_connection(&self, id: &str) {
        self.connections.write().await.retain(|c| c.id != id);
    }

    pub async fn add_user(&self, user: User) {
        self.users.write().await.push(user);
    }
}

impl DataSource for InMemoryDirectory {}

#[async_trait]
impl ConnectionDirectory for InMemoryDirectory {
    async fn get_connections(&self, _fields: &[&str]) -> Result<Vec<Connection>> {
        Ok(self.connections.read().await.clone())
    }

    async fn get_connection(&self, id: &str) -> Result<Connection> {
        self.connections
            .read()
            .await
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| AuthzError::not_found("connection", id))
    }
}

#[async_trait]
impl IdentityProvider for InMemoryDirectory {
    async fn get_users_by_id(&self, ids: &[UserId]) -> Result<Vec<User>> {
        let users = self.users.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| users.iter().find(|u| &u.user_id == id).cloned())
            .collect())
    }
}
