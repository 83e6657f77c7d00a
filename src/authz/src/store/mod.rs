//! Collaborator traits for group, application and identity data
//!
//! The resolvers only read through these traits. Every store owns its own
//! mutations; the resolvers see whatever a fetch returns and cache it for the
//! configured TTL.

mod json;
mod memory;

pub use json::{JsonFileStore, Snapshot};
pub use memory::{InMemoryDirectory, InMemoryStore};

use crate::error::{AuthzError, Result};
use crate::types::{Application, Connection, Group, User, UserId};
use async_trait::async_trait;

/// A data source that can name the version of its content
pub trait DataSource: Send + Sync {
    /// Fingerprint of the current content, used as the cache key
    ///
    /// Sources returning `None` are cached under a fixed per-collection key.
    fn fingerprint(&self) -> Option<String> {
        None
    }
}

/// Group store
#[async_trait]
pub trait GroupStore: DataSource {
    /// List every group
    async fn get_groups(&self) -> Result<Vec<Group>>;

    /// Get a group by id
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError::NotFound`] if no group has this id.
    async fn get_group(&self, id: &str) -> Result<Group> {
        self.get_groups()
            .await?
            .into_iter()
            .find(|g| g.id == id)
            .ok_or_else(|| AuthzError::not_found("group", id))
    }
}

/// Application store
#[async_trait]
pub trait ApplicationStore: DataSource {
    /// List every application
    async fn get_applications(&self) -> Result<Vec<Application>>;
}

/// Identity-provider connection directory
#[async_trait]
pub trait ConnectionDirectory: DataSource {
    /// List connections, restricted to the requested fields where supported
    async fn get_connections(&self, fields: &[&str]) -> Result<Vec<Connection>>;

    /// Get a connection by id
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError::NotFound`] if the connection does not exist.
    async fn get_connection(&self, id: &str) -> Result<Connection> {
        self.get_connections(&[])
            .await?
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| AuthzError::not_found("connection", id))
    }
}

/// Identity provider user lookups
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Users for the given ids; unknown ids are omitted
    async fn get_users_by_id(&self, ids: &[UserId]) -> Result<Vec<User>>;
}
