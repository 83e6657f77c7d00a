//! Dynamic group membership from connection claims
//!
//! A group gains a dynamic member when one of its mappings names the
//! connection the user logged in through and a group claim the user carries.
//! The claim comparison is exact and case-sensitive, even though connection
//! listings are sorted case-insensitively.

use crate::cache::DataCache;
use crate::error::Result;
use crate::store::{ConnectionDirectory, GroupStore};
use crate::types::{Connection, Group};

use std::sync::Arc;
use tracing::{debug, warn};

/// Resolves group names granted through mapping rules
pub struct DynamicMembershipResolver {
    cache: Arc<DataCache>,
    groups: Arc<dyn GroupStore>,
    directory: Arc<dyn ConnectionDirectory>,
}

impl DynamicMembershipResolver {
    pub fn new(
        cache: Arc<DataCache>,
        groups: Arc<dyn GroupStore>,
        directory: Arc<dyn ConnectionDirectory>,
    ) -> Self {
        Self {
            cache,
            groups,
            directory,
        }
    }

    /// Names of the groups whose mappings match the connection and claims
    ///
    /// Returns an empty list without touching any cache when the connection
    /// name is absent or empty, or when no claims are supplied. An unknown
    /// connection name is not an error; it matches nothing.
    ///
    /// # Errors
    ///
    /// Only cache loads can fail; their errors are returned unchanged.
    pub async fn resolve(
        &self,
        connection_name: Option<&str>,
        claimed: &[String],
    ) -> Result<Vec<String>> {
        let connection_name = match connection_name {
            Some(name) if !name.is_empty() => name,
            _ => return Ok(Vec::new()),
        };

        if claimed.is_empty() {
            return Ok(Vec::new());
        }

        let (groups, connections) = tokio::try_join!(
            self.cache.groups(self.groups.as_ref()),
            self.cache.connections(self.directory.as_ref()),
        )?;

        let names = match_dynamic_groups(&groups, &connections, connection_name, claimed);
        debug!(
            connection = connection_name,
            claims = claimed.len(),
            matched = names.len(),
            "resolved dynamic groups"
        );
        Ok(names)
    }
}

/// Join groups, connections and claims into dynamic group names
///
/// The connection is looked up by exact name. Names are returned in the
/// iteration order of `groups`.
pub fn match_dynamic_groups(
    groups: &[Group],
    connections: &[Connection],
    connection_name: &str,
    claimed: &[String],
) -> Vec<String> {
    let Some(connection) = connections.iter().find(|c| c.name == connection_name) else {
        warn!(connection = connection_name, "unknown connection, no dynamic groups");
        return Vec::new();
    };

    groups
        .iter()
        .filter(|g| g.matches_claims(&connection.id, claimed))
        .map(|g| g.name.clone())
        .collect()
}
