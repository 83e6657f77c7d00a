//! Group membership views joined with identity-provider data

use crate::cache::DataCache;
use crate::error::{AuthzError, Result};
use crate::graph::{flatten_members, GroupGraph};
use crate::store::{ConnectionDirectory, GroupStore, IdentityProvider};
use crate::types::{Group, MappingView, MemberProfile, NestedMember, User, UserId};

use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Connection lookups allowed in flight while labelling mappings
pub const MAPPING_LOOKUP_CONCURRENCY: usize = 10;

/// Resolves users' groups and groups' members
///
/// `user_groups` reads through the shared cache. The per-group listings read
/// the group store directly, so administrators see their own edits
/// immediately.
pub struct MembershipResolver {
    cache: Arc<DataCache>,
    groups: Arc<dyn GroupStore>,
    directory: Arc<dyn ConnectionDirectory>,
    identity: Arc<dyn IdentityProvider>,
}

impl MembershipResolver {
    pub fn new(
        cache: Arc<DataCache>,
        groups: Arc<dyn GroupStore>,
        directory: Arc<dyn ConnectionDirectory>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            cache,
            groups,
            directory,
            identity,
        }
    }

    /// Names of every group `user_id` belongs to, directly or through nesting
    pub async fn user_groups(&self, user_id: &str) -> Result<Vec<String>> {
        let groups = self.cache.groups(self.groups.as_ref()).await?;
        let names = GroupGraph::new(&groups).user_group_names(user_id);

        debug!(user_id, groups = names.len(), "resolved user groups");
        Ok(names)
    }

    /// Groups directly nested under `group_id`, sorted by name
    pub async fn nested_groups(&self, group_id: &str) -> Result<Vec<Group>> {
        let groups = self.groups.get_groups().await?;
        let graph = GroupGraph::new(&groups);

        if graph.get(group_id).is_none() {
            return Err(AuthzError::not_found("group", group_id));
        }

        Ok(graph.direct_children(group_id).into_iter().cloned().collect())
    }

    /// Direct members of `group_id`, most recent login first
    pub async fn direct_members(&self, group_id: &str) -> Result<Vec<User>> {
        let group = self.groups.get_group(group_id).await?;
        let mut users = self.identity.get_users_by_id(&group.members).await?;

        // None sorts before Some, so never-logged-in users end up last
        users.sort_by(|a, b| b.last_login.cmp(&a.last_login));
        Ok(users)
    }

    /// Every user in the child closure of `group_id`, sorted by name
    ///
    /// Each user is attributed to the first group in the closure that lists
    /// them.
    pub async fn nested_members(&self, group_id: &str) -> Result<Vec<NestedMember>> {
        let groups = self.groups.get_groups().await?;
        let graph = GroupGraph::new(&groups);

        if graph.get(group_id).is_none() {
            return Err(AuthzError::not_found("group", group_id));
        }

        let memberships = flatten_members(graph.child_closure([group_id]));
        let user_ids: Vec<UserId> = memberships.iter().map(|m| m.user_id.clone()).collect();
        let attributed: HashMap<&str, &Group> = memberships
            .iter()
            .map(|m| (m.user_id.as_str(), &m.group))
            .collect();

        let users = self.identity.get_users_by_id(&user_ids).await?;
        let mut members: Vec<NestedMember> = users
            .iter()
            .map(|user| NestedMember {
                user: MemberProfile::from(user),
                group: attributed.get(user.user_id.as_str()).map(|g| g.summary()),
            })
            .collect();

        members.sort_by(|a, b| a.user.name.cmp(&b.user.name));
        Ok(members)
    }

    /// Mappings of `group_id` labelled with their connection
    ///
    /// Mappings whose connection no longer exists are left out.
    pub async fn mapping_names(&self, group_id: &str) -> Result<Vec<MappingView>> {
        let group = self.groups.get_group(group_id).await?;

        let views: Vec<Option<MappingView>> = stream::iter(group.mappings)
            .map(|mapping| async move {
                let lookup = self
                    .cache
                    .connection(self.directory.as_ref(), &mapping.connection_id)
                    .await;

                match lookup {
                    Ok(connection) => Ok(Some(MappingView {
                        connection_name: connection.label(),
                        mapping,
                    })),
                    Err(err) if err.is_not_found() => {
                        warn!(
                            group_id,
                            connection_id = %mapping.connection_id,
                            "mapping refers to a missing connection"
                        );
                        Ok(None)
                    }
                    Err(err) => Err(err),
                }
            })
            .buffered(MAPPING_LOOKUP_CONCURRENCY)
            .try_collect()
            .await?;

        Ok(views.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryDirectory, InMemoryStore};
    use crate::types::{Connection, GroupMapping};
    use chrono::{TimeZone, Utc};

    fn resolver(store: InMemoryStore, directory: InMemoryDirectory) -> MembershipResolver {
        let directory = Arc::new(directory);
        MembershipResolver::new(
            Arc::new(DataCache::default()),
            Arc::new(store),
            directory.clone(),
            directory,
        )
    }

    #[tokio::test]
    async fn test_direct_members_ordered_by_last_login() {
        let store = InMemoryStore::with_data(
            vec![Group::new("g1", "One").with_members(["old", "never", "recent"])],
            vec![],
        );
        let directory = InMemoryDirectory::with_data(
            vec![],
            vec![
                User::new("old")
                    .with_last_login(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()),
                User::new("never"),
                User::new("recent")
                    .with_last_login(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()),
            ],
        );

        let users = resolver(store, directory).direct_members("g1").await.unwrap();
        let ids: Vec<&str> = users.iter().map(|u| u.user_id.as_str()).collect();
        assert_eq!(ids, vec!["recent", "old", "never"]);
    }

    #[tokio::test]
    async fn test_nested_groups_unknown_group() {
        let resolver = resolver(InMemoryStore::new(), InMemoryDirectory::new());
        let err = resolver.nested_groups("missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_mapping_names_skip_missing_connections() {
        let store = InMemoryStore::with_data(
            vec![Group::new("g1", "One")
                .with_mapping(GroupMapping::new("c1", "eng"))
                .with_mapping(GroupMapping::new("gone", "old"))
                .with_mapping(GroupMapping::new("c2", "ops"))],
            vec![],
        );
        let directory = InMemoryDirectory::with_data(
            vec![
                Connection::new("c1", "db", "auth0"),
                Connection::new("c2", "corp-ad", "ad"),
            ],
            vec![],
        );

        let views = resolver(store, directory).mapping_names("g1").await.unwrap();
        let labels: Vec<(&str, &str)> = views
            .iter()
            .map(|v| (v.mapping.group_name.as_str(), v.connection_name.as_str()))
            .collect();
        assert_eq!(labels, vec![("eng", "db (auth0)"), ("ops", "corp-ad (ad)")]);
    }
}
