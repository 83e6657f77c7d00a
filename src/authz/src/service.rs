//! Wiring of stores, caches and resolvers

use crate::access::AccessDecisionEngine;
use crate::cache::{DataCache, DataCacheStats};
use crate::config::AuthzConfig;
use crate::dynamic::DynamicMembershipResolver;
use crate::membership::MembershipResolver;
use crate::store::{ApplicationStore, ConnectionDirectory, GroupStore, IdentityProvider};

use std::sync::Arc;

/// The collaborators the service reads from
#[derive(Clone)]
pub struct Stores {
    pub groups: Arc<dyn GroupStore>,
    pub applications: Arc<dyn ApplicationStore>,
    pub connections: Arc<dyn ConnectionDirectory>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl Stores {
    /// Use one value for every collaborator
    pub fn from_shared<S>(store: Arc<S>) -> Self
    where
        S: GroupStore + ApplicationStore + ConnectionDirectory + IdentityProvider + 'static,
    {
        Self {
            groups: store.clone(),
            applications: store.clone(),
            connections: store.clone(),
            identity: store,
        }
    }
}

/// Membership, dynamic membership and access resolution over one cache
pub struct AuthzService {
    cache: Arc<DataCache>,
    membership: MembershipResolver,
    dynamic: DynamicMembershipResolver,
    access: AccessDecisionEngine,
}

impl AuthzService {
    pub fn new(config: &AuthzConfig, stores: Stores) -> Self {
        let cache = Arc::new(DataCache::new(config.data_cache(), config.connection_cache()));
        Self::with_cache(cache, stores)
    }

    /// Build the resolvers over an existing cache
    pub fn with_cache(cache: Arc<DataCache>, stores: Stores) -> Self {
        Self {
            membership: MembershipResolver::new(
                cache.clone(),
                stores.groups.clone(),
                stores.connections.clone(),
                stores.identity,
            ),
            dynamic: DynamicMembershipResolver::new(
                cache.clone(),
                stores.groups,
                stores.connections,
            ),
            access: AccessDecisionEngine::new(cache.clone(), stores.applications),
            cache,
        }
    }

    pub fn membership(&self) -> &MembershipResolver {
        &self.membership
    }

    pub fn dynamic(&self) -> &DynamicMembershipResolver {
        &self.dynamic
    }

    pub fn access(&self) -> &AccessDecisionEngine {
        &self.access
    }

    pub fn cache(&self) -> &Arc<DataCache> {
        &self.cache
    }

    pub fn cache_stats(&self) -> DataCacheStats {
        self.cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryDirectory, InMemoryStore};
    use crate::types::{Application, Connection, Group, GroupMapping};

    #[tokio::test]
    async fn test_resolvers_share_one_cache() {
        let store = InMemoryStore::with_data(
            vec![Group::new("g1", "Engineering")
                .with_members(["u1"])
                .with_mapping(GroupMapping::new("c1", "eng"))],
            vec![Application::new("app").with_groups(["g1"])],
        );
        let directory = Arc::new(InMemoryDirectory::with_data(
            vec![Connection::new("c1", "db", "auth0")],
            vec![],
        ));
        let store = Arc::new(store);
        let stores = Stores {
            groups: store.clone(),
            applications: store,
            connections: directory.clone(),
            identity: directory,
        };

        let service = AuthzService::new(&AuthzConfig::default(), stores);

        assert_eq!(service.membership().user_groups("u1").await.unwrap(), vec!["Engineering"]);
        assert_eq!(
            service.dynamic().resolve(Some("db"), &["eng".to_string()]).await.unwrap(),
            vec!["Engineering"]
        );
        assert!(service.access().check("app", &["g1"]).await.unwrap());

        let stats = service.cache_stats();
        assert_eq!(stats.groups.loads, 1);
        assert_eq!(stats.groups.hits, 1);
        assert_eq!(stats.applications.loads, 1);
        assert_eq!(stats.connections.loads, 1);
    }

    #[tokio::test]
    async fn test_invalidate_all_reloads_every_collection() {
        let store = Arc::new(InMemoryStore::with_data(
            vec![Group::new("g1", "Engineering")
                .with_members(["u1"])
                .with_mapping(GroupMapping::new("c1", "eng"))],
            vec![Application::new("app").with_groups(["g1"])],
        ));
        let directory = Arc::new(InMemoryDirectory::with_data(
            vec![Connection::new("c1", "db", "auth0")],
            vec![],
        ));
        let service = AuthzService::new(
            &AuthzConfig::default(),
            Stores {
                groups: store.clone(),
                applications: store,
                connections: directory.clone(),
                identity: directory,
            },
        );

        let claims = ["eng".to_string()];
        for _ in 0..2 {
            service.dynamic().resolve(Some("db"), &claims).await.unwrap();
            service.access().check("app", &["g1"]).await.unwrap();
        }

        let stats = service.cache_stats();
        assert_eq!(stats.groups.loads, 1);
        assert_eq!(stats.applications.loads, 1);
        assert_eq!(stats.connections.loads, 1);

        service.cache().invalidate_all();
        assert_eq!(service.cache_stats().groups.entries, 0);

        service.dynamic().resolve(Some("db"), &claims).await.unwrap();
        service.access().check("app", &["g1"]).await.unwrap();

        let stats = service.cache_stats();
        assert_eq!(stats.groups.loads, 2);
        assert_eq!(stats.applications.loads, 2);
        assert_eq!(stats.connections.loads, 2);
    }
}
