//! End-to-end resolution through the service over counting stores

use async_trait::async_trait;
use groupauthz::{
    Application, ApplicationStore, AuthzConfig, AuthzError, AuthzService, Connection,
    ConnectionDirectory, DataSource, Group, GroupMapping, GroupStore, IdentityProvider, Result,
    Stores, User,
};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// MOCK STORES
// ============================================================================

/// Store that counts every fetch
#[derive(Default)]
struct CountingStore {
    groups: Vec<Group>,
    applications: Vec<Application>,
    connections: Vec<Connection>,
    users: Vec<User>,
    group_fetches: AtomicUsize,
    application_fetches: AtomicUsize,
    connection_fetches: AtomicUsize,
    fail_connection_lookups: bool,
}

impl CountingStore {
    fn fetches(&self) -> usize {
        self.group_fetches.load(Ordering::SeqCst)
            + self.application_fetches.load(Ordering::SeqCst)
            + self.connection_fetches.load(Ordering::SeqCst)
    }
}

impl DataSource for CountingStore {}

#[async_trait]
impl GroupStore for CountingStore {
    async fn get_groups(&self) -> Result<Vec<Group>> {
        self.group_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.groups.clone())
    }
}

#[async_trait]
impl ApplicationStore for CountingStore {
    async fn get_applications(&self) -> Result<Vec<Application>> {
        self.application_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.applications.clone())
    }
}

#[async_trait]
impl ConnectionDirectory for CountingStore {
    async fn get_connections(&self, _fields: &[&str]) -> Result<Vec<Connection>> {
        self.connection_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.connections.clone())
    }

    async fn get_connection(&self, id: &str) -> Result<Connection> {
        if self.fail_connection_lookups {
            return Err(AuthzError::IdentityProvider("rate limited".to_string()));
        }
        self.connections
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| AuthzError::not_found("connection", id))
    }
}

#[async_trait]
impl IdentityProvider for CountingStore {
    async fn get_users_by_id(&self, ids: &[String]) -> Result<Vec<User>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.users.iter().find(|u| &u.user_id == id).cloned())
            .collect())
    }
}

fn claims(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn fixture() -> CountingStore {
    CountingStore {
        groups: vec![
            Group::new("g1", "Engineering")
                .with_description("All engineers")
                .with_nested(["g2", "g3"])
                .with_members(["zoe"])
                .with_mapping(GroupMapping::new("c1", "eng")),
            Group::new("g2", "Platform")
                .with_nested(["g4"])
                .with_members(["alice", "bob"]),
            Group::new("g3", "Frontend").with_members(["bob", "carol"]),
            // Cycle back to the root
            Group::new("g4", "Oncall").with_nested(["g1"]).with_members(["dave"]),
            Group::new("g5", "Sales")
                .with_members(["erin"])
                .with_mapping(GroupMapping::new("c1", "sales"))
                .with_mapping(GroupMapping::new("c9", "legacy"))
                .with_mapping(GroupMapping::new("c2", "emea")),
        ],
        applications: vec![
            Application::new("restricted-app").with_groups(["g2"]),
            Application::new("open-app"),
        ],
        connections: vec![
            Connection::new("c1", "db", "auth0"),
            Connection::new("c2", "Corp-AD", "ad"),
        ],
        users: vec![
            User::new("alice").with_name("Alice"),
            User::new("bob").with_name("Bob"),
            User::new("carol").with_name("Carol"),
            User::new("dave").with_name("Dave"),
            User::new("zoe").with_name("Zoe"),
        ],
        ..Default::default()
    }
}

fn service(store: Arc<CountingStore>) -> AuthzService {
    AuthzService::new(&AuthzConfig::default(), Stores::from_shared(store))
}

// ============================================================================
// DYNAMIC MEMBERSHIP
// ============================================================================

#[tokio::test]
async fn test_dynamic_fast_paths_skip_loaders() {
    let store = Arc::new(fixture());
    let service = service(store.clone());

    assert!(service.dynamic().resolve(None, &claims(&["eng"])).await.unwrap().is_empty());
    assert!(service.dynamic().resolve(Some(""), &claims(&["eng"])).await.unwrap().is_empty());
    assert!(service.dynamic().resolve(Some("db"), &[]).await.unwrap().is_empty());

    assert_eq!(store.fetches(), 0, "no store should be read");
}

#[tokio::test]
async fn test_dynamic_join() {
    let store = Arc::new(fixture());
    let service = service(store.clone());

    let names = service.dynamic().resolve(Some("db"), &claims(&["eng"])).await.unwrap();
    assert_eq!(names, vec!["Engineering"]);

    let names = service
        .dynamic()
        .resolve(Some("Corp-AD"), &claims(&["emea", "eng"]))
        .await
        .unwrap();
    assert_eq!(names, vec!["Sales"]);

    assert!(service
        .dynamic()
        .resolve(Some("github"), &claims(&["eng"]))
        .await
        .unwrap()
        .is_empty());

    // Collections are loaded once and then served from cache
    assert_eq!(store.group_fetches.load(Ordering::SeqCst), 1);
    assert_eq!(store.connection_fetches.load(Ordering::SeqCst), 1);
}

// ============================================================================
// MEMBERSHIP
// ============================================================================

#[tokio::test]
async fn test_user_groups_through_nesting_and_cycle() {
    let service = service(Arc::new(fixture()));

    // dave is in g4, which is nested in g2, which is nested in g1, which g4 nests
    let groups = service.membership().user_groups("dave").await.unwrap();
    assert_eq!(groups, vec!["Engineering", "Platform", "Oncall"]);

    let groups = service.membership().user_groups("carol").await.unwrap();
    assert_eq!(groups, vec!["Engineering", "Platform", "Frontend", "Oncall"]);

    assert!(service.membership().user_groups("nobody").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_nested_members_attribution_and_order() {
    let service = service(Arc::new(fixture()));

    let members = service.membership().nested_members("g2").await.unwrap();
    let rows: Vec<(&str, &str)> = members
        .iter()
        .map(|m| {
            (
                m.user.user_id.as_str(),
                m.group.as_ref().map(|g| g.id.as_str()).unwrap_or_default(),
            )
        })
        .collect();

    // Closure of g2 is g1, g2, g3, g4 in collection order; bob is first seen in g2
    assert_eq!(
        rows,
        vec![
            ("alice", "g2"),
            ("bob", "g2"),
            ("carol", "g3"),
            ("dave", "g4"),
            ("zoe", "g1"),
        ]
    );

    let err = service.membership().nested_members("missing").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_nested_groups_sorted_by_name() {
    let service = service(Arc::new(fixture()));
    let children = service.membership().nested_groups("g1").await.unwrap();
    let names: Vec<&str> = children.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["Frontend", "Platform"]);
}

#[tokio::test]
async fn test_mapping_names() {
    let store = Arc::new(fixture());
    let service = service(store);

    let views = service.membership().mapping_names("g5").await.unwrap();
    let labels: Vec<&str> = views.iter().map(|v| v.connection_name.as_str()).collect();
    assert_eq!(labels, vec!["db (auth0)", "Corp-AD (ad)"]);
}

#[tokio::test]
async fn test_mapping_names_propagates_directory_errors() {
    let store = Arc::new(CountingStore {
        fail_connection_lookups: true,
        ..fixture()
    });
    let service = service(store);

    let err = service.membership().mapping_names("g5").await.unwrap_err();
    assert!(matches!(err, AuthzError::IdentityProvider(_)));
}

// ============================================================================
// ACCESS
// ============================================================================

#[tokio::test]
async fn test_access_decisions() {
    let store = Arc::new(fixture());
    let service = service(store.clone());

    assert!(service.access().check("restricted-app", &["g2"]).await.unwrap());
    assert!(!service.access().check("restricted-app", &["g1", "g3"]).await.unwrap());
    assert!(!service.access().check::<&str>("restricted-app", &[]).await.unwrap());
    assert!(service.access().check::<&str>("open-app", &[]).await.unwrap());
    assert!(service.access().check("unknown-app", &["g9"]).await.unwrap());

    assert_eq!(store.application_fetches.load(Ordering::SeqCst), 1);
}

// ============================================================================
// PROPERTY-BASED TESTS (PROPTEST)
// ============================================================================

proptest! {
    #[test]
    fn prop_access_requires_shared_group(
        allowed in prop::collection::vec("g[0-9]", 0..4),
        held in prop::collection::vec("g[0-9]", 0..4),
    ) {
        tokio_test::block_on(async {
            let store = Arc::new(CountingStore {
                applications: vec![Application::new("app").with_groups(allowed.clone())],
                ..Default::default()
            });
            let service = service(store);

            let decision = service.access().check("app", &held).await.unwrap();
            let expected = allowed.is_empty() || held.iter().any(|g| allowed.contains(g));
            assert_eq!(decision, expected);
        });
    }
}
