//! # Group Authorization
//!
//! Group membership and application access resolution for an identity
//! provider extension.
//!
//! ## Features
//!
//! - **Nested groups** resolved with cycle-safe closures in both directions
//! - **Dynamic membership** from connection group claims
//! - **Application access** restricted to group sets
//! - **Memoized caching** with TTL, LRU bounds and coalesced loads
//! - **Async-first design** using Tokio runtime
//!
//! ## Example
//!
//! ```rust
//! use groupauthz::{AuthzConfig, AuthzService, Group, InMemoryStore, Stores};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(InMemoryStore::with_data(
//!         vec![
//!             Group::new("g1", "Engineering").with_nested(["g2"]),
//!             Group::new("g2", "Platform").with_members(["auth0|alice"]),
//!         ],
//!         vec![],
//!     ));
//!     let directory = Arc::new(groupauthz::InMemoryDirectory::new());
//!
//!     let service = AuthzService::new(
//!         &AuthzConfig::default(),
//!         Stores {
//!             groups: store.clone(),
//!             applications: store,
//!             connections: directory.clone(),
//!             identity: directory,
//!         },
//!     );
//!
//!     let groups = service.membership().user_groups("auth0|alice").await?;
//!     assert_eq!(groups, vec!["Engineering", "Platform"]);
//!
//!     Ok(())
//! }
//! ```

pub mod access;
pub mod cache;
pub mod config;
pub mod dynamic;
pub mod error;
pub mod graph;
pub mod membership;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use access::{is_access_allowed, AccessDecisionEngine};
pub use cache::{CacheConfig, CacheStats, DataCache, DataCacheStats, MemoizedCache};
pub use config::AuthzConfig;
pub use dynamic::{match_dynamic_groups, DynamicMembershipResolver};
pub use error::{AuthzError, Result};
pub use graph::{child_closure, flatten_members, parent_closure, user_group_names, GroupGraph};
pub use membership::MembershipResolver;
pub use service::{AuthzService, Stores};
pub use store::{
    ApplicationStore, ConnectionDirectory, DataSource, GroupStore, IdentityProvider,
    InMemoryDirectory, InMemoryStore, JsonFileStore, Snapshot,
};
pub use types::{
    Application, Connection, Group, GroupMapping, GroupSummary, MappingView, MemberProfile,
    NestedMember, ResolvedMembership, User,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
