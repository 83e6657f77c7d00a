//! Core group, application and identity types
//!
//! Field names follow the stored document layout (`_id`, `connectionId`,
//! `groupName`, `user_id`) so snapshots exported by the group store can be
//! read without translation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque group identifier
pub type GroupId = String;

/// Identity-provider user identifier
pub type UserId = String;

/// Identity-provider connection identifier
pub type ConnectionId = String;

/// Application (client) identifier
pub type ApplicationId = String;

/// Rule mapping a connection claim onto group membership
///
/// A user who logs in through `connection_id` and carries a group claim equal
/// to `group_name` is a dynamic member of the owning group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMapping {
    /// Mapping identifier (assigned by the store)
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Connection the claim must come from
    #[serde(rename = "connectionId")]
    pub connection_id: ConnectionId,

    /// Claimed group name, matched exactly
    #[serde(rename = "groupName")]
    pub group_name: String,
}

impl GroupMapping {
    /// Create a mapping without an id
    pub fn new(connection_id: impl Into<String>, group_name: impl Into<String>) -> Self {
        Self {
            id: None,
            connection_id: connection_id.into(),
            group_name: group_name.into(),
        }
    }

    /// Returns true if this mapping grants membership for the claim set
    pub fn matches(&self, connection_id: &str, claimed: &[String]) -> bool {
        self.connection_id == connection_id && claimed.iter().any(|c| *c == self.group_name)
    }
}

/// Group with direct members, nested child groups and dynamic mappings
///
/// `nested` is a plain edge list and may form cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    #[serde(rename = "_id")]
    pub id: GroupId,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Direct members
    #[serde(default)]
    pub members: Vec<UserId>,

    /// Child group ids
    #[serde(default)]
    pub nested: Vec<GroupId>,

    /// Dynamic membership rules, in insertion order
    #[serde(default)]
    pub mappings: Vec<GroupMapping>,
}

impl Group {
    /// Create an empty group
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            members: Vec::new(),
            nested: Vec::new(),
            mappings: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_members<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.members.extend(members.into_iter().map(Into::into));
        self
    }

    pub fn with_nested<I, S>(mut self, nested: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.nested.extend(nested.into_iter().map(Into::into));
        self
    }

    pub fn with_mapping(mut self, mapping: GroupMapping) -> Self {
        self.mappings.push(mapping);
        self
    }

    /// Direct membership check
    pub fn has_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m == user_id)
    }

    /// Returns true if any mapping matches the connection and claims
    pub fn matches_claims(&self, connection_id: &str, claimed: &[String]) -> bool {
        self.mappings.iter().any(|m| m.matches(connection_id, claimed))
    }

    /// Short form used in member listings
    pub fn summary(&self) -> GroupSummary {
        GroupSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }
}

/// Group identity without members, nesting or mappings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    #[serde(rename = "_id")]
    pub id: GroupId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Application (client) with an optional group restriction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    #[serde(rename = "_id")]
    pub id: ApplicationId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Groups allowed to use the application; empty means unrestricted
    #[serde(default)]
    pub groups: Vec<GroupId>,
}

impl Application {
    /// Create an unrestricted application
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            groups: Vec::new(),
        }
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.extend(groups.into_iter().map(Into::into));
        self
    }

    /// True when no group restriction is configured
    pub fn is_unrestricted(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Identity-provider connection metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub name: String,
    pub strategy: String,
}

impl Connection {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        strategy: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            strategy: strategy.into(),
        }
    }

    /// Display label used next to group mappings
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.strategy)
    }
}

/// Identity-provider user profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: None,
            nickname: None,
            email: None,
            last_login: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_last_login(mut self, last_login: DateTime<Utc>) -> Self {
        self.last_login = Some(last_login);
        self
    }
}

/// A user and the first group in a closure found to contain them
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedMembership {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub group: Group,
}

/// Mapping annotated with its connection label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingView {
    #[serde(flatten)]
    pub mapping: GroupMapping,

    #[serde(rename = "connectionName")]
    pub connection_name: String,
}

/// User profile subset shown in nested member listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberProfile {
    pub user_id: UserId,
    pub name: Option<String>,
    pub nickname: Option<String>,
    pub email: Option<String>,
}

impl From<&User> for MemberProfile {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id.clone(),
            name: user.name.clone(),
            nickname: user.nickname.clone(),
            email: user.email.clone(),
        }
    }
}

/// Member of a group closure with the group it was attributed to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NestedMember {
    pub user: MemberProfile,
    pub group: Option<GroupSummary>,
}
