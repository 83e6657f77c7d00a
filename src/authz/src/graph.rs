//! Cycle-safe traversal of the group nesting graph
//!
//! Groups form a directed graph through their `nested` lists. The graph is
//! never validated acyclic, so every traversal keeps a visited set keyed by
//! group id and works from an explicit worklist instead of recursing.
//!
//! Closures are returned in the iteration order of the supplied group
//! collection. Ids that appear as seeds or edges but are missing from the
//! collection are skipped silently.

use crate::types::{Group, ResolvedMembership};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Children,
    Parents,
}

/// Read-only view over a fetched group collection
///
/// Building the view indexes both edge directions once, so parent lookups do
/// not rescan every group per frontier node.
///
/// # Example
///
/// ```
/// use groupauthz::graph::GroupGraph;
/// use groupauthz::types::Group;
///
/// let groups = vec![
///     Group::new("a", "A").with_nested(["b"]),
///     Group::new("b", "B").with_nested(["a"]),
/// ];
/// let graph = GroupGraph::new(&groups);
///
/// let closure = graph.child_closure(["a"]);
/// assert_eq!(closure.len(), 2);
/// ```
#[derive(Debug)]
pub struct GroupGraph<'a> {
    groups: &'a [Group],

    /// First group stored under each id
    by_id: HashMap<&'a str, &'a Group>,

    /// Child id -> ids of every group listing it in `nested`
    parents: HashMap<&'a str, Vec<&'a str>>,
}

impl<'a> GroupGraph<'a> {
    pub fn new(groups: &'a [Group]) -> Self {
        let mut by_id = HashMap::with_capacity(groups.len());
        let mut parents: HashMap<&'a str, Vec<&'a str>> = HashMap::new();

        for group in groups {
            by_id.entry(group.id.as_str()).or_insert(group);
            for child in &group.nested {
                parents
                    .entry(child.as_str())
                    .or_default()
                    .push(group.id.as_str());
            }
        }

        Self {
            groups,
            by_id,
            parents,
        }
    }

    /// Look up a group by id
    pub fn get(&self, id: &str) -> Option<&'a Group> {
        self.by_id.get(id).copied()
    }

    /// Seeds plus every group reachable through `nested` edges
    pub fn child_closure<I, S>(&self, seeds: I) -> Vec<&'a Group>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let visited = self.traverse(seeds, Direction::Children);
        self.collect(&visited)
    }

    /// Seeds plus every group that transitively nests one of them
    pub fn parent_closure<I, S>(&self, seeds: I) -> Vec<&'a Group>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let visited = self.traverse(seeds, Direction::Parents);
        self.collect(&visited)
    }

    /// Groups directly nested under `id`, sorted by name
    pub fn direct_children(&self, id: &str) -> Vec<&'a Group> {
        let Some(group) = self.get(id) else {
            return Vec::new();
        };

        let mut children: Vec<&'a Group> = self
            .groups
            .iter()
            .filter(|g| group.nested.contains(&g.id))
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        children
    }

    /// Names of the groups `user_id` belongs to, directly or via nesting
    ///
    /// Direct memberships are expanded through the parent closure: members of
    /// a nested child are members of every group above it.
    pub fn user_group_names(&self, user_id: &str) -> Vec<String> {
        let direct: Vec<&str> = self
            .groups
            .iter()
            .filter(|g| g.has_member(user_id))
            .map(|g| g.id.as_str())
            .collect();

        if direct.is_empty() {
            return Vec::new();
        }

        self.parent_closure(direct)
            .into_iter()
            .map(|g| g.name.clone())
            .collect()
    }

    fn neighbours(&self, id: &str, direction: Direction) -> Vec<&'a str> {
        match direction {
            Direction::Children => self
                .get(id)
                .map(|g| g.nested.iter().map(String::as_str).collect())
                .unwrap_or_default(),
            Direction::Parents => self.parents.get(id).cloned().unwrap_or_default(),
        }
    }

    fn traverse<I, S>(&self, seeds: I, direction: Direction) -> HashSet<&'a str>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut visited: HashSet<&'a str> = HashSet::new();
        let mut stack: Vec<&'a str> = Vec::new();

        for seed in seeds {
            // A seed absent from the collection can never appear in the output
            if let Some((&id, _)) = self.by_id.get_key_value(seed.as_ref()) {
                if visited.insert(id) {
                    stack.push(id);
                }
            }
        }

        while let Some(current) = stack.pop() {
            for next in self.neighbours(current, direction) {
                if visited.insert(next) {
                    stack.push(next);
                }
            }
        }

        visited
    }

    fn collect(&self, visited: &HashSet<&'a str>) -> Vec<&'a Group> {
        self.groups
            .iter()
            .filter(|g| visited.contains(g.id.as_str()))
            .collect()
    }
}

/// Child closure of `seeds` over `groups`
pub fn child_closure<'a, I, S>(groups: &'a [Group], seeds: I) -> Vec<&'a Group>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    GroupGraph::new(groups).child_closure(seeds)
}

/// Parent closure of `seeds` over `groups`
pub fn parent_closure<'a, I, S>(groups: &'a [Group], seeds: I) -> Vec<&'a Group>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    GroupGraph::new(groups).parent_closure(seeds)
}

/// Group names a user resolves to over `groups`
pub fn user_group_names(groups: &[Group], user_id: &str) -> Vec<String> {
    GroupGraph::new(groups).user_group_names(user_id)
}

/// Flatten group members into one entry per user
///
/// Groups are walked in the given order and a user is attributed to the
/// first group that lists them. Later occurrences are ignored, so the output
/// order is the order of first appearance.
pub fn flatten_members<'a, I>(groups: I) -> Vec<ResolvedMembership>
where
    I: IntoIterator<Item = &'a Group>,
{
    let mut seen: HashSet<&'a str> = HashSet::new();
    let mut members = Vec::new();

    for group in groups {
        for user_id in &group.members {
            if seen.insert(user_id.as_str()) {
                members.push(ResolvedMembership {
                    user_id: user_id.clone(),
                    group: group.clone(),
                });
            }
        }
    }

    members
}
