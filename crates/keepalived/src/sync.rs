//! Sync-group membership, resolved in both directions: from structured
//! configuration while rendering, and from daemon text while parsing.

/// One sync group and its member instance names, in first-observed order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncGroup {
    pub name: String,
    pub members: Vec<String>,
}

/// Order-preserving map from sync-group name to member instances.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncGroupMap {
    groups: Vec<SyncGroup>,
}

impl SyncGroupMap {
    pub fn new() -> Self {
        SyncGroupMap::default()
    }

    /// Add `instance` to `group`, creating the group on first sight.
    pub fn insert(&mut self, group: &str, instance: String) {
        match self.groups.iter_mut().find(|g| g.name == group) {
            Some(existing) => existing.members.push(instance),
            None => self.groups.push(SyncGroup {
                name: group.to_string(),
                members: vec![instance],
            }),
        }
    }

    /// The sync group `instance` belongs to, if any.
    pub fn membership(&self, instance: &str) -> Option<&str> {
        self.groups
            .iter()
            .find(|g| g.members.iter().any(|m| m == instance))
            .map(|g| g.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SyncGroup> {
        self.groups.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
