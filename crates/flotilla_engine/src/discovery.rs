use std::collections::BTreeMap;

use crate::{DiscoveryError, Target};

/// Resolves a named group to its live targets.
#[async_trait::async_trait]
pub trait Discovery: Send + Sync {
    async fn resolve_targets(&self, group: &str) -> Result<Vec<Target>, DiscoveryError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMember {
    pub target: Target,
    pub ready: bool,
}

/// Discovery over a fixed membership table, typically loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticDiscovery {
    groups: BTreeMap<String, Vec<GroupMember>>,
}

impl StaticDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(mut self, name: impl Into<String>, members: Vec<GroupMember>) -> Self {
        self.groups.insert(name.into(), members);
        self
    }
}

#[async_trait::async_trait]
impl Discovery for StaticDiscovery {
    async fn resolve_targets(&self, group: &str) -> Result<Vec<Target>, DiscoveryError> {
        let members = self
            .groups
            .get(group)
            .ok_or_else(|| DiscoveryError::UnknownGroup(group.to_string()))?;

        let targets: Vec<Target> = members
            .iter()
            .filter(|member| member.ready)
            .map(|member| member.target.clone())
            .collect();

        if targets.is_empty() {
            return Err(DiscoveryError::NoLiveTargets(group.to_string()));
        }
        Ok(targets)
    }
}
