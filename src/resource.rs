//! Resource identity and teardown ordering
//!
//! Provides consistent teardown priority across orchestrations. Resources
//! must be torn down in dependency order to avoid spurious failures.

use std::fmt;

/// Kinds of control-plane resources whose lifecycles this crate confirms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Database (lives inside a server)
    Database,
    /// Server (lives inside a resource group)
    Server,
    /// Resource group (contains everything else)
    ResourceGroup,
}

impl ResourceKind {
    /// Get teardown priority (lower number = teardown first)
    ///
    /// Children must be confirmed gone before their parent is deleted:
    /// - 0: databases (contained in a server)
    /// - 1: servers (contained in a resource group)
    /// - 2: resource groups
    pub fn teardown_priority(self) -> u8 {
        match self {
            ResourceKind::Database => 0,
            ResourceKind::Server => 1,
            ResourceKind::ResourceGroup => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Database => "database",
            ResourceKind::Server => "server",
            ResourceKind::ResourceGroup => "resource-group",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable identifier of a remote resource
///
/// Created once at submission time and never mutated. A single `ResourceRef`
/// has at most one active confirmation loop at a time by caller discipline;
/// loops for different refs run as independent tasks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    /// Resource name within its scope
    pub name: String,
    /// Parent scope (e.g., resource group or server name)
    pub scope: String,
    /// What kind of resource this is
    pub kind: ResourceKind,
}

impl ResourceRef {
    pub fn new(kind: ResourceKind, scope: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: scope.into(),
            kind,
        }
    }

    /// Get a human-readable description for logging
    pub fn description(&self) -> String {
        format!("{} {}/{}", self.kind, self.scope, self.name)
    }
}
