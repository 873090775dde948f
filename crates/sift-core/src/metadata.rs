//! Execution metadata: parallelism mode and exclusive-resource locks.
//!
//! Declarations are validated once, when a node is created, and stored on the
//! node as [`ExecutionDeclarations`]. Effective values are computed lazily by
//! [`ExecutionMetadataResolver`] walking the ancestor chain.
//!
//! ## Mode Inheritance
//!
//! 1. The node's own explicit mode wins.
//! 2. Otherwise each ancestor is visited outward. At each level the
//!    ancestor's own explicit mode is checked first, then its default mode
//!    for children; the first declaration found supplies the mode.
//! 3. Otherwise the configured default applies.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::ConfigurationError;
use crate::inspector::Markers;
use crate::tree::{NodeId, TestTree};

// ============================================================================
// Modes
// ============================================================================

/// Whether a node may run concurrently with others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Runs on the same thread as its parent, isolated from siblings.
    SameThread,
    /// Eligible for concurrent execution.
    Concurrent,
}

impl ExecutionMode {
    /// Canonical text form.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::SameThread => "same_thread",
            ExecutionMode::Concurrent => "concurrent",
        }
    }

    /// Parse a declared mode. Matching ignores case and treats `-` as `_`;
    /// `isolated` is accepted as an alias of `same_thread`.
    pub fn parse(value: &str, element: &str) -> Result<ExecutionMode, ConfigurationError> {
        match normalize(value).as_str() {
            "same_thread" | "isolated" => Ok(ExecutionMode::SameThread),
            "concurrent" => Ok(ExecutionMode::Concurrent),
            _ => Err(ConfigurationError::UnknownExecutionMode {
                value: value.to_string(),
                element: element.to_string(),
            }),
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access mode of an exclusive resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    /// Shared read access.
    Read,
    /// Exclusive read-write access.
    ReadWrite,
}

impl LockMode {
    /// Canonical text form.
    pub fn as_str(&self) -> &'static str {
        match self {
            LockMode::Read => "read",
            LockMode::ReadWrite => "read_write",
        }
    }

    /// Parse a declared access mode (case-insensitive, `-` treated as `_`).
    pub fn parse(
        value: &str,
        resource: &str,
        element: &str,
    ) -> Result<LockMode, ConfigurationError> {
        match normalize(value).as_str() {
            "read" => Ok(LockMode::Read),
            "read_write" => Ok(LockMode::ReadWrite),
            _ => Err(ConfigurationError::UnknownLockMode {
                value: value.to_string(),
                resource: resource.to_string(),
                element: element.to_string(),
            }),
        }
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_ascii_lowercase().replace('-', "_")
}

// ============================================================================
// Exclusive Resources
// ============================================================================

/// A named resource and the access a node needs to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExclusiveResource {
    /// Resource name.
    pub key: String,
    /// Required access.
    pub mode: LockMode,
}

impl ExclusiveResource {
    /// Create a resource requirement.
    pub fn new(key: impl Into<String>, mode: LockMode) -> Self {
        ExclusiveResource {
            key: key.into(),
            mode,
        }
    }

    /// Two requirements may be held at once unless they name the same
    /// resource and at least one needs read-write access.
    pub fn is_compatible_with(&self, other: &ExclusiveResource) -> bool {
        self.key != other.key || (self.mode == LockMode::Read && other.mode == LockMode::Read)
    }
}

// ============================================================================
// Declarations
// ============================================================================

/// Validated execution declarations of one node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionDeclarations {
    /// The node's own mode.
    pub explicit_mode: Option<ExecutionMode>,
    /// Default mode for the node's children.
    pub default_child_mode: Option<ExecutionMode>,
    /// Declared resource locks.
    pub resources: Vec<ExclusiveResource>,
}

impl ExecutionDeclarations {
    /// Validate raw markers declared on `element`.
    pub fn from_markers(
        markers: &Markers,
        element: &str,
    ) -> Result<ExecutionDeclarations, ConfigurationError> {
        let explicit_mode = markers
            .execution_mode
            .as_deref()
            .map(|m| ExecutionMode::parse(m, element))
            .transpose()?;
        let default_child_mode = markers
            .child_execution_mode
            .as_deref()
            .map(|m| ExecutionMode::parse(m, element))
            .transpose()?;
        let resources = markers
            .resource_locks
            .iter()
            .map(|lock| {
                let mode = match lock.mode.as_deref() {
                    Some(mode) => LockMode::parse(mode, &lock.key, element)?,
                    None => LockMode::ReadWrite,
                };
                Ok(ExclusiveResource::new(lock.key.clone(), mode))
            })
            .collect::<Result<Vec<_>, ConfigurationError>>()?;
        Ok(ExecutionDeclarations {
            explicit_mode,
            default_child_mode,
            resources,
        })
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Effective execution metadata of one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionMetadata {
    /// Effective mode.
    pub mode: ExecutionMode,
    /// Effective locks, outermost declaration first.
    pub resources: Vec<ExclusiveResource>,
}

/// Computes effective execution metadata over a resolved tree.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionMetadataResolver<'a> {
    tree: &'a TestTree,
    config: &'a EngineConfig,
}

impl<'a> ExecutionMetadataResolver<'a> {
    /// Create a resolver over `tree` using `config` for the fallback mode.
    pub fn new(tree: &'a TestTree, config: &'a EngineConfig) -> Self {
        ExecutionMetadataResolver { tree, config }
    }

    /// Effective mode of `node`, or `None` if the node is not in the tree.
    pub fn execution_mode(&self, node: NodeId) -> Option<ExecutionMode> {
        let own = self.tree.get(node)?;
        if let Some(mode) = own.declarations().explicit_mode {
            return Some(mode);
        }
        let inherited = self
            .tree
            .ancestors(node)
            .into_iter()
            .filter_map(|a| self.tree.get(a))
            .find_map(|a| {
                let declared = a.declarations();
                declared.explicit_mode.or(declared.default_child_mode)
            });
        Some(inherited.unwrap_or(self.config.default_execution_mode))
    }

    /// Effective locks of `node`: its own declarations plus every
    /// ancestor's, one entry per resource with read-write dominating read.
    pub fn exclusive_resources(&self, node: NodeId) -> Vec<ExclusiveResource> {
        let mut chain = self.tree.ancestors(node);
        chain.reverse();
        chain.push(node);

        let mut merged: IndexMap<String, LockMode> = IndexMap::new();
        for id in chain {
            let Some(n) = self.tree.get(id) else {
                continue;
            };
            for resource in &n.declarations().resources {
                let entry = merged.entry(resource.key.clone()).or_insert(resource.mode);
                *entry = (*entry).max(resource.mode);
            }
        }
        merged
            .into_iter()
            .map(|(key, mode)| ExclusiveResource { key, mode })
            .collect()
    }

    /// Mode and locks together.
    pub fn metadata(&self, node: NodeId) -> Option<ExecutionMetadata> {
        Some(ExecutionMetadata {
            mode: self.execution_mode(node)?,
            resources: self.exclusive_resources(node),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
