//! Element inspector: the data source the resolver consumes.
//!
//! The resolver never looks at program elements directly. It asks an
//! [`ElementInspector`] for plain descriptive records ([`ContainerInfo`],
//! [`MemberInfo`]) carrying the declarative [`Markers`] found on each
//! element. Failures are reported per element as [`InspectorError`] and
//! never abort a discovery run.

mod catalog;

pub use catalog::CatalogInspector;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::selector::MemberSignature;
use crate::types::SourceLocation;

// ============================================================================
// Errors
// ============================================================================

/// Failure to introspect one element.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InspectorError {
    /// The element exists but could not be loaded.
    #[error("element '{element}' could not be loaded: {message}")]
    ElementNotLoadable { element: String, message: String },

    /// A member signature names a parameter type the inspector does not know.
    #[error("unknown parameter type '{type_name}' in signature '{signature}'")]
    UnknownParameterType {
        signature: String,
        type_name: String,
    },
}

// ============================================================================
// Markers
// ============================================================================

/// A declared exclusive-resource requirement, still unvalidated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLockMarker {
    /// Resource name.
    pub key: String,
    /// Access mode text (`read` or `read_write`); absent means read-write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

impl ResourceLockMarker {
    /// A lock with an explicit mode.
    pub fn new(key: impl Into<String>, mode: impl Into<String>) -> Self {
        ResourceLockMarker {
            key: key.into(),
            mode: Some(mode.into()),
        }
    }
}

/// Declarative metadata found on a container or member.
///
/// Mode strings are kept verbatim; they are validated when execution
/// metadata is derived so unknown values surface as configuration errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Markers {
    /// Display-name override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Raw tag values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// The element's own execution mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_mode: Option<String>,
    /// Default execution mode for the element's children.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_execution_mode: Option<String>,
    /// Exclusive-resource declarations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_locks: Vec<ResourceLockMarker>,
}

// ============================================================================
// Element Records
// ============================================================================

/// A candidate container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    /// Fully qualified name, e.g. `a.b.MyTestClass` or `a.Outer$Inner`.
    pub name: String,
    /// Grouping path the container belongs to (e.g. its package).
    #[serde(default)]
    pub grouping_path: String,
    /// Root location the container was found in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    /// Abstract containers are never test containers.
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    /// Enclosing container of an inner (non-static) nested container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enclosing: Option<String>,
    /// Container whose members this one inherits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub super_container: Option<String>,
    /// Declaration site.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceLocation>,
    /// Declarative metadata.
    #[serde(default)]
    pub markers: Markers,
}

impl ContainerInfo {
    /// A plain top-level container with no markers.
    pub fn new(name: impl Into<String>, grouping_path: impl Into<String>) -> Self {
        ContainerInfo {
            name: name.into(),
            grouping_path: grouping_path.into(),
            root: None,
            is_abstract: false,
            enclosing: None,
            super_container: None,
            source: None,
            markers: Markers::default(),
        }
    }

    /// Name without grouping path or enclosing-container prefix.
    pub fn simple_name(&self) -> &str {
        self.name
            .rsplit(['$', '.'])
            .next()
            .unwrap_or(self.name.as_str())
    }

    /// True for inner containers identified beneath an enclosing container.
    pub fn is_nested(&self) -> bool {
        self.enclosing.is_some()
    }
}

/// What a member contributes to the test tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    /// Ordinary test.
    #[default]
    Test,
    /// Produces dynamic tests at execution time.
    Factory,
    /// Produces repeated invocations at execution time.
    Template,
    /// Not test-bearing.
    Plain,
}

/// A candidate member of a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    /// Member name.
    pub name: String,
    /// Parameter type names, in declaration order.
    pub parameter_types: Vec<String>,
    /// Member kind.
    pub kind: MemberKind,
    /// Container that declares the member (may be a super-container of the
    /// container it was looked up on).
    pub declaring_container: String,
    /// Declaration site.
    pub source: Option<SourceLocation>,
    /// Declarative metadata.
    pub markers: Markers,
}

impl MemberInfo {
    /// The member's signature.
    pub fn signature(&self) -> MemberSignature {
        MemberSignature::new(self.name.clone(), self.parameter_types.iter().cloned())
    }

    /// True if the name and parameter types match `signature` exactly.
    pub fn matches(&self, signature: &MemberSignature) -> bool {
        self.name == signature.name && self.parameter_types == signature.parameter_types
    }
}

// ============================================================================
// Inspector Trait
// ============================================================================

/// Supplies candidate program elements to the resolver.
pub trait ElementInspector {
    /// Look up a container by fully qualified name.
    fn find_container(&self, name: &str) -> Result<Option<ContainerInfo>, InspectorError>;

    /// All members visible on `container`, inherited ones included.
    fn members(&self, container: &ContainerInfo) -> Result<Vec<MemberInfo>, InspectorError>;

    /// The member of `container` matching `signature`.
    fn find_member(
        &self,
        container: &ContainerInfo,
        signature: &MemberSignature,
    ) -> Result<Option<MemberInfo>, InspectorError> {
        Ok(self
            .members(container)?
            .into_iter()
            .find(|m| m.matches(signature)))
    }

    /// Inner containers declared directly inside `container`.
    fn nested_containers(
        &self,
        container: &ContainerInfo,
    ) -> Result<Vec<ContainerInfo>, InspectorError>;

    /// Top-level containers whose grouping path equals or lies under `path`,
    /// restricted to `base` when given.
    fn containers_in_path(
        &self,
        path: &str,
        base: Option<&Path>,
    ) -> Result<Vec<ContainerInfo>, InspectorError>;

    /// Top-level containers found in a root location.
    fn containers_in_root(&self, location: &Path) -> Result<Vec<ContainerInfo>, InspectorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_name_strips_path_and_enclosing() {
        assert_eq!(ContainerInfo::new("a.b.MyTest", "a.b").simple_name(), "MyTest");
        assert_eq!(
            ContainerInfo::new("a.Outer$Inner", "a").simple_name(),
            "Inner"
        );
        assert_eq!(ContainerInfo::new("Bare", "").simple_name(), "Bare");
    }

    #[test]
    fn member_matches_exact_signature() {
        let member = MemberInfo {
            name: "test7".to_string(),
            parameter_types: vec!["java.lang.String".to_string()],
            kind: MemberKind::Test,
            declaring_container: "a.B".to_string(),
            source: None,
            markers: Markers::default(),
        };
        assert!(member.matches(&MemberSignature::new("test7", ["java.lang.String"])));
        assert!(!member.matches(&MemberSignature::new("test7", Vec::<String>::new())));
        assert_eq!(member.signature().to_string(), "test7(java.lang.String)");
    }

    #[test]
    fn markers_deserialize_with_defaults() {
        let markers: Markers =
            serde_json::from_str(r#"{"tags":["fast"],"resource_locks":[{"key":"db"}]}"#).unwrap();
        assert_eq!(markers.tags, vec!["fast"]);
        assert_eq!(markers.resource_locks[0].mode, None);
        assert!(markers.execution_mode.is_none());
    }
}
