//! In-memory element inspector backed by a serde catalog.
//!
//! The catalog is the JSON document the CLI loads with `--catalog`:
//!
//! ```json
//! {
//!   "known_types": ["java.lang.String"],
//!   "containers": [
//!     {
//!       "name": "a.MyTestClass",
//!       "grouping_path": "a",
//!       "root": "build/classes",
//!       "members": [{ "name": "test1" }, { "name": "dyn", "kind": "factory" }]
//!     }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use super::{
    ContainerInfo, ElementInspector, InspectorError, MemberInfo, MemberKind, Markers,
};
use crate::selector::MemberSignature;
use crate::types::SourceLocation;

#[derive(Debug, Clone, Deserialize)]
struct CatalogMember {
    name: String,
    #[serde(default)]
    parameter_types: Vec<String>,
    #[serde(default)]
    kind: MemberKind,
    #[serde(default)]
    source: Option<SourceLocation>,
    #[serde(default)]
    markers: Markers,
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogContainer {
    #[serde(flatten)]
    info: ContainerInfo,
    #[serde(default)]
    members: Vec<CatalogMember>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    known_types: Vec<String>,
    #[serde(default)]
    containers: Vec<CatalogContainer>,
}

/// Element inspector over an in-memory catalog of containers and members.
///
/// Parameter types are checked against `known_types`; a type is loadable if
/// it is listed there, names a catalog container, or no types are listed.
#[derive(Debug, Clone, Default)]
pub struct CatalogInspector {
    containers: IndexMap<String, CatalogContainer>,
    known_types: HashSet<String>,
}

impl CatalogInspector {
    /// Empty catalog.
    pub fn new() -> Self {
        CatalogInspector::default()
    }

    /// Parse a catalog document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let document: CatalogDocument = serde_json::from_str(json)?;
        let mut inspector = CatalogInspector::new();
        inspector.known_types = document.known_types.into_iter().collect();
        for container in document.containers {
            inspector
                .containers
                .insert(container.info.name.clone(), container);
        }
        Ok(inspector)
    }

    /// Add (or replace) a container.
    pub fn with_container(mut self, info: ContainerInfo) -> Self {
        self.containers.insert(
            info.name.clone(),
            CatalogContainer {
                info,
                members: Vec::new(),
            },
        );
        self
    }

    /// Add a member to an already added container. Unknown containers are ignored.
    pub fn with_member<I, S>(
        mut self,
        container: &str,
        name: &str,
        parameter_types: I,
        kind: MemberKind,
        markers: Markers,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(entry) = self.containers.get_mut(container) {
            entry.members.push(CatalogMember {
                name: name.to_string(),
                parameter_types: parameter_types.into_iter().map(Into::into).collect(),
                kind,
                source: None,
                markers,
            });
        }
        self
    }

    /// Register a loadable parameter type.
    pub fn with_known_type(mut self, type_name: impl Into<String>) -> Self {
        self.known_types.insert(type_name.into());
        self
    }

    fn is_loadable(&self, type_name: &str) -> bool {
        self.known_types.is_empty()
            || self.known_types.contains(type_name)
            || self.containers.contains_key(type_name)
    }

    fn is_top_level(container: &CatalogContainer) -> bool {
        container.info.enclosing.is_none()
    }

    /// Inheritance chain from the outermost super-container down to `name`.
    fn hierarchy(&self, name: &str) -> Result<Vec<&CatalogContainer>, InspectorError> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(name.to_string());
        while let Some(next) = current {
            if !seen.insert(next.clone()) {
                return Err(InspectorError::ElementNotLoadable {
                    element: name.to_string(),
                    message: format!("inheritance cycle through '{next}'"),
                });
            }
            let Some(entry) = self.containers.get(&next) else {
                break;
            };
            current = entry.info.super_container.clone();
            chain.push(entry);
        }
        chain.reverse();
        Ok(chain)
    }
}

impl ElementInspector for CatalogInspector {
    fn find_container(&self, name: &str) -> Result<Option<ContainerInfo>, InspectorError> {
        Ok(self.containers.get(name).map(|c| c.info.clone()))
    }

    fn members(&self, container: &ContainerInfo) -> Result<Vec<MemberInfo>, InspectorError> {
        let mut members: IndexMap<MemberSignature, MemberInfo> = IndexMap::new();
        for entry in self.hierarchy(&container.name)? {
            for member in &entry.members {
                let info = MemberInfo {
                    name: member.name.clone(),
                    parameter_types: member.parameter_types.clone(),
                    kind: member.kind,
                    declaring_container: entry.info.name.clone(),
                    source: member.source.clone(),
                    markers: member.markers.clone(),
                };
                // Overrides keep the super-container's position.
                members.insert(info.signature(), info);
            }
        }
        Ok(members.into_values().collect())
    }

    fn find_member(
        &self,
        container: &ContainerInfo,
        signature: &MemberSignature,
    ) -> Result<Option<MemberInfo>, InspectorError> {
        if let Some(unknown) = signature
            .parameter_types
            .iter()
            .find(|t| !self.is_loadable(t))
        {
            return Err(InspectorError::UnknownParameterType {
                signature: signature.to_string(),
                type_name: unknown.clone(),
            });
        }
        Ok(self
            .members(container)?
            .into_iter()
            .find(|m| m.matches(signature)))
    }

    fn nested_containers(
        &self,
        container: &ContainerInfo,
    ) -> Result<Vec<ContainerInfo>, InspectorError> {
        Ok(self
            .containers
            .values()
            .filter(|c| c.info.enclosing.as_deref() == Some(container.name.as_str()))
            .map(|c| c.info.clone())
            .collect())
    }

    fn containers_in_path(
        &self,
        path: &str,
        base: Option<&Path>,
    ) -> Result<Vec<ContainerInfo>, InspectorError> {
        Ok(self
            .containers
            .values()
            .filter(|c| Self::is_top_level(c))
            .filter(|c| grouping_path_matches(&c.info.grouping_path, path))
            .filter(|c| base.is_none_or(|b| c.info.root.as_deref() == Some(b)))
            .map(|c| c.info.clone())
            .collect())
    }

    fn containers_in_root(&self, location: &Path) -> Result<Vec<ContainerInfo>, InspectorError> {
        Ok(self
            .containers
            .values()
            .filter(|c| Self::is_top_level(c))
            .filter(|c| c.info.root.as_deref() == Some(location))
            .map(|c| c.info.clone())
            .collect())
    }
}

/// `a.b` matches `a.b` and `a.b.c` but not `a.bc`; the empty path matches all.
fn grouping_path_matches(candidate: &str, selected: &str) -> bool {
    selected.is_empty()
        || candidate == selected
        || candidate
            .strip_prefix(selected)
            .is_some_and(|rest| rest.starts_with('.'))
}
