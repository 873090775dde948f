//! Container, grouping-path and root-location selection.

use std::collections::HashSet;

use crate::error::DiscoveryError;
use crate::identifier::segment_type;
use crate::inspector::{ContainerInfo, InspectorError};
use crate::selector::Selector;
use crate::tree::{NodeId, NodeKind};

use super::{node_data, Resolution};

impl Resolution<'_> {
    pub(super) fn resolve_container_selector(
        &mut self,
        selector: &Selector,
        name: &str,
    ) -> Result<(), DiscoveryError> {
        let info = match self.inspector.find_container(name) {
            Ok(Some(info)) if !info.is_abstract => info,
            Ok(_) => {
                self.not_found(selector, format!("Container '{name}' could not be resolved."));
                return Ok(());
            }
            Err(err) => {
                self.inspector_failure(selector, name, &err);
                return Ok(());
            }
        };
        match self.container_node(selector, &info)? {
            Some(node) => self.expand_container(selector, node, &info),
            None => {
                self.not_found(selector, format!("Container '{name}' could not be resolved."));
                Ok(())
            }
        }
    }

    /// Resolve every concrete container a path or root-location lookup found.
    pub(super) fn resolve_candidates(
        &mut self,
        selector: &Selector,
        found: Result<Vec<ContainerInfo>, InspectorError>,
    ) -> Result<(), DiscoveryError> {
        let candidates = match found {
            Ok(candidates) => candidates,
            Err(err) => {
                self.inspector_failure(selector, &selector.to_string(), &err);
                return Ok(());
            }
        };

        let mut resolved = 0;
        for info in candidates.iter().filter(|c| !c.is_abstract) {
            if let Some(node) = self.container_node(selector, info)? {
                self.expand_container(selector, node, info)?;
                resolved += 1;
            }
        }
        if resolved == 0 {
            self.not_found(
                selector,
                format!("Selector '{selector}' did not match any container."),
            );
        }
        Ok(())
    }

    /// The node for `info`, creating it and its enclosing containers as
    /// needed. Enclosing containers are not expanded.
    ///
    /// Returns `None` when the enclosing chain cannot be resolved.
    pub(super) fn container_node(
        &mut self,
        selector: &Selector,
        info: &ContainerInfo,
    ) -> Result<Option<NodeId>, DiscoveryError> {
        let mut chain = vec![info.clone()];
        let mut seen = HashSet::from([info.name.clone()]);
        while let Some(enclosing) = chain.last().and_then(|c| c.enclosing.clone()) {
            if !seen.insert(enclosing.clone()) {
                return Ok(None);
            }
            match self.inspector.find_container(&enclosing) {
                Ok(Some(outer)) => chain.push(outer),
                Ok(None) => return Ok(None),
                Err(err) => {
                    self.inspector_failure(selector, &enclosing, &err);
                    return Ok(None);
                }
            }
        }

        let mut node = self.ctx.root();
        for container in chain.iter().rev() {
            let parent = self.identifier_of(node)?;
            let identifier = if container.is_nested() {
                parent.append(segment_type::NESTED_CONTAINER, container.simple_name())
            } else {
                parent.append(segment_type::CONTAINER, container.name.as_str())
            };
            let (id, _) = self.ctx.get_or_create(identifier, || {
                node_data(
                    &container.name,
                    container.simple_name(),
                    NodeKind::Container,
                    container.source.as_ref(),
                    &container.markers,
                )
            })?;
            node = id;
        }
        Ok(Some(node))
    }

    /// Resolve every test-bearing member and inner container of `info` under
    /// `node`. Each container is expanded at most once per run.
    pub(super) fn expand_container(
        &mut self,
        selector: &Selector,
        node: NodeId,
        info: &ContainerInfo,
    ) -> Result<(), DiscoveryError> {
        if !self.ctx.mark_expanded(node) {
            return Ok(());
        }

        match self.inspector.members(info) {
            Ok(members) => {
                for member in &members {
                    if let Some(member_node) = self.member_node(node, member)? {
                        self.select_in_full(member_node)?;
                    }
                }
            }
            Err(err) => self.inspector_failure(selector, &info.name, &err),
        }

        match self.inspector.nested_containers(info) {
            Ok(nested) => {
                for inner in nested.iter().filter(|c| !c.is_abstract) {
                    if let Some(inner_node) = self.container_node(selector, inner)? {
                        self.expand_container(selector, inner_node, inner)?;
                    }
                }
            }
            Err(err) => self.inspector_failure(selector, &info.name, &err),
        }
        Ok(())
    }
}
