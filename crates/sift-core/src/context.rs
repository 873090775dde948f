//! Per-run resolution state.
//!
//! A [`ResolutionContext`] lives for exactly one discovery run. It owns the
//! identifier-keyed node cache, the record of which containers were already
//! expanded, the nodes pinned against pruning, and the filter contributions
//! collected before they are applied. Dropping the context leaves only the
//! populated tree behind.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::trace;

use crate::error::DiscoveryError;
use crate::filter::FilterContribution;
use crate::identifier::Identifier;
use crate::report::{DiscoveryReport, ResolutionIssue};
use crate::tree::{NodeData, NodeId, TestTree, TreeError};

/// Resolution state for one discovery run.
#[derive(Debug)]
pub struct ResolutionContext<'t> {
    tree: &'t mut TestTree,
    cache: IndexMap<Identifier, NodeId>,
    expanded: HashSet<NodeId>,
    pinned: HashSet<NodeId>,
    pending_filters: IndexMap<Identifier, Vec<FilterContribution>>,
    report: DiscoveryReport,
}

impl<'t> ResolutionContext<'t> {
    /// Start a run over `tree`. Nodes already in the tree are reused.
    pub fn new(tree: &'t mut TestTree) -> Self {
        let cache = tree
            .iter()
            .map(|(id, node)| (node.identifier().clone(), id))
            .collect();
        ResolutionContext {
            tree,
            cache,
            expanded: HashSet::new(),
            pinned: HashSet::new(),
            pending_filters: IndexMap::new(),
            report: DiscoveryReport::default(),
        }
    }

    pub fn tree(&self) -> &TestTree {
        self.tree
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    /// Cached node for `identifier`.
    pub fn lookup(&self, identifier: &Identifier) -> Option<NodeId> {
        self.cache.get(identifier).copied()
    }

    /// Return the node for `identifier`, creating it with `factory` if absent.
    ///
    /// The parent (the identifier minus its last segment) must already be
    /// cached. The boolean is true when the node was created by this call.
    pub fn get_or_create<F>(
        &mut self,
        identifier: Identifier,
        factory: F,
    ) -> Result<(NodeId, bool), DiscoveryError>
    where
        F: FnOnce() -> Result<NodeData, DiscoveryError>,
    {
        if let Some(existing) = self.lookup(&identifier) {
            trace!("Reusing node '{}'.", identifier);
            return Ok((existing, false));
        }
        let parent = identifier
            .parent()
            .and_then(|p| self.lookup(&p))
            .ok_or_else(|| TreeError::MissingParent {
                identifier: identifier.clone(),
            })?;
        let data = factory()?;
        let id = self.tree.insert_child(parent, identifier.clone(), data)?;
        trace!("Created node '{}'.", identifier);
        self.cache.insert(identifier, id);
        Ok((id, true))
    }

    /// Record that `node` had its children resolved. Returns false if it
    /// already had.
    pub fn mark_expanded(&mut self, node: NodeId) -> bool {
        self.expanded.insert(node)
    }

    /// Keep `node` (and its ancestors) through pruning.
    pub fn pin(&mut self, node: NodeId) {
        self.pinned.insert(node);
    }

    /// Queue a filter contribution for the node identified by `owner`.
    pub fn contribute(&mut self, owner: Identifier, contribution: FilterContribution) {
        let pending = self.pending_filters.entry(owner).or_default();
        if !pending.contains(&contribution) {
            pending.push(contribution);
        }
    }

    pub fn report_issue(&mut self, issue: ResolutionIssue) {
        self.report.push(issue);
    }

    /// Prune empty containers, apply queued filter contributions and hand
    /// back the report. Filters are read-only afterwards.
    pub fn finish(self) -> DiscoveryReport {
        let ResolutionContext {
            tree,
            pinned,
            pending_filters,
            report,
            ..
        } = self;

        let removed = tree.prune(&pinned);
        trace!("Pruned {} empty container(s).", removed);

        for (owner, contributions) in pending_filters {
            let Some(filter) = tree.find(&owner).and_then(|id| tree.dynamic_filter_mut(id)) else {
                continue;
            };
            for contribution in contributions {
                filter.apply(contribution);
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::identifier::segment_type;
    use crate::tree::NodeKind;

    #[test]
    fn get_or_create_is_idempotent() {
        let mut tree = TestTree::new(&EngineConfig::default());
        let engine = tree.get(tree.root()).unwrap().identifier().clone();
        let mut ctx = ResolutionContext::new(&mut tree);

        let id = engine.append(segment_type::CONTAINER, "C");
        let (first, created) = ctx
            .get_or_create(id.clone(), || Ok(NodeData::new("C", NodeKind::Container)))
            .unwrap();
        assert!(created);
        let (second, created) = ctx
            .get_or_create(id, || panic!("factory must not run for cached nodes"))
            .unwrap();
        assert!(!created);
        assert_eq!(first, second);
    }

    #[test]
    fn missing_parent_is_an_error() {
        let mut tree = TestTree::new(&EngineConfig::default());
        let engine = tree.get(tree.root()).unwrap().identifier().clone();
        let mut ctx = ResolutionContext::new(&mut tree);
        let orphan = engine
            .append(segment_type::CONTAINER, "C")
            .append(segment_type::TEST, "m()");
        let err = ctx
            .get_or_create(orphan, || Ok(NodeData::new("m()", NodeKind::Test)))
            .unwrap_err();
        assert!(matches!(
            err,
            DiscoveryError::Tree(TreeError::MissingParent { .. })
        ));
    }

    #[test]
    fn finish_applies_contributions_and_prunes() {
        let mut tree = TestTree::new(&EngineConfig::default());
        let engine = tree.get(tree.root()).unwrap().identifier().clone();
        let container = engine.append(segment_type::CONTAINER, "C");
        let empty = engine.append(segment_type::CONTAINER, "Empty");
        let factory = container.append(segment_type::FACTORY, "f()");
        let target = factory.append(segment_type::DYNAMIC_TEST, "#1");
        {
            let mut ctx = ResolutionContext::new(&mut tree);
            ctx.get_or_create(container, || Ok(NodeData::new("C", NodeKind::Container)))
                .unwrap();
            ctx.get_or_create(empty.clone(), || {
                Ok(NodeData::new("Empty", NodeKind::Container))
            })
            .unwrap();
            ctx.get_or_create(factory.clone(), || Ok(NodeData::new("f()", NodeKind::Factory)))
                .unwrap();
            ctx.contribute(
                factory.clone(),
                FilterContribution::AllowDescendant(target.clone()),
            );
            assert!(ctx.finish().is_clean());
        }

        assert!(tree.find(&empty).is_none());
        let filter = tree.dynamic_filter(tree.find(&factory).unwrap()).unwrap();
        assert!(filter.test(&target));
        assert!(!filter.test(&factory.append(segment_type::DYNAMIC_TEST, "#2")));
    }
}
