//! The discovered test tree.
//!
//! Nodes live in an arena owned by [`TestTree`] and refer to each other by
//! [`NodeId`]. A node owns its children (removing a node removes its
//! subtree); the parent link is a plain back-reference for traversal.
//! Exactly one node exists per [`Identifier`].

use std::collections::{HashMap, HashSet};
use std::fmt;

use indexmap::IndexSet;
use serde::Serialize;
use thiserror::Error;

use crate::config::EngineConfig;
use crate::filter::DynamicDescendantFilter;
use crate::identifier::{segment_type, Identifier};
use crate::metadata::ExecutionDeclarations;
use crate::types::SourceLocation;

// ============================================================================
// Errors
// ============================================================================

/// Misuse of the tree's structural operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// The node id does not refer to a live node.
    #[error("no node with id {0}")]
    UnknownNode(NodeId),

    /// A node with this identifier already exists.
    #[error("duplicate identifier {identifier}")]
    DuplicateIdentifier { identifier: Identifier },

    /// The identifier does not extend the parent's identifier by one segment.
    #[error("{identifier} is not a direct child of {parent}")]
    NotADirectChild {
        parent: Identifier,
        identifier: Identifier,
    },

    /// The parent identifier is not in the tree.
    #[error("parent of {identifier} has not been resolved")]
    MissingParent { identifier: Identifier },

    /// The node does not produce runtime children.
    #[error("{identifier} does not accept runtime-produced children")]
    NoDynamicChildren { identifier: Identifier },

    /// The segment type is not a runtime-only type.
    #[error("segment type '{segment_type}' cannot be registered at runtime")]
    NotRuntimeSegment { segment_type: String },
}

// ============================================================================
// Node Types
// ============================================================================

/// Handle to a node in a [`TestTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Node kind discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// The tree root.
    Engine,
    /// Static container.
    Container,
    /// Static test.
    Test,
    /// Member producing dynamic tests.
    Factory,
    /// Member producing invocations.
    Template,
    /// Runtime-produced container.
    DynamicContainer,
    /// Runtime-produced test.
    DynamicTest,
    /// Runtime-produced template invocation.
    TemplateInvocation,
}

impl NodeKind {
    /// True for kinds whose children only exist at execution time.
    pub fn has_dynamic_children(&self) -> bool {
        matches!(
            self,
            NodeKind::Factory | NodeKind::Template | NodeKind::DynamicContainer
        )
    }

    /// True for kinds that count as tests when pruning empty containers.
    pub fn is_test_bearing(&self) -> bool {
        matches!(
            self,
            NodeKind::Test
                | NodeKind::Factory
                | NodeKind::Template
                | NodeKind::DynamicTest
                | NodeKind::TemplateInvocation
        )
    }

    fn for_runtime_segment(segment: &str) -> Option<NodeKind> {
        match segment {
            segment_type::DYNAMIC_TEST => Some(NodeKind::DynamicTest),
            segment_type::DYNAMIC_CONTAINER => Some(NodeKind::DynamicContainer),
            segment_type::TEMPLATE_INVOCATION => Some(NodeKind::TemplateInvocation),
            _ => None,
        }
    }
}

/// Everything needed to create a node except its identifier and links.
#[derive(Debug, Clone)]
pub struct NodeData {
    /// Display label.
    pub display_name: String,
    /// Node kind.
    pub kind: NodeKind,
    /// Declaration site.
    pub source: Option<SourceLocation>,
    /// Tags, deduplicated in insertion order.
    pub tags: IndexSet<String>,
    /// Validated execution declarations.
    pub declarations: ExecutionDeclarations,
}

impl NodeData {
    /// Data with only a display name and kind.
    pub fn new(display_name: impl Into<String>, kind: NodeKind) -> Self {
        NodeData {
            display_name: display_name.into(),
            kind,
            source: None,
            tags: IndexSet::new(),
            declarations: ExecutionDeclarations::default(),
        }
    }
}

/// One node of the tree.
#[derive(Debug, Clone)]
pub struct TestNode {
    identifier: Identifier,
    display_name: String,
    source: Option<SourceLocation>,
    tags: IndexSet<String>,
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    declarations: ExecutionDeclarations,
    filter: Option<DynamicDescendantFilter>,
}

impl TestNode {
    fn new(identifier: Identifier, parent: Option<NodeId>, data: NodeData) -> Self {
        let filter = matches!(data.kind, NodeKind::Factory | NodeKind::Template)
            .then(DynamicDescendantFilter::new);
        TestNode {
            identifier,
            display_name: data.display_name,
            source: data.source,
            tags: data.tags,
            kind: data.kind,
            parent,
            children: Vec::new(),
            declarations: data.declarations,
            filter,
        }
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn source(&self) -> Option<&SourceLocation> {
        self.source.as_ref()
    }

    pub fn tags(&self) -> &IndexSet<String> {
        &self.tags
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in discovery order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn declarations(&self) -> &ExecutionDeclarations {
        &self.declarations
    }

    /// The node's dynamic descendant filter, for factories and templates.
    pub fn dynamic_filter(&self) -> Option<&DynamicDescendantFilter> {
        self.filter.as_ref()
    }
}

// ============================================================================
// Tree
// ============================================================================

/// Arena of [`TestNode`]s rooted at an engine node.
#[derive(Debug, Clone)]
pub struct TestTree {
    nodes: Vec<Option<TestNode>>,
    index: HashMap<Identifier, NodeId>,
    root: NodeId,
}

impl TestTree {
    /// A tree holding only the `[engine:<id>]` root.
    pub fn new(config: &EngineConfig) -> Self {
        let identifier = Identifier::root().append(segment_type::ENGINE, config.engine_id.as_str());
        let root = NodeId(0);
        let node = TestNode::new(
            identifier.clone(),
            None,
            NodeData::new(config.engine_display_name.as_str(), NodeKind::Engine),
        );
        TestTree {
            nodes: vec![Some(node)],
            index: HashMap::from([(identifier, root)]),
            root,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&TestNode> {
        self.nodes.get(id.0 as usize).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut TestNode> {
        self.nodes.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    /// Look up a node by identifier.
    pub fn find(&self, identifier: &Identifier) -> Option<NodeId> {
        self.index.get(identifier).copied()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(TestNode::children).unwrap_or(&[])
    }

    /// Ancestors of `id`, nearest first. The node itself is not included.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.get(id).and_then(TestNode::parent);
        while let Some(parent) = current {
            out.push(parent);
            current = self.get(parent).and_then(TestNode::parent);
        }
        out
    }

    /// Descendants of `id` in pre-order. The node itself is not included.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Every live node in pre-order, root first.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &TestNode)> + '_ {
        std::iter::once(self.root)
            .chain(self.descendants(self.root))
            .filter_map(move |id| self.get(id).map(|node| (id, node)))
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Filter of the node, for factories and templates.
    pub fn dynamic_filter(&self, id: NodeId) -> Option<&DynamicDescendantFilter> {
        self.get(id).and_then(TestNode::dynamic_filter)
    }

    pub(crate) fn dynamic_filter_mut(&mut self, id: NodeId) -> Option<&mut DynamicDescendantFilter> {
        self.get_mut(id).and_then(|node| node.filter.as_mut())
    }

    /// Append a new node under `parent`.
    pub(crate) fn insert_child(
        &mut self,
        parent: NodeId,
        identifier: Identifier,
        data: NodeData,
    ) -> Result<NodeId, TreeError> {
        let parent_identifier = self
            .get(parent)
            .ok_or(TreeError::UnknownNode(parent))?
            .identifier
            .clone();
        if identifier.len() != parent_identifier.len() + 1
            || !identifier.is_descendant_of(&parent_identifier)
        {
            return Err(TreeError::NotADirectChild {
                parent: parent_identifier,
                identifier,
            });
        }
        if self.index.contains_key(&identifier) {
            return Err(TreeError::DuplicateIdentifier { identifier });
        }

        let id = NodeId(self.nodes.len() as u32);
        self.index.insert(identifier.clone(), id);
        self.nodes
            .push(Some(TestNode::new(identifier, Some(parent), data)));
        if let Some(parent_node) = self.get_mut(parent) {
            parent_node.children.push(id);
        }
        Ok(id)
    }

    /// Remove `id` and its whole subtree. Removing the root is a no-op.
    pub(crate) fn remove_subtree(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        let Some(parent) = self.get(id).and_then(TestNode::parent) else {
            return;
        };
        if let Some(parent_node) = self.get_mut(parent) {
            parent_node.children.retain(|c| *c != id);
        }
        let mut doomed = self.descendants(id);
        doomed.push(id);
        for node_id in doomed {
            if let Some(node) = self.nodes.get_mut(node_id.0 as usize).and_then(Option::take) {
                self.index.remove(&node.identifier);
            }
        }
    }

    /// Remove containers with no test-bearing descendant, except `pinned`
    /// nodes and their ancestors. Returns the number of removed subtrees.
    pub(crate) fn prune(&mut self, pinned: &HashSet<NodeId>) -> usize {
        let mut keep: HashSet<NodeId> = HashSet::new();
        for &id in pinned {
            if self.get(id).is_some() {
                keep.insert(id);
                keep.extend(self.ancestors(id));
            }
        }

        // Post-order so a container whose only children are empty
        // containers is itself found empty.
        let mut order = self.descendants(self.root);
        order.reverse();
        let mut removed = 0;
        for id in order {
            let Some(node) = self.get(id) else {
                continue;
            };
            if node.kind != NodeKind::Container || keep.contains(&id) {
                continue;
            }
            if node.children.is_empty() {
                self.remove_subtree(id);
                removed += 1;
            }
        }
        removed
    }

    /// Attach a runtime-produced child under `parent`.
    ///
    /// The nearest filter on `parent` or its ancestors decides admission;
    /// `Ok(None)` means the filter rejected the child.
    pub fn register_dynamic_child(
        &mut self,
        parent: NodeId,
        segment: &str,
        value: &str,
        display_name: &str,
    ) -> Result<Option<NodeId>, TreeError> {
        let parent_node = self.get(parent).ok_or(TreeError::UnknownNode(parent))?;
        if !parent_node.kind.has_dynamic_children() {
            return Err(TreeError::NoDynamicChildren {
                identifier: parent_node.identifier.clone(),
            });
        }
        let kind = NodeKind::for_runtime_segment(segment).ok_or_else(|| {
            TreeError::NotRuntimeSegment {
                segment_type: segment.to_string(),
            }
        })?;
        let identifier = parent_node.identifier.append(segment, value);

        let admitted = std::iter::once(parent)
            .chain(self.ancestors(parent))
            .find_map(|id| self.dynamic_filter(id))
            .is_none_or(|filter| filter.test(&identifier));
        if !admitted {
            tracing::debug!("Dynamic child '{}' rejected by filter.", identifier);
            return Ok(None);
        }
        self.insert_child(parent, identifier, NodeData::new(display_name, kind))
            .map(Some)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterContribution;

    fn tree() -> TestTree {
        TestTree::new(&EngineConfig::default())
    }

    fn add(tree: &mut TestTree, parent: NodeId, segment: &str, value: &str, kind: NodeKind) -> NodeId {
        let identifier = tree.get(parent).unwrap().identifier().append(segment, value);
        tree.insert_child(parent, identifier, NodeData::new(value, kind))
            .unwrap()
    }

    mod structure {
        use super::*;

        #[test]
        fn root_is_engine_segment() {
            let tree = tree();
            let root = tree.get(tree.root()).unwrap();
            assert_eq!(root.identifier().to_string(), "[engine:sift]");
            assert_eq!(root.kind(), NodeKind::Engine);
            assert_eq!(tree.len(), 1);
        }

        #[test]
        fn duplicate_identifier_is_rejected() {
            let mut tree = tree();
            let root = tree.root();
            add(&mut tree, root, "class", "C", NodeKind::Container);
            let identifier = tree.get(root).unwrap().identifier().append("class", "C");
            let err = tree
                .insert_child(root, identifier, NodeData::new("C", NodeKind::Container))
                .unwrap_err();
            assert!(matches!(err, TreeError::DuplicateIdentifier { .. }));
        }

        #[test]
        fn child_must_extend_parent_by_one_segment() {
            let mut tree = tree();
            let root = tree.root();
            let identifier = tree
                .get(root)
                .unwrap()
                .identifier()
                .append("class", "C")
                .append("method", "m()");
            let err = tree
                .insert_child(root, identifier, NodeData::new("m()", NodeKind::Test))
                .unwrap_err();
            assert!(matches!(err, TreeError::NotADirectChild { .. }));
        }

        #[test]
        fn traversal_orders() {
            let mut tree = tree();
            let root = tree.root();
            let c = add(&mut tree, root, "class", "C", NodeKind::Container);
            let a = add(&mut tree, c, "method", "a()", NodeKind::Test);
            let b = add(&mut tree, c, "method", "b()", NodeKind::Test);
            assert_eq!(tree.descendants(root), vec![c, a, b]);
            assert_eq!(tree.ancestors(b), vec![c, root]);
            assert_eq!(tree.iter().count(), 4);
        }

        #[test]
        fn remove_subtree_drops_index_entries() {
            let mut tree = tree();
            let root = tree.root();
            let c = add(&mut tree, root, "class", "C", NodeKind::Container);
            let m = add(&mut tree, c, "method", "a()", NodeKind::Test);
            let m_id = tree.get(m).unwrap().identifier().clone();
            tree.remove_subtree(c);
            assert!(tree.get(c).is_none());
            assert!(tree.find(&m_id).is_none());
            assert!(tree.children(root).is_empty());
        }
    }

    mod pruning {
        use super::*;

        #[test]
        fn empty_containers_are_removed_bottom_up() {
            let mut tree = tree();
            let root = tree.root();
            let outer = add(&mut tree, root, "class", "Outer", NodeKind::Container);
            add(&mut tree, outer, "nested-class", "Inner", NodeKind::Container);
            let kept = add(&mut tree, root, "class", "Kept", NodeKind::Container);
            add(&mut tree, kept, "method", "t()", NodeKind::Test);

            assert_eq!(tree.prune(&HashSet::new()), 2);
            assert!(tree.get(outer).is_none());
            assert_eq!(tree.len(), 3);
        }

        #[test]
        fn pinned_nodes_and_their_ancestors_survive() {
            let mut tree = tree();
            let root = tree.root();
            let outer = add(&mut tree, root, "class", "Outer", NodeKind::Container);
            let inner = add(&mut tree, outer, "nested-class", "Inner", NodeKind::Container);
            assert_eq!(tree.prune(&HashSet::from([inner])), 0);
            assert!(tree.get(outer).is_some());
        }
    }

    mod dynamic_children {
        use super::*;

        #[test]
        fn filter_gates_registration() {
            let mut tree = tree();
            let root = tree.root();
            let c = add(&mut tree, root, "class", "C", NodeKind::Container);
            let f = add(&mut tree, c, "test-factory", "f()", NodeKind::Factory);
            let target = tree
                .get(f)
                .unwrap()
                .identifier()
                .append("dynamic-container", "#1");
            tree.dynamic_filter_mut(f)
                .unwrap()
                .apply(FilterContribution::AllowDescendant(
                    target.append("dynamic-test", "#1"),
                ));

            let container = tree
                .register_dynamic_child(f, "dynamic-container", "#1", "group")
                .unwrap()
                .unwrap();
            assert!(tree
                .register_dynamic_child(f, "dynamic-test", "#2", "other")
                .unwrap()
                .is_none());
            let accepted = tree
                .register_dynamic_child(container, "dynamic-test", "#1", "one")
                .unwrap();
            assert!(accepted.is_some());
            assert!(tree
                .register_dynamic_child(container, "dynamic-test", "#2", "two")
                .unwrap()
                .is_none());
        }

        #[test]
        fn static_nodes_reject_runtime_children() {
            let mut tree = tree();
            let root = tree.root();
            let c = add(&mut tree, root, "class", "C", NodeKind::Container);
            let err = tree
                .register_dynamic_child(c, "dynamic-test", "#1", "x")
                .unwrap_err();
            assert!(matches!(err, TreeError::NoDynamicChildren { .. }));
        }

        #[test]
        fn non_runtime_segment_is_rejected() {
            let mut tree = tree();
            let root = tree.root();
            let c = add(&mut tree, root, "class", "C", NodeKind::Container);
            let t = add(&mut tree, c, "test-template", "t()", NodeKind::Template);
            let err = tree.register_dynamic_child(t, "method", "x()", "x").unwrap_err();
            assert!(matches!(err, TreeError::NotRuntimeSegment { .. }));
            assert!(tree
                .register_dynamic_child(t, "test-template-invocation", "#1", "[1]")
                .unwrap()
                .is_some());
        }

        #[test]
        fn duplicate_runtime_child_is_rejected() {
            let mut tree = tree();
            let root = tree.root();
            let c = add(&mut tree, root, "class", "C", NodeKind::Container);
            let f = add(&mut tree, c, "test-factory", "f()", NodeKind::Factory);
            tree.register_dynamic_child(f, "dynamic-test", "#1", "a").unwrap();
            let err = tree
                .register_dynamic_child(f, "dynamic-test", "#1", "a")
                .unwrap_err();
            assert!(matches!(err, TreeError::DuplicateIdentifier { .. }));
        }
    }

    #[test]
    fn tree_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TestTree>();
    }
}
