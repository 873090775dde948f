//! The resolver chain.
//!
//! [`EngineDiscoveryResolver`] drives every selector of a
//! [`DiscoveryRequest`] through the resolver for its kind, merging results
//! into the tree through one [`ResolutionContext`]:
//!
//! - container, grouping-path and root-location selectors: [`container`]
//! - member selectors: [`member`]
//! - identifier selectors: [`unique_id`], a registry of per-segment-type
//!   resolvers walked root to leaf
//!
//! Only configuration errors abort a run. Everything else becomes a
//! [`ResolutionIssue`] in the returned [`DiscoveryReport`].

mod container;
mod member;
mod unique_id;

use indexmap::IndexSet;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::context::ResolutionContext;
use crate::error::DiscoveryError;
use crate::identifier::Identifier;
use crate::inspector::{ElementInspector, InspectorError, Markers};
use crate::metadata::ExecutionDeclarations;
use crate::report::{DiscoveryReport, IssueKind, ResolutionIssue};
use crate::selector::{DiscoveryRequest, Selector, SelectorError};
use crate::tree::{NodeData, NodeId, NodeKind, TestTree, TreeError};
use crate::types::SourceLocation;

use unique_id::SegmentRegistry;

/// Resolves discovery requests against an element inspector.
pub struct EngineDiscoveryResolver<'a> {
    inspector: &'a dyn ElementInspector,
    config: &'a EngineConfig,
}

impl<'a> EngineDiscoveryResolver<'a> {
    pub fn new(inspector: &'a dyn ElementInspector, config: &'a EngineConfig) -> Self {
        EngineDiscoveryResolver { inspector, config }
    }

    /// Resolve every selector of `request` into `tree`.
    ///
    /// Selectors are processed in the order received. The tree is pruned of
    /// empty containers before returning.
    ///
    /// Resolution works on a copy of `tree`; an error leaves `tree` as it
    /// was before the call.
    pub fn resolve(
        &self,
        request: &DiscoveryRequest,
        tree: &mut TestTree,
    ) -> Result<DiscoveryReport, DiscoveryError> {
        let mut scratch = tree.clone();
        let report = {
            let mut resolution = Resolution {
                inspector: self.inspector,
                config: self.config,
                registry: SegmentRegistry::standard(),
                ctx: ResolutionContext::new(&mut scratch),
            };

            for rejected in request.rejected() {
                resolution.malformed_input(&rejected.input, &rejected.error);
            }
            for selector in request.selectors() {
                resolution.resolve_selector(selector)?;
            }

            resolution.ctx.finish()
        };
        *tree = scratch;
        Ok(report)
    }
}

/// State shared by the individual resolvers during one run.
pub(crate) struct Resolution<'a> {
    inspector: &'a dyn ElementInspector,
    config: &'a EngineConfig,
    registry: SegmentRegistry,
    ctx: ResolutionContext<'a>,
}

impl Resolution<'_> {
    fn resolve_selector(&mut self, selector: &Selector) -> Result<(), DiscoveryError> {
        match selector {
            Selector::ByContainer { name } => self.resolve_container_selector(selector, name),
            Selector::ByMember { container, member } => {
                self.resolve_member_selector(selector, container, member)
            }
            Selector::ByGroupingPath { path, base } => {
                let found = self.inspector.containers_in_path(path, base.as_deref());
                self.resolve_candidates(selector, found)
            }
            Selector::ByRootLocation { location } => {
                let found = self.inspector.containers_in_root(location);
                self.resolve_candidates(selector, found)
            }
            Selector::ByIdentifier { id } => self.resolve_identifier(selector, id),
        }
    }

    fn identifier_of(&self, node: NodeId) -> Result<Identifier, DiscoveryError> {
        self.ctx
            .tree()
            .get(node)
            .map(|n| n.identifier().clone())
            .ok_or(DiscoveryError::Tree(TreeError::UnknownNode(node)))
    }

    // ------------------------------------------------------------------------
    // Issue reporting
    // ------------------------------------------------------------------------

    fn not_found(&mut self, selector: &Selector, message: String) {
        debug!(selector = selector.kind_name(), "{}", message);
        self.ctx
            .report_issue(ResolutionIssue::new(IssueKind::NotFound, selector.to_string(), message));
    }

    fn inspector_failure(&mut self, selector: &Selector, element: &str, err: &InspectorError) {
        let message = format!("Element '{element}' could not be inspected.");
        warn!(error = %err, "{}", message);
        self.ctx.report_issue(
            ResolutionIssue::new(IssueKind::InspectorFailure, selector.to_string(), message)
                .with_cause(err),
        );
    }

    fn malformed_input(&mut self, input: &str, err: &SelectorError) {
        let kind = match err {
            SelectorError::Identifier(_) => IssueKind::MalformedIdentifier,
            _ => IssueKind::MalformedSelector,
        };
        let message = format!("Selector '{input}' could not be parsed.");
        warn!(error = %err, "{}", message);
        self.ctx
            .report_issue(ResolutionIssue::new(kind, input, message).with_cause(err));
    }
}

// ============================================================================
// Node construction helpers
// ============================================================================

/// Build node data from inspected markers, validating declarations.
pub(crate) fn node_data(
    element: &str,
    default_display_name: &str,
    kind: NodeKind,
    source: Option<&SourceLocation>,
    markers: &Markers,
) -> Result<NodeData, DiscoveryError> {
    let declarations = ExecutionDeclarations::from_markers(markers, element)?;
    let display_name = markers
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(default_display_name);
    Ok(NodeData {
        display_name: display_name.to_string(),
        kind,
        source: source.cloned(),
        tags: valid_tags(&markers.tags, element),
        declarations,
    })
}

const RESERVED_TAG_CHARS: [char; 6] = [',', '(', ')', '&', '|', '!'];

/// A tag is valid when it is not blank and holds no whitespace, ISO control
/// characters or reserved characters.
pub fn is_valid_tag(tag: &str) -> bool {
    let trimmed = tag.trim();
    !trimmed.is_empty()
        && !trimmed
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || RESERVED_TAG_CHARS.contains(&c))
}

fn valid_tags(raw: &[String], element: &str) -> IndexSet<String> {
    let mut tags = IndexSet::new();
    for tag in raw {
        if is_valid_tag(tag) {
            tags.insert(tag.trim().to_string());
        } else {
            warn!("Invalid tag '{}' declared on [{}]; the tag will be ignored.", tag, element);
        }
    }
    tags
}
