//! Identifier selection.
//!
//! An identifier is walked root to leaf. Each segment is handed to the
//! resolver registered for its type together with the step resolved so far.
//! The walk stops at the first segment nothing can resolve; the prefix
//! resolved up to that point stays in the tree and the remainder is
//! reported. A segment naming an element that exists but is not test-bearing,
//! or one that cannot be parsed or examined, declines the whole identifier
//! instead: nothing is kept. A runtime-only segment directly beneath a
//! factory or template ends the walk successfully with a filter
//! contribution.

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::DiscoveryError;
use crate::filter::FilterContribution;
use crate::identifier::{segment_type, Identifier, Segment};
use crate::inspector::ContainerInfo;
use crate::report::{IssueKind, ResolutionIssue};
use crate::selector::{MemberSignature, Selector};
use crate::tree::NodeId;

use super::member::member_shape;
use super::Resolution;

/// What a resolved node stands for.
#[derive(Debug, Clone)]
pub(super) enum Element {
    Engine,
    Container(ContainerInfo),
    Member,
}

/// A resolved prefix of the identifier being walked.
#[derive(Debug, Clone)]
pub(super) struct Step {
    node: NodeId,
    element: Element,
}

/// Result of resolving one segment.
pub(super) enum SegmentOutcome {
    Resolved(Step),
    /// Nothing matches the segment.
    Unmatched,
    /// The segment names something that cannot be selected.
    Declined {
        kind: IssueKind,
        cause: Option<String>,
    },
}

impl SegmentOutcome {
    fn failed(kind: IssueKind, cause: impl ToString) -> Self {
        SegmentOutcome::Declined {
            kind,
            cause: Some(cause.to_string()),
        }
    }
}

type SegmentResolver =
    fn(&mut Resolution<'_>, &Selector, &Step, &Segment) -> Result<SegmentOutcome, DiscoveryError>;

/// Segment resolvers keyed by segment type.
pub(super) struct SegmentRegistry {
    resolvers: IndexMap<&'static str, SegmentResolver>,
}

impl SegmentRegistry {
    /// Resolvers for every statically resolvable segment type.
    pub(super) fn standard() -> Self {
        let mut resolvers: IndexMap<&'static str, SegmentResolver> = IndexMap::new();
        resolvers.insert(segment_type::CONTAINER, resolve_container_segment);
        resolvers.insert(segment_type::NESTED_CONTAINER, resolve_nested_segment);
        resolvers.insert(segment_type::TEST, resolve_member_segment);
        resolvers.insert(segment_type::FACTORY, resolve_member_segment);
        resolvers.insert(segment_type::TEMPLATE, resolve_member_segment);
        SegmentRegistry { resolvers }
    }

    fn get(&self, segment: &str) -> Option<SegmentResolver> {
        self.resolvers.get(segment).copied()
    }
}

impl Resolution<'_> {
    pub(super) fn resolve_identifier(
        &mut self,
        selector: &Selector,
        id: &Identifier,
    ) -> Result<(), DiscoveryError> {
        let segments = id.segments();
        let Some(engine) = segments.first() else {
            self.unresolved_identifier(selector, id, self.ctx.root(), 0, None);
            return Ok(());
        };
        if engine.segment_type() != segment_type::ENGINE || engine.value() != self.config.engine_id {
            let message = format!(
                "Identifier '{id}' does not belong to engine '{}'.",
                self.config.engine_id
            );
            self.not_found(selector, message);
            return Ok(());
        }

        let mut step = Step {
            node: self.ctx.root(),
            element: Element::Engine,
        };
        for (index, segment) in segments.iter().enumerate().skip(1) {
            if segment_type::is_runtime_only(segment.segment_type()) && self.has_filter(step.node) {
                let owner = self.identifier_of(step.node)?;
                let target = Identifier::from_segments(
                    owner.segments().iter().chain(&segments[index..]).cloned(),
                );
                debug!("Identifier '{}' targets a runtime descendant of '{}'.", id, owner);
                self.ctx
                    .contribute(owner, FilterContribution::AllowDescendant(target));
                return Ok(());
            }

            let outcome = match self.registry.get(segment.segment_type()) {
                Some(resolver) => resolver(self, selector, &step, segment)?,
                None => SegmentOutcome::Unmatched,
            };
            match outcome {
                SegmentOutcome::Resolved(next) => step = next,
                SegmentOutcome::Unmatched => {
                    self.unresolved_identifier(selector, id, step.node, index, None);
                    return Ok(());
                }
                SegmentOutcome::Declined { kind, cause } => {
                    self.unresolved_identifier(selector, id, step.node, index, Some((kind, cause)));
                    return Ok(());
                }
            }
        }

        match step.element {
            Element::Engine => Ok(()),
            Element::Container(info) => self.expand_container(selector, step.node, &info),
            Element::Member => self.select_in_full(step.node),
        }
    }

    fn has_filter(&self, node: NodeId) -> bool {
        self.ctx.tree().dynamic_filter(node).is_some()
    }

    /// Report an identifier whose segments from `index` on were not resolved.
    ///
    /// Without a `declined` reason and past the first static segment, the
    /// walk resolved a prefix: `resolved` is the deepest node reached and is
    /// kept through pruning. Otherwise nothing is kept.
    fn unresolved_identifier(
        &mut self,
        selector: &Selector,
        id: &Identifier,
        resolved: NodeId,
        index: usize,
        declined: Option<(IssueKind, Option<String>)>,
    ) {
        let unresolved: Vec<Segment> = id.segments().iter().skip(index).cloned().collect();

        let (kind, message, cause) = match declined {
            Some((kind, cause)) => (kind, format!("Identifier '{id}' could not be resolved."), cause),
            None if index <= 1 => (
                IssueKind::NotFound,
                format!("Identifier '{id}' could not be resolved."),
                None,
            ),
            None => {
                self.ctx.pin(resolved);
                let listed: Vec<String> = unresolved.iter().map(ToString::to_string).collect();
                (
                    IssueKind::PartiallyResolved,
                    format!(
                        "Identifier '{id}' could only be partially resolved. All resolved \
                         segments will be executed; however, the following segments could not \
                         be resolved: [{}]",
                        listed.join(", ")
                    ),
                    None,
                )
            }
        };

        match &cause {
            Some(cause) => warn!(error = %cause, "{}", message),
            None => warn!("{}", message),
        }
        let mut issue =
            ResolutionIssue::new(kind, selector.to_string(), message).with_unresolved(unresolved);
        issue.cause = cause;
        self.ctx.report_issue(issue);
    }
}

// ============================================================================
// Segment resolvers
// ============================================================================

fn resolve_container_segment(
    res: &mut Resolution<'_>,
    selector: &Selector,
    parent: &Step,
    segment: &Segment,
) -> Result<SegmentOutcome, DiscoveryError> {
    if !matches!(parent.element, Element::Engine) {
        return Ok(SegmentOutcome::Unmatched);
    }
    let info = match res.inspector.find_container(segment.value()) {
        Ok(Some(info)) if !info.is_abstract && !info.is_nested() => info,
        Ok(_) => return Ok(SegmentOutcome::Unmatched),
        Err(err) => {
            return Ok(SegmentOutcome::failed(IssueKind::InspectorFailure, err))
        }
    };
    Ok(match res.container_node(selector, &info)? {
        Some(node) => SegmentOutcome::Resolved(Step {
            node,
            element: Element::Container(info),
        }),
        None => SegmentOutcome::Unmatched,
    })
}

fn resolve_nested_segment(
    res: &mut Resolution<'_>,
    selector: &Selector,
    parent: &Step,
    segment: &Segment,
) -> Result<SegmentOutcome, DiscoveryError> {
    let Element::Container(outer) = &parent.element else {
        return Ok(SegmentOutcome::Unmatched);
    };
    let nested = match res.inspector.nested_containers(outer) {
        Ok(nested) => nested,
        Err(err) => {
            return Ok(SegmentOutcome::failed(IssueKind::InspectorFailure, err))
        }
    };
    let Some(info) = nested
        .into_iter()
        .find(|c| !c.is_abstract && c.simple_name() == segment.value())
    else {
        return Ok(SegmentOutcome::Unmatched);
    };
    Ok(match res.container_node(selector, &info)? {
        Some(node) => SegmentOutcome::Resolved(Step {
            node,
            element: Element::Container(info),
        }),
        None => SegmentOutcome::Unmatched,
    })
}

fn resolve_member_segment(
    res: &mut Resolution<'_>,
    _selector: &Selector,
    parent: &Step,
    segment: &Segment,
) -> Result<SegmentOutcome, DiscoveryError> {
    let Element::Container(container) = &parent.element else {
        return Ok(SegmentOutcome::Unmatched);
    };
    let signature = match MemberSignature::parse(segment.value()) {
        Ok(signature) => signature,
        Err(err) => {
            return Ok(SegmentOutcome::failed(IssueKind::MalformedSelector, err))
        }
    };
    let member = match res.inspector.find_member(container, &signature) {
        Ok(Some(member)) => member,
        Ok(None) => return Ok(SegmentOutcome::Unmatched),
        Err(err) => {
            return Ok(SegmentOutcome::failed(IssueKind::InspectorFailure, err))
        }
    };
    let Some((expected, _)) = member_shape(member.kind) else {
        return Ok(SegmentOutcome::Declined {
            kind: IssueKind::NotFound,
            cause: None,
        });
    };
    if expected != segment.segment_type() {
        return Ok(SegmentOutcome::Unmatched);
    }
    Ok(match res.member_node(parent.node, &member)? {
        Some(node) => SegmentOutcome::Resolved(Step {
            node,
            element: Element::Member,
        }),
        None => SegmentOutcome::Unmatched,
    })
}
