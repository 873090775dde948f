//! Member selection and member node construction.

use tracing::warn;

use crate::error::DiscoveryError;
use crate::filter::FilterContribution;
use crate::identifier::segment_type;
use crate::inspector::{MemberInfo, MemberKind};
use crate::report::{IssueKind, ResolutionIssue};
use crate::selector::{MemberSignature, Selector, SelectorError};
use crate::tree::{NodeId, NodeKind};

use super::{node_data, Resolution};

/// Segment type and node kind for a test-bearing member kind.
pub(super) fn member_shape(kind: MemberKind) -> Option<(&'static str, NodeKind)> {
    match kind {
        MemberKind::Test => Some((segment_type::TEST, NodeKind::Test)),
        MemberKind::Factory => Some((segment_type::FACTORY, NodeKind::Factory)),
        MemberKind::Template => Some((segment_type::TEMPLATE, NodeKind::Template)),
        MemberKind::Plain => None,
    }
}

impl Resolution<'_> {
    pub(super) fn resolve_member_selector(
        &mut self,
        selector: &Selector,
        container: &str,
        member: &str,
    ) -> Result<(), DiscoveryError> {
        let signature = match MemberSignature::parse_selector(member) {
            Ok(signature) => signature,
            Err(err) => {
                self.malformed_signature(selector, &err);
                return Ok(());
            }
        };

        let info = match self.inspector.find_container(container) {
            Ok(Some(info)) if !info.is_abstract => info,
            Ok(_) => {
                self.not_found(
                    selector,
                    format!("Container '{container}' could not be resolved."),
                );
                return Ok(());
            }
            Err(err) => {
                self.inspector_failure(selector, container, &err);
                return Ok(());
            }
        };

        let found = match self.inspector.find_member(&info, &signature) {
            Ok(Some(found)) if member_shape(found.kind).is_some() => found,
            Ok(_) => {
                self.not_found(
                    selector,
                    format!("Member '{member}' in container '{container}' could not be resolved."),
                );
                return Ok(());
            }
            Err(err) => {
                self.inspector_failure(selector, &format!("{container}#{signature}"), &err);
                return Ok(());
            }
        };

        let Some(container_node) = self.container_node(selector, &info)? else {
            self.not_found(
                selector,
                format!("Container '{container}' could not be resolved."),
            );
            return Ok(());
        };
        if let Some(node) = self.member_node(container_node, &found)? {
            self.select_in_full(node)?;
        }
        Ok(())
    }

    /// The node for `member` under `container`, or `None` for members that
    /// are not test-bearing.
    pub(super) fn member_node(
        &mut self,
        container: NodeId,
        member: &MemberInfo,
    ) -> Result<Option<NodeId>, DiscoveryError> {
        let Some((segment, kind)) = member_shape(member.kind) else {
            return Ok(None);
        };
        let signature = member.signature().to_string();
        let identifier = self
            .identifier_of(container)?
            .append(segment, signature.as_str());
        let element = format!("{}#{}", member.declaring_container, signature);
        let (id, _) = self.ctx.get_or_create(identifier, || {
            node_data(
                &element,
                &signature,
                kind,
                member.source.as_ref(),
                &member.markers,
            )
        })?;
        Ok(Some(id))
    }

    /// Record that `node` was selected without narrowing its runtime
    /// descendants.
    pub(super) fn select_in_full(&mut self, node: NodeId) -> Result<(), DiscoveryError> {
        let has_filter = self
            .ctx
            .tree()
            .get(node)
            .is_some_and(|n| n.kind().has_dynamic_children());
        if has_filter {
            let owner = self.identifier_of(node)?;
            self.ctx.contribute(owner, FilterContribution::AllowAll);
        }
        Ok(())
    }

    fn malformed_signature(&mut self, selector: &Selector, err: &SelectorError) {
        let message = format!("Selector '{selector}' names a malformed member signature.");
        warn!(error = %err, "{}", message);
        self.ctx.report_issue(
            ResolutionIssue::new(IssueKind::MalformedSelector, selector.to_string(), message)
                .with_cause(err),
        );
    }
}
