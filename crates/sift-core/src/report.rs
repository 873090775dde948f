//! Non-fatal discovery outcomes.
//!
//! Every selector that could not be fully resolved leaves one
//! [`ResolutionIssue`] in the [`DiscoveryReport`] returned next to the tree.

use std::fmt;

use serde::Serialize;

use crate::identifier::Segment;

/// Category of a non-fatal resolution problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// The selector matched nothing.
    NotFound,
    /// An identifier resolved a strict prefix only.
    PartiallyResolved,
    /// Identifier text did not parse.
    MalformedIdentifier,
    /// Selector text or a member signature did not parse.
    MalformedSelector,
    /// The element inspector failed for one element.
    InspectorFailure,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::NotFound => "not_found",
            IssueKind::PartiallyResolved => "partially_resolved",
            IssueKind::MalformedIdentifier => "malformed_identifier",
            IssueKind::MalformedSelector => "malformed_selector",
            IssueKind::InspectorFailure => "inspector_failure",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One selector that could not be (fully) resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionIssue {
    /// Category.
    pub kind: IssueKind,
    /// Text form of the offending selector.
    pub selector: String,
    /// Human-readable explanation (the logged message).
    pub message: String,
    /// Identifier segments left unresolved, in order.
    pub unresolved: Vec<Segment>,
    /// Underlying error, when one exists.
    pub cause: Option<String>,
}

impl ResolutionIssue {
    pub fn new(kind: IssueKind, selector: impl Into<String>, message: impl Into<String>) -> Self {
        ResolutionIssue {
            kind,
            selector: selector.into(),
            message: message.into(),
            unresolved: Vec::new(),
            cause: None,
        }
    }

    pub fn with_unresolved(mut self, segments: impl IntoIterator<Item = Segment>) -> Self {
        self.unresolved = segments.into_iter().collect();
        self
    }

    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }
}

/// Issues accumulated over one discovery run, in the order they occurred.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    issues: Vec<ResolutionIssue>,
}

impl DiscoveryReport {
    pub(crate) fn push(&mut self, issue: ResolutionIssue) {
        self.issues.push(issue);
    }

    pub fn issues(&self) -> &[ResolutionIssue] {
        &self.issues
    }

    /// Issues of one kind.
    pub fn of_kind(&self, kind: IssueKind) -> impl Iterator<Item = &ResolutionIssue> {
        self.issues.iter().filter(move |i| i.kind == kind)
    }

    /// True when every selector resolved completely.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}
