//! JSON output types for CLI responses.
//!
//! Every response has `status` as its first field and carries
//! `schema_version`. Node and issue arrays follow discovery order, so the
//! same input always produces the same output.

use std::io::{self, Write};

use serde::Serialize;

use crate::config::EngineConfig;
use crate::error::{OutputErrorCode, SiftError};
use crate::identifier::Identifier;
use crate::metadata::{ExclusiveResource, ExecutionMetadataResolver, ExecutionMode};
use crate::report::{DiscoveryReport, IssueKind, ResolutionIssue};
use crate::tree::{NodeKind, TestTree};
use crate::types::SourceLocation;

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Discovery Response
// ============================================================================

/// Summary of a node's dynamic descendant filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterInfo {
    /// True when every runtime descendant is accepted.
    pub accepts_all: bool,
    /// Targeted descendant paths (empty when `accepts_all`).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed: Vec<Identifier>,
}

/// One discovered node.
#[derive(Debug, Clone, Serialize)]
pub struct NodeInfo {
    pub id: Identifier,
    /// Parent identifier (`null` for the engine root).
    pub parent: Option<Identifier>,
    pub kind: NodeKind,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceLocation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Effective execution mode.
    pub execution_mode: ExecutionMode,
    /// Effective exclusive resources.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ExclusiveResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterInfo>,
}

/// One unresolved selector.
#[derive(Debug, Clone, Serialize)]
pub struct IssueInfo {
    pub kind: IssueKind,
    pub selector: String,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unresolved: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl From<&ResolutionIssue> for IssueInfo {
    fn from(issue: &ResolutionIssue) -> Self {
        IssueInfo {
            kind: issue.kind,
            selector: issue.selector.clone(),
            message: issue.message.clone(),
            unresolved: issue.unresolved.iter().map(ToString::to_string).collect(),
            cause: issue.cause.clone(),
        }
    }
}

/// Response of `sift discover`.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryResponse {
    /// Status: "ok".
    pub status: String,
    pub schema_version: String,
    /// Engine id of the tree root.
    pub engine: String,
    /// Nodes in pre-order, root first.
    pub nodes: Vec<NodeInfo>,
    /// Selectors that could not be fully resolved.
    pub issues: Vec<IssueInfo>,
}

impl DiscoveryResponse {
    /// Describe a resolved tree and its report.
    pub fn new(tree: &TestTree, report: &DiscoveryReport, config: &EngineConfig) -> Self {
        let metadata = ExecutionMetadataResolver::new(tree, config);
        let nodes = tree
            .iter()
            .map(|(id, node)| NodeInfo {
                id: node.identifier().clone(),
                parent: node
                    .parent()
                    .and_then(|p| tree.get(p))
                    .map(|p| p.identifier().clone()),
                kind: node.kind(),
                display_name: node.display_name().to_string(),
                source: node.source().cloned(),
                tags: node.tags().iter().cloned().collect(),
                execution_mode: metadata
                    .execution_mode(id)
                    .unwrap_or(config.default_execution_mode),
                resources: metadata.exclusive_resources(id),
                filter: node.dynamic_filter().map(|f| FilterInfo {
                    accepts_all: f.accepts_all(),
                    allowed: if f.accepts_all() {
                        Vec::new()
                    } else {
                        f.allowed().cloned().collect()
                    },
                }),
            })
            .collect();

        DiscoveryResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            engine: config.engine_id.clone(),
            nodes,
            issues: report.issues().iter().map(IssueInfo::from).collect(),
        }
    }
}

// ============================================================================
// Error Response
// ============================================================================

/// Error details.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    /// Numeric error code (the process exit code).
    pub code: u8,
    pub message: String,
}

/// Response emitted when a command fails.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    pub schema_version: String,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    /// Create an error response from a SiftError.
    pub fn from_error(err: &SiftError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo {
                code: OutputErrorCode::from(err).code(),
                message: err.to_string(),
            },
        }
    }
}

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

// ============================================================================
// Tests
// ============================================================================
