//! Common types shared between the tree, inspector and output modules.

use serde::{Deserialize, Serialize};

// ============================================================================
// Source Location
// ============================================================================

/// Where a container or member is declared.
///
/// - `file`: path of the declaring source file (required)
/// - `line`: 1-indexed line number (optional)
/// - `col`: 1-indexed column (optional, only meaningful with `line`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    /// Source file path.
    pub file: String,
    /// Line number (1-indexed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// Column number (1-indexed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col: Option<u32>,
}
