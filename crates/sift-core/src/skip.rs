//! Skip evaluation before a node executes.
//!
//! The runner calls [`should_be_skipped`] once per node. Failures recorded
//! while setting the node up are surfaced first; only a node whose setup
//! succeeded reaches the [`ConditionEvaluator`].

use std::fmt;

use thiserror::Error;

use crate::identifier::Identifier;
use crate::tree::TestNode;

/// Reason used when a condition disables a node without saying why.
pub const UNKNOWN_REASON: &str = "<unknown>";

/// Setup of a node failed before it could be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// One or more failures were recorded during setup.
    #[error("setup of {identifier} failed: {}", .failures.join("; "))]
    DeferredSetupFailure {
        identifier: Identifier,
        failures: Vec<String>,
    },
}

/// Outcome of a single condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionResult {
    disabled: bool,
    reason: Option<String>,
}

impl ConditionResult {
    pub fn enabled() -> Self {
        ConditionResult {
            disabled: false,
            reason: None,
        }
    }

    pub fn disabled(reason: Option<String>) -> Self {
        ConditionResult {
            disabled: true,
            reason: reason.filter(|r| !r.trim().is_empty()),
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

/// Decides whether a node should run.
pub trait ConditionEvaluator {
    fn evaluate(&self, node: &TestNode) -> ConditionResult;
}

impl<F> ConditionEvaluator for F
where
    F: Fn(&TestNode) -> ConditionResult,
{
    fn evaluate(&self, node: &TestNode) -> ConditionResult {
        self(node)
    }
}

/// Skip signal handed back to the tree walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipResult {
    Proceed,
    Skip { reason: String },
}

impl SkipResult {
    pub fn is_skipped(&self) -> bool {
        matches!(self, SkipResult::Skip { .. })
    }
}

impl fmt::Display for SkipResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipResult::Proceed => f.write_str("proceed"),
            SkipResult::Skip { reason } => write!(f, "skipped: {reason}"),
        }
    }
}

/// Failures collected while preparing a node, reported before skip evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeferredFailures {
    failures: Vec<String>,
}

impl DeferredFailures {
    pub fn new() -> Self {
        DeferredFailures::default()
    }

    pub fn record(&mut self, failure: impl fmt::Display) {
        self.failures.push(failure.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Translate the evaluator's verdict into a skip signal, after surfacing any
/// deferred setup failure.
pub fn should_be_skipped(
    node: &TestNode,
    deferred: &DeferredFailures,
    evaluator: &dyn ConditionEvaluator,
) -> Result<SkipResult, ExecutionError> {
    if !deferred.is_empty() {
        return Err(ExecutionError::DeferredSetupFailure {
            identifier: node.identifier().clone(),
            failures: deferred.failures.clone(),
        });
    }
    let result = evaluator.evaluate(node);
    if !result.is_disabled() {
        return Ok(SkipResult::Proceed);
    }
    Ok(SkipResult::Skip {
        reason: result.reason.unwrap_or_else(|| UNKNOWN_REASON.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::config::EngineConfig;
    use crate::tree::TestTree;

    fn with_root<T>(f: impl FnOnce(&TestNode) -> T) -> T {
        let tree = TestTree::new(&EngineConfig::default());
        f(tree.get(tree.root()).unwrap())
    }

    #[test]
    fn enabled_node_proceeds() {
        with_root(|node| {
            let result =
                should_be_skipped(node, &DeferredFailures::new(), &|_: &TestNode| {
                    ConditionResult::enabled()
                })
                .unwrap();
            assert_eq!(result, SkipResult::Proceed);
        });
    }

    #[test]
    fn disabled_node_carries_reason() {
        with_root(|node| {
            let result = should_be_skipped(node, &DeferredFailures::new(), &|_: &TestNode| {
                ConditionResult::disabled(Some("not on CI".to_string()))
            })
            .unwrap();
            assert_eq!(
                result,
                SkipResult::Skip {
                    reason: "not on CI".to_string()
                }
            );
            assert!(result.is_skipped());
        });
    }

    #[test]
    fn missing_reason_is_unknown() {
        with_root(|node| {
            let result = should_be_skipped(node, &DeferredFailures::new(), &|_: &TestNode| {
                ConditionResult::disabled(None)
            })
            .unwrap();
            assert_eq!(result.to_string(), "skipped: <unknown>");
        });
    }

    #[test]
    fn deferred_failure_wins_and_evaluator_is_not_called() {
        with_root(|node| {
            let called = Cell::new(false);
            let evaluator = |_: &TestNode| {
                called.set(true);
                ConditionResult::disabled(None)
            };
            let mut deferred = DeferredFailures::new();
            deferred.record("fixture could not be created");

            let err = should_be_skipped(node, &deferred, &evaluator).unwrap_err();
            assert!(err.to_string().contains("fixture could not be created"));
            assert!(!called.get());
        });
    }
}
