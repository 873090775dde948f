//! Accept/reject predicate for runtime-produced descendants.
//!
//! Factories and templates only learn their children once they execute. Such
//! nodes carry a [`DynamicDescendantFilter`] that discovery fills with
//! [`FilterContribution`]s and the runner consults once per produced child.

use indexmap::IndexSet;

use crate::identifier::Identifier;

/// One rule contributed to a filter during discovery.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterContribution {
    /// The owning node was selected in full.
    AllowAll,
    /// Only this runtime-only descendant path was targeted.
    AllowDescendant(Identifier),
}

/// Filter attached to a node whose descendants are produced at execution time.
///
/// - No contributions: every candidate is accepted.
/// - Any [`FilterContribution::AllowAll`]: every candidate is accepted.
/// - Otherwise a candidate is accepted if it equals a target, lies on the
///   path to a target, or lies beneath a target.
///
/// Contributions only add; nothing narrows an accepted set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DynamicDescendantFilter {
    allow_all: bool,
    allowed: IndexSet<Identifier>,
}

impl DynamicDescendantFilter {
    /// A filter accepting everything.
    pub fn new() -> Self {
        DynamicDescendantFilter::default()
    }

    pub(crate) fn apply(&mut self, contribution: FilterContribution) {
        match contribution {
            FilterContribution::AllowAll => self.allow_all = true,
            FilterContribution::AllowDescendant(id) => {
                self.allowed.insert(id);
            }
        }
    }

    /// Decide whether a runtime-produced descendant should be included.
    pub fn test(&self, candidate: &Identifier) -> bool {
        self.accepts_all()
            || self
                .allowed
                .iter()
                .any(|target| target.has_prefix(candidate) || candidate.has_prefix(target))
    }

    /// True when no allow-list is in effect.
    pub fn accepts_all(&self) -> bool {
        self.allow_all || self.allowed.is_empty()
    }

    /// Targeted descendant paths in contribution order.
    pub fn allowed(&self) -> impl Iterator<Item = &Identifier> {
        self.allowed.iter()
    }
}
