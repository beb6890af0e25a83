//! Override reconciliation.
//!
//! Diffs the freshly computed override parameters against previously
//! persisted override records so the stored state matches the current run's
//! input exactly, with the minimal set of create/update/delete operations.
//! Two passes: scan the new parameters building the update/create sets, then
//! compute deletions as the set difference of existing keys minus claimed
//! keys. Repeated runs with identical input produce an empty plan.

use std::collections::{BTreeMap, HashSet};

use koyomi_core::types::{OverrideId, RuleId};

use crate::overrides::OverrideParams;

/// Persisted reconciliation unit: at most one record per occurrence index
/// per rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideRecord {
    pub id: OverrideId,
    /// Owning rule.
    pub rule: RuleId,
    pub rrule_index: usize,
    /// Replacement start epoch; absent for a suppression.
    pub value: Option<i64>,
    /// Replacement end epoch; absent for a suppression.
    pub end_value: Option<i64>,
    /// Replacement interval in raw elapsed seconds.
    pub duration_seconds: Option<i64>,
}

impl OverrideRecord {
    fn matches(&self, params: &OverrideParams) -> bool {
        self.value == params.value
            && self.end_value == params.end_value
            && self.duration_seconds == params.duration_seconds
    }

    fn with_params(&self, params: &OverrideParams) -> Self {
        Self {
            id: self.id,
            rule: self.rule,
            rrule_index: self.rrule_index,
            value: params.value,
            end_value: params.end_value,
            duration_seconds: params.duration_seconds,
        }
    }
}

/// The create/update/delete operations that make persisted override state
/// match the newly computed parameters.
#[derive(Debug, Default, Clone)]
pub struct ReconcilePlan {
    pub update: Vec<OverrideRecord>,
    pub create: Vec<OverrideRecord>,
    pub delete: Vec<OverrideRecord>,
}

impl ReconcilePlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.update.is_empty() && self.create.is_empty() && self.delete.is_empty()
    }
}

/// ## Summary
/// Computes the reconciliation plan for `rule`.
///
/// An index present in both sets is updated in place (skipped entirely when
/// the stored values already match); an index only in `new_params` gets a
/// fresh record; an existing record whose index is absent from `new_params`
/// is deleted.
#[must_use]
pub fn reconcile<'a>(
    rule: RuleId,
    new_params: impl IntoIterator<Item = &'a OverrideParams>,
    existing: &BTreeMap<usize, OverrideRecord>,
) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();
    let mut claimed: HashSet<usize> = HashSet::new();

    for params in new_params {
        claimed.insert(params.rrule_index);

        match existing.get(&params.rrule_index) {
            Some(record) if record.matches(params) => {
                tracing::trace!(index = params.rrule_index, "Override unchanged");
            }
            Some(record) => plan.update.push(record.with_params(params)),
            None => plan.create.push(OverrideRecord {
                id: OverrideId::new(),
                rule,
                rrule_index: params.rrule_index,
                value: params.value,
                end_value: params.end_value,
                duration_seconds: params.duration_seconds,
            }),
        }
    }

    plan.delete.extend(
        existing
            .values()
            .filter(|record| !claimed.contains(&record.rrule_index))
            .cloned(),
    );

    tracing::debug!(
        rule = %rule,
        update = plan.update.len(),
        create = plan.create.len(),
        delete = plan.delete.len(),
        "Computed override reconcile plan"
    );

    plan
}
