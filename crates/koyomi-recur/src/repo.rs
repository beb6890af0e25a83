//! Persistence boundary for rule and override records.
//!
//! The transformation core never holds a live handle into a storage
//! framework; collaborators implement [`RecurrenceRepository`] over whatever
//! engine they use. [`MemoryRepository`] is the reference implementation,
//! used by the test suites and suitable for single-process batch drivers.

use std::collections::{BTreeMap, HashMap};

use koyomi_core::types::{OverrideId, RuleId};

use crate::error::RecurResult;
use crate::reconcile::{OverrideRecord, ReconcilePlan};
use crate::rule::RecurrenceRule;

/// Create/update/delete/load surface for persisted rule and override state.
///
/// A rule identity that does not resolve is reported as `Ok(None)`; missing
/// prior state is never an error.
pub trait RecurrenceRepository {
    /// ## Errors
    /// Returns `RecurError::RepositoryError` if the backing store fails.
    fn load_rule(&self, id: RuleId) -> RecurResult<Option<RecurrenceRule>>;

    /// Creates the rule or updates it in place under the same identity.
    ///
    /// ## Errors
    /// Returns `RecurError::RepositoryError` if the backing store fails.
    fn upsert_rule(&mut self, rule: &RecurrenceRule) -> RecurResult<()>;

    /// Deletes the rule and, transitively, its override records.
    ///
    /// ## Errors
    /// Returns `RecurError::RepositoryError` if the backing store fails.
    fn delete_rule(&mut self, id: RuleId) -> RecurResult<()>;

    /// Loads the rule's override records keyed by occurrence index.
    ///
    /// ## Errors
    /// Returns `RecurError::RepositoryError` if the backing store fails.
    fn load_overrides(&self, rule: RuleId) -> RecurResult<BTreeMap<usize, OverrideRecord>>;

    /// ## Errors
    /// Returns `RecurError::RepositoryError` if the backing store fails.
    fn create_override(&mut self, record: &OverrideRecord) -> RecurResult<()>;

    /// ## Errors
    /// Returns `RecurError::RepositoryError` if the backing store fails.
    fn update_override(&mut self, record: &OverrideRecord) -> RecurResult<()>;

    /// ## Errors
    /// Returns `RecurError::RepositoryError` if the backing store fails.
    fn delete_override(&mut self, id: OverrideId) -> RecurResult<()>;

    /// ## Summary
    /// Applies a reconcile plan: updates, then creates, then deletes.
    ///
    /// ## Errors
    /// Returns `RecurError::RepositoryError` if the backing store fails.
    fn apply_plan(&mut self, plan: &ReconcilePlan) -> RecurResult<()> {
        for record in &plan.update {
            self.update_override(record)?;
        }
        for record in &plan.create {
            self.create_override(record)?;
        }
        for record in &plan.delete {
            self.delete_override(record.id)?;
        }
        Ok(())
    }
}

/// Operation counters, useful for asserting idempotence in tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RepoStats {
    pub rules_upserted: usize,
    pub rules_deleted: usize,
    pub overrides_created: usize,
    pub overrides_updated: usize,
    pub overrides_deleted: usize,
}

/// HashMap-backed [`RecurrenceRepository`].
#[derive(Debug, Default)]
pub struct MemoryRepository {
    rules: HashMap<RuleId, RecurrenceRule>,
    overrides: HashMap<OverrideId, OverrideRecord>,
    pub stats: RepoStats,
}

impl MemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }
}

impl RecurrenceRepository for MemoryRepository {
    fn load_rule(&self, id: RuleId) -> RecurResult<Option<RecurrenceRule>> {
        Ok(self.rules.get(&id).cloned())
    }

    fn upsert_rule(&mut self, rule: &RecurrenceRule) -> RecurResult<()> {
        self.stats.rules_upserted += 1;
        self.rules.insert(rule.id, rule.clone());
        Ok(())
    }

    fn delete_rule(&mut self, id: RuleId) -> RecurResult<()> {
        self.stats.rules_deleted += 1;
        self.rules.remove(&id);
        // Cascade to the rule's overrides.
        self.overrides.retain(|_, record| record.rule != id);
        Ok(())
    }

    fn load_overrides(&self, rule: RuleId) -> RecurResult<BTreeMap<usize, OverrideRecord>> {
        Ok(self
            .overrides
            .values()
            .filter(|record| record.rule == rule)
            .map(|record| (record.rrule_index, record.clone()))
            .collect())
    }

    fn create_override(&mut self, record: &OverrideRecord) -> RecurResult<()> {
        self.stats.overrides_created += 1;
        self.overrides.insert(record.id, record.clone());
        Ok(())
    }

    fn update_override(&mut self, record: &OverrideRecord) -> RecurResult<()> {
        self.stats.overrides_updated += 1;
        self.overrides.insert(record.id, record.clone());
        Ok(())
    }

    fn delete_override(&mut self, id: OverrideId) -> RecurResult<()> {
        self.stats.overrides_deleted += 1;
        self.overrides.remove(&id);
        Ok(())
    }
}
