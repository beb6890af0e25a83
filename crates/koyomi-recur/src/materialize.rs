//! Final instance materialization.
//!
//! Walks the bounded occurrence window (with reconciled override records
//! applied) and emits the ordered instance list handed back to the batch
//! driver. Durations are always recomputed from the final value pair, so the
//! emitted list is uniformly in rounded minutes regardless of override
//! provenance.

use std::collections::BTreeMap;

use koyomi_core::types::{Instant, RuleId};
use serde::Serialize;

use crate::expand::Occurrence;
use crate::reconcile::OverrideRecord;

/// One emitted event instance. Ephemeral: returned to the caller each run,
/// never persisted by this layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventInstance {
    /// Start epoch seconds.
    pub value: i64,
    /// End epoch seconds.
    pub end_value: i64,
    /// Span in minutes, rounded half-up.
    pub duration: i64,
    pub rrule: Option<RuleId>,
    pub rrule_index: Option<usize>,
    /// Reserved; always empty in the current design.
    pub timezone: String,
}

/// Span in whole minutes, rounded half-up.
fn duration_minutes(value: i64, end_value: i64) -> i64 {
    (end_value - value + 30).div_euclid(60)
}

/// ## Summary
/// Materializes the recurring path: one instance per occurrence, with
/// override records applied. A suppression override (no replacement timing)
/// removes its occurrence; a replacement override substitutes its timing.
#[must_use]
pub fn materialize_recurring(
    occurrences: &[Occurrence],
    overrides: &BTreeMap<usize, OverrideRecord>,
    rule: RuleId,
) -> Vec<EventInstance> {
    let mut instances = Vec::with_capacity(occurrences.len());

    for occurrence in occurrences {
        let (value, end_value) = match overrides.get(&occurrence.index) {
            Some(record) => match (record.value, record.end_value) {
                (Some(value), Some(end_value)) => (value, end_value),
                // Suppressed occurrence.
                _ => {
                    tracing::trace!(index = occurrence.index, "Occurrence suppressed");
                    continue;
                }
            },
            None => (occurrence.start.timestamp(), occurrence.end.timestamp()),
        };

        instances.push(EventInstance {
            value,
            end_value,
            duration: duration_minutes(value, end_value),
            rrule: Some(rule),
            rrule_index: Some(occurrence.index),
            timezone: String::new(),
        });
    }

    instances
}

/// Materializes the non-recurring path: a single instance spanning the
/// normalized start/end, with no rule identity and no index.
#[must_use]
pub fn materialize_single(start: Instant, end: Instant) -> EventInstance {
    let value = start.timestamp();
    let end_value = end.timestamp();
    EventInstance {
        value,
        end_value,
        duration: duration_minutes(value, end_value),
        rrule: None,
        rrule_index: None,
        timezone: String::new(),
    }
}
