//! Occurrence expansion capability.
//!
//! Rule expansion is consumed as a black box: any RFC 5545-compatible
//! expander that yields chronologically ordered, 0-indexed occurrences over a
//! bounded window satisfies [`OccurrenceExpander`]. The default
//! implementation is backed by the `rrule` crate.

use chrono::TimeDelta;
use koyomi_core::types::Instant;
use rrule::{RRule, Tz as RRuleTz, Unvalidated};

use crate::error::RecurResult;

/// One concrete timestamp pair generated by expanding a recurrence rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    /// Ordinal within the expanded window, 0-based, chronological.
    pub index: usize,
    pub start: Instant,
    pub end: Instant,
}

/// Capability interface for recurrence-rule expansion.
pub trait OccurrenceExpander {
    /// ## Summary
    /// Expands `rule` anchored at `dtstart` over the `[after, before]`
    /// window. Each occurrence spans the seed event's duration.
    ///
    /// ## Errors
    /// Returns `RecurError::RuleSyntax` if the rule text is not expandable.
    fn expand(
        &self,
        rule: &str,
        dtstart: Instant,
        duration: TimeDelta,
        after: Instant,
        before: Instant,
    ) -> RecurResult<Vec<Occurrence>>;
}

/// [`OccurrenceExpander`] backed by the `rrule` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct RRuleExpander;

impl OccurrenceExpander for RRuleExpander {
    fn expand(
        &self,
        rule: &str,
        dtstart: Instant,
        duration: TimeDelta,
        after: Instant,
        before: Instant,
    ) -> RecurResult<Vec<Occurrence>> {
        let tz = dtstart.timezone();
        let rrule = rule.parse::<RRule<Unvalidated>>()?;
        let dt_start = dtstart.with_timezone(&RRuleTz::Tz(tz));
        let mut rrule_set = rrule.build(dt_start)?;

        // `after` is exclusive in the rrule crate; widen by a second so an
        // occurrence exactly on the window bound is kept.
        let inclusive_after = after - TimeDelta::seconds(1);
        rrule_set = rrule_set
            .after(inclusive_after.with_timezone(&RRuleTz::Tz(tz)))
            .before(before.with_timezone(&RRuleTz::Tz(tz)));

        let dates = rrule_set.all(u16::MAX).dates;
        tracing::trace!(rule = %rule, count = dates.len(), "Expanded occurrences");

        Ok(dates
            .into_iter()
            .enumerate()
            .map(|(index, date)| {
                let start = date.with_timezone(&tz);
                Occurrence {
                    index,
                    start,
                    end: start + duration,
                }
            })
            .collect())
    }
}
