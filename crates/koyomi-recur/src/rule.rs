//! Persisted recurrence rule entity.
//!
//! Derived from the raw rule text once per run; on subsequent runs the same
//! identity is reused and the entity is updated in place, so dependent
//! override records are never orphaned.

use chrono::{NaiveDate, Weekday};
use koyomi_core::types::{Instant, RuleId, TargetKey};
use rrule::{Frequency, NWeekday, RRule, Tz as RRuleTz, Unvalidated};

use crate::error::{RecurError, RecurResult};

/// How a rule's expansion terminates. At most one of an UNTIL date or a
/// COUNT limit is carried; a rule with neither is unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Until(NaiveDate),
    Count(u32),
    Unlimited,
}

impl Termination {
    #[must_use]
    pub fn is_unlimited(self) -> bool {
        matches!(self, Self::Unlimited)
    }

    /// Human-readable limit label, `None` when unlimited.
    #[must_use]
    pub fn limit_label(self) -> Option<String> {
        match self {
            Self::Until(date) => Some(format!("UNTIL={}", date.format("%Y-%m-%d"))),
            Self::Count(n) => Some(format!("COUNT={n}")),
            Self::Unlimited => None,
        }
    }
}

/// Persisted recurrence rule record.
#[derive(Debug, Clone)]
pub struct RecurrenceRule {
    pub id: RuleId,
    /// Raw RFC 5545 rule text.
    pub rule: String,
    /// Frequency label (e.g. "WEEKLY").
    pub freq: String,
    pub termination: Termination,
    /// BYDAY constraint entries (e.g. "MO", "2TU"), empty when absent.
    pub by_day: Vec<String>,
    /// Target field this rule is persisted under.
    pub target: TargetKey,
    /// Seed event start, also the expansion DTSTART.
    pub start: Instant,
    /// Seed event end.
    pub end: Instant,
}

impl RecurrenceRule {
    /// ## Summary
    /// Derives a rule record from raw rule text, validating the text against
    /// the seed event start.
    ///
    /// ## Errors
    /// Returns `RecurError::RuleSyntax` if the rule text does not parse or
    /// does not validate against the start instant.
    pub fn derive(
        id: RuleId,
        rrule_text: &str,
        target: TargetKey,
        start: Instant,
        end: Instant,
    ) -> RecurResult<Self> {
        let unvalidated = rrule_text.parse::<RRule<Unvalidated>>()?;
        let dt_start = start.with_timezone(&RRuleTz::Tz(start.timezone()));
        let set = unvalidated.build(dt_start)?;
        let validated = set
            .get_rrule()
            .first()
            .ok_or(RecurError::InvariantViolation("validated rule set is empty"))?;

        let termination = if let Some(until) = validated.get_until() {
            Termination::Until(until.date_naive())
        } else if let Some(count) = validated.get_count() {
            Termination::Count(count)
        } else {
            Termination::Unlimited
        };

        let by_day = validated
            .get_by_weekday()
            .iter()
            .copied()
            .map(byday_entry)
            .collect();

        Ok(Self {
            id,
            rule: rrule_text.to_string(),
            freq: freq_label(validated.get_freq()).to_string(),
            termination,
            by_day,
            target,
            start,
            end,
        })
    }
}

fn freq_label(freq: Frequency) -> &'static str {
    match freq {
        Frequency::Yearly => "YEARLY",
        Frequency::Monthly => "MONTHLY",
        Frequency::Weekly => "WEEKLY",
        Frequency::Daily => "DAILY",
        Frequency::Hourly => "HOURLY",
        Frequency::Minutely => "MINUTELY",
        Frequency::Secondly => "SECONDLY",
    }
}

fn byday_entry(weekday: NWeekday) -> String {
    match weekday {
        NWeekday::Every(day) => weekday_code(day).to_string(),
        NWeekday::Nth(n, day) => format!("{n}{}", weekday_code(day)),
    }
}

fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}
