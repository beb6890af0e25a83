//! Override extraction and occurrence matching.
//!
//! An [`Override`] is a request to suppress or replace the timing of one
//! specific occurrence. Exception-date tokens yield suppressions (no
//! replacement timing); recurrence payloads yield replacements. Matching
//! against expanded occurrences is by exact start-instant equality on the
//! epoch-second value.

use std::collections::BTreeMap;

use chrono::{NaiveDateTime, TimeDelta};
use chrono_tz::Tz;
use koyomi_core::error::CoreError;
use koyomi_core::types::Instant;

use crate::error::RecurResult;
use crate::expand::Occurrence;
use crate::input::RecurrencePayload;
use crate::time::resolve_local;

/// Strict exception-date token pattern.
const EXDATE_FORMAT: &str = "%Y%m%dT%H%M%S";

/// A request to suppress or replace one occurrence's timing.
#[derive(Debug, Clone)]
pub struct Override {
    /// The occurrence's original start, used purely for matching.
    pub id: Instant,
    /// Replacement start; absent for a suppression.
    pub start: Option<Instant>,
    /// Replacement end; absent for a suppression.
    pub end: Option<Instant>,
}

impl Override {
    /// ## Summary
    /// Builds a suppression override from an exception-date token, parsed
    /// with the strict `YYYYMMDDTHHMMSS` pattern in `tz`.
    ///
    /// ## Errors
    /// Returns `CoreError::MalformedTimeToken` if the token does not match
    /// the pattern.
    pub fn from_exdate_token(token: &str, tz: Tz) -> RecurResult<Self> {
        let naive = NaiveDateTime::parse_from_str(token, EXDATE_FORMAT)
            .map_err(|_| CoreError::MalformedTimeToken(token.to_string()))?;
        Ok(Self {
            id: resolve_local(tz, naive, token)?,
            start: None,
            end: None,
        })
    }

    /// Builds a replacement override from a recurrence payload. Payload
    /// instants are already normalized upstream and are taken as-is.
    #[must_use]
    pub fn from_payload(payload: &RecurrencePayload) -> Self {
        Self {
            id: payload.recurrence_id,
            start: Some(payload.time.start),
            end: Some(payload.time.end),
        }
    }

    /// Replacement interval, present only when both start and end are.
    #[must_use]
    pub fn interval(&self) -> Option<TimeDelta> {
        self.start.zip(self.end).map(|(start, end)| end - start)
    }
}

/// Computed override parameters, keyed by occurrence index downstream.
///
/// `duration_seconds` carries the raw elapsed seconds of the replacement
/// interval; instance durations elsewhere are rounded minutes. The mix is
/// deliberate and confined to persisted override records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideParams {
    pub rrule_index: usize,
    pub value: Option<i64>,
    pub end_value: Option<i64>,
    pub duration_seconds: Option<i64>,
}

/// ## Summary
/// Matches overrides against expanded occurrences by exact start-instant
/// equality, producing override parameters keyed by occurrence index.
///
/// An override matching no occurrence is silently dropped. When two
/// overrides resolve to the same index, the later one in `overrides` wins;
/// the orchestrator lists exception-derived overrides before payload-derived
/// ones, so payload replacements take precedence on collision.
#[must_use]
pub fn match_overrides(
    overrides: &[Override],
    occurrences: &[Occurrence],
) -> BTreeMap<usize, OverrideParams> {
    let mut params = BTreeMap::new();

    for override_ in overrides {
        let Some(occurrence) = occurrences
            .iter()
            .find(|occurrence| occurrence.start.timestamp() == override_.id.timestamp())
        else {
            tracing::trace!(id = %override_.id, "Override matches no occurrence, dropping");
            continue;
        };

        params.insert(
            occurrence.index,
            OverrideParams {
                rrule_index: occurrence.index,
                value: override_.start.map(|dt| dt.timestamp()),
                end_value: override_.end.map(|dt| dt.timestamp()),
                duration_seconds: override_.interval().map(|d| d.num_seconds()),
            },
        );
    }

    params
}
