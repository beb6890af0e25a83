//! Raw time-token normalization.
//!
//! Converts the date-or-datetime tokens carried by a raw calendar record into
//! timezone-aware instants and detects the all-day encoding.

use chrono::{LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use koyomi_core::error::CoreError;
use koyomi_core::types::Instant;

use crate::error::RecurResult;

/// One minute before the next midnight.
const END_OF_DAY: NaiveTime = NaiveTime::from_hms_opt(23, 59, 0).unwrap();

/// Normalizes raw date-or-datetime tokens into instants in a fixed timezone.
#[derive(Debug, Clone, Copy)]
pub struct TimeNormalizer {
    tz: Tz,
}

impl TimeNormalizer {
    #[must_use]
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// ## Summary
    /// Parses a start token.
    ///
    /// An 8-character `YYYYMMDD` token is interpreted as midnight local time;
    /// anything else is parsed as a full local datetime (a trailing `Z`
    /// marks the token as UTC, which is then converted to the local zone).
    ///
    /// ## Errors
    /// Returns `CoreError::MalformedTimeToken` if the token matches neither
    /// form, or `CoreError::NonExistentTime` if the local time falls in a
    /// DST gap.
    pub fn parse_start(&self, token: &str) -> RecurResult<Instant> {
        let (instant, _) = self.parse_token(token)?;
        Ok(instant)
    }

    /// ## Summary
    /// Parses an end token.
    ///
    /// Same forms as [`Self::parse_start`], except a date-only token resolves
    /// to one minute before the following midnight, so an all-day span's
    /// stored end lands just before the next midnight.
    ///
    /// ## Errors
    /// Same as [`Self::parse_start`].
    pub fn parse_end(&self, token: &str) -> RecurResult<Instant> {
        let (instant, date_only) = self.parse_token(token)?;
        if date_only {
            // 23:59 on the token's date, built in wall-clock terms so DST
            // transition days keep the right local time.
            let end_of_day = instant.date_naive().and_time(END_OF_DAY);
            resolve_local(self.tz, end_of_day, token)
        } else {
            Ok(instant)
        }
    }

    /// Parses a token, reporting whether it was date-only.
    fn parse_token(&self, token: &str) -> RecurResult<(Instant, bool)> {
        if token.len() == 8 && token.bytes().all(|b| b.is_ascii_digit()) {
            let date = NaiveDate::parse_from_str(token, "%Y%m%d")
                .map_err(|_| CoreError::MalformedTimeToken(token.to_string()))?;
            let instant = self.resolve_local(date.and_time(NaiveTime::MIN), token)?;
            return Ok((instant, true));
        }

        if let Some(stripped) = token.strip_suffix('Z') {
            let naive = parse_naive(stripped, token)?;
            let utc = Utc.from_utc_datetime(&naive);
            return Ok((utc.with_timezone(&self.tz), false));
        }

        let naive = parse_naive(token, token)?;
        Ok((self.resolve_local(naive, token)?, false))
    }

    /// Resolves a naive local datetime in the configured timezone.
    fn resolve_local(&self, naive: NaiveDateTime, token: &str) -> RecurResult<Instant> {
        resolve_local(self.tz, naive, token)
    }
}

/// Resolves a naive local datetime in `tz`, handling DST edges.
pub(crate) fn resolve_local(tz: Tz, naive: NaiveDateTime, token: &str) -> RecurResult<Instant> {
    match tz.from_local_datetime(&naive) {
        // DST gap: time doesn't exist
        LocalResult::None => {
            Err(CoreError::NonExistentTime(format!("{naive} in timezone {tz} (token {token})")).into())
        }
        LocalResult::Single(dt) => Ok(dt),
        // DST fold: time occurs twice, use the first occurrence
        LocalResult::Ambiguous(dt1, _dt2) => Ok(dt1),
    }
}

fn parse_naive(s: &str, token: &str) -> RecurResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|_| CoreError::MalformedTimeToken(token.to_string()).into())
}

/// ## Summary
/// All-day detection: true iff both instants' time-of-day components are
/// exactly `00:00:00`.
#[must_use]
pub fn is_all_day(start: Instant, end: Instant) -> bool {
    start.time() == NaiveTime::MIN && end.time() == NaiveTime::MIN
}
