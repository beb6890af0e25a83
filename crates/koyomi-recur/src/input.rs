//! Raw calendar record consumed by the transformation.
//!
//! Produced by the outer ingestion pipeline; start/end arrive as raw tokens
//! while override payload instants are already normalized upstream.

use koyomi_core::types::Instant;

/// One raw calendar record.
#[derive(Debug, Clone, Default)]
pub struct RawEvent {
    /// Start token, either `YYYYMMDD` or a full local datetime.
    pub start: String,
    /// End token, same forms as `start`.
    pub end: String,
    /// RFC 5545 recurrence rule text, if the event recurs.
    pub rrule: Option<String>,
    /// Exception date tokens (`YYYYMMDDTHHMMSS`), each suppressing one occurrence.
    pub exdate: Vec<String>,
    /// Per-occurrence replacement payloads.
    pub recurrences: Vec<RecurrencePayload>,
}

/// A raw per-occurrence override payload.
#[derive(Debug, Clone)]
pub struct RecurrencePayload {
    /// Original start of the occurrence being overridden, used for matching.
    pub recurrence_id: Instant,
    /// Replacement timing.
    pub time: PayloadTime,
}

/// Replacement timing carried by a [`RecurrencePayload`].
#[derive(Debug, Clone)]
pub struct PayloadTime {
    pub start: Instant,
    pub end: Instant,
}
