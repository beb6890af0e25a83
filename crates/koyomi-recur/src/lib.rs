//! Koyomi recurring-event normalization.
//!
//! Takes a single raw calendar record (start/end tokens, optional recurrence
//! rule, exception dates, and per-occurrence override payloads) and produces
//! a timestamp-ordered list of concrete event instances plus a reconciled set
//! of persisted override records. Re-running the transformation against a
//! previously produced result updates only what changed and never duplicates
//! or orphans override state.
//!
//! Recurrence expansion is consumed as a capability ([`expand::OccurrenceExpander`],
//! implemented over the `rrule` crate) and persistence as a repository trait
//! ([`repo::RecurrenceRepository`]); the transformation itself is synchronous
//! and holds no live handles into either collaborator.

pub mod error;
pub mod expand;
pub mod input;
pub mod materialize;
pub mod overrides;
pub mod reconcile;
pub mod repo;
pub mod rule;
pub mod time;
pub mod transform;

pub use error::{RecurError, RecurResult};
pub use transform::Transformer;
