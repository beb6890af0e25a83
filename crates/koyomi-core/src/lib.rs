//! Koyomi recurring-event normalization - shared core types.
//!
//! Error taxonomy, configuration loading, and identity types used by the
//! transformation layer.

pub mod config;
pub mod error;
pub mod types;
