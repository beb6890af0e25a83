//! Transformation entry point.
//!
//! Sequences the full normalization: parse times, detect the all-day
//! encoding, then branch on the presence of a recurrence rule. The recurring
//! branch upserts the rule, expands occurrences, extracts and matches
//! overrides, reconciles persisted override state, and materializes the
//! windowed instance list. The non-recurring branch deletes any stale rule
//! and emits a single instance. No partial results are exposed; failures
//! propagate synchronously to the caller.

use chrono::TimeDelta;
use koyomi_core::config::TransformConfig;
use koyomi_core::types::{Instant, RuleId};

use crate::error::RecurResult;
use crate::expand::OccurrenceExpander;
use crate::input::RawEvent;
use crate::materialize::{EventInstance, materialize_recurring, materialize_single};
use crate::overrides::{Override, match_overrides};
use crate::reconcile::reconcile;
use crate::repo::RecurrenceRepository;
use crate::rule::RecurrenceRule;
use crate::time::{TimeNormalizer, is_all_day};

/// Orchestrates one transformation run for a single raw calendar record.
pub struct Transformer<'a, R, E> {
    config: &'a TransformConfig,
    repo: &'a mut R,
    expander: &'a E,
}

impl<'a, R: RecurrenceRepository, E: OccurrenceExpander> Transformer<'a, R, E> {
    #[must_use]
    pub fn new(config: &'a TransformConfig, repo: &'a mut R, expander: &'a E) -> Self {
        Self {
            config,
            repo,
            expander,
        }
    }

    /// ## Summary
    /// Runs the transformation and returns the ordered instance list.
    ///
    /// Re-running with identical input against previously produced state is
    /// a no-op on persisted rule/override records.
    ///
    /// ## Errors
    /// Returns an error if a time token is malformed, the rule text does not
    /// validate, or the repository fails. An `existing` identity that does
    /// not resolve is treated as no prior state, not an error.
    pub fn transform(&mut self, raw: &RawEvent) -> RecurResult<Vec<EventInstance>> {
        let normalizer = TimeNormalizer::new(self.config.timezone);
        let start = normalizer.parse_start(&raw.start)?;
        let mut end = normalizer.parse_end(&raw.end)?;

        // All-day end-of-day correction, applied once, after the end-token
        // correction inside parse_end.
        if is_all_day(start, end) {
            end -= TimeDelta::minutes(1);
        }

        let existing_rule = match self.config.existing {
            Some(id) => self.repo.load_rule(id)?,
            None => None,
        };

        if let Some(rrule_text) = raw.rrule.as_deref() {
            self.transform_recurring(raw, rrule_text, start, end, existing_rule)
        } else {
            if let Some(rule) = existing_rule {
                tracing::debug!(rule = %rule.id, "Input no longer recurs, deleting stale rule");
                self.repo.delete_rule(rule.id)?;
            }
            Ok(vec![materialize_single(start, end)])
        }
    }

    fn transform_recurring(
        &mut self,
        raw: &RawEvent,
        rrule_text: &str,
        start: Instant,
        end: Instant,
        existing_rule: Option<RecurrenceRule>,
    ) -> RecurResult<Vec<EventInstance>> {
        // Reuse the prior rule identity so dependent override records are
        // never orphaned.
        let id = existing_rule.map_or_else(RuleId::new, |rule| rule.id);
        let rule = RecurrenceRule::derive(id, rrule_text, self.config.target.clone(), start, end)?;
        self.repo.upsert_rule(&rule)?;
        tracing::debug!(rule = %id, freq = %rule.freq, "Upserted recurrence rule");

        let occurrences = self.expander.expand(
            rrule_text,
            start,
            end - start,
            self.config.after,
            self.config.before,
        )?;

        let overrides = self.extract_overrides(raw)?;
        let params = match_overrides(&overrides, &occurrences);

        let existing_overrides = self.repo.load_overrides(id)?;
        let plan = reconcile(id, params.values(), &existing_overrides);
        self.repo.apply_plan(&plan)?;

        let records = self.repo.load_overrides(id)?;
        Ok(materialize_recurring(&occurrences, &records, id))
    }

    /// Exception tokens first, then recurrence payloads: the matcher lets
    /// later entries win on index collision, so payload replacements take
    /// precedence over exception suppressions.
    fn extract_overrides(&self, raw: &RawEvent) -> RecurResult<Vec<Override>> {
        let mut overrides = Vec::with_capacity(raw.exdate.len() + raw.recurrences.len());
        for token in &raw.exdate {
            overrides.push(Override::from_exdate_token(token, self.config.timezone)?);
        }
        overrides.extend(raw.recurrences.iter().map(Override::from_payload));
        Ok(overrides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::RRuleExpander;
    use crate::repo::MemoryRepository;
    use chrono::{TimeZone, Utc};
    use koyomi_core::config::{LoggingConfig, Settings, WindowConfig};
    use koyomi_core::types::TargetKey;

    fn config(existing: Option<RuleId>) -> TransformConfig {
        let settings = Settings {
            timezone: "America/New_York".to_string(),
            window: WindowConfig {
                before_days: 365,
                after_days: 365,
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
            },
        };
        TransformConfig::from_settings(
            &settings,
            TargetKey::new("node", "event", "field_when"),
            Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap(),
            existing,
        )
        .expect("valid settings")
    }

    #[test]
    fn test_single_branch_emits_one_instance() {
        let config = config(None);
        let mut repo = MemoryRepository::new();
        let expander = RRuleExpander;

        let instances = Transformer::new(&config, &mut repo, &expander)
            .transform(&RawEvent {
                start: "20260105T100000".to_string(),
                end: "20260105T113000".to_string(),
                ..RawEvent::default()
            })
            .expect("transform succeeds");

        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].duration, 90);
        assert_eq!(instances[0].rrule, None);
        assert_eq!(repo.rule_count(), 0);
    }

    #[test]
    fn test_all_day_end_correction_is_applied_once() {
        let config = config(None);
        let mut repo = MemoryRepository::new();
        let expander = RRuleExpander;

        // Start at midnight, end as an explicit midnight datetime: all-day,
        // so the orchestrator pulls the end back one minute.
        let instances = Transformer::new(&config, &mut repo, &expander)
            .transform(&RawEvent {
                start: "20260105".to_string(),
                end: "20260106T000000".to_string(),
                ..RawEvent::default()
            })
            .expect("transform succeeds");

        let span_minutes = (instances[0].end_value - instances[0].value) / 60;
        assert_eq!(span_minutes, 24 * 60 - 1);
    }

    #[test]
    fn test_date_only_end_skips_all_day_correction() {
        let config = config(None);
        let mut repo = MemoryRepository::new();
        let expander = RRuleExpander;

        // A date-only end token is already pulled back to 23:59 by the
        // normalizer, so the all-day check sees a non-midnight end and the
        // orchestrator applies no further adjustment.
        let instances = Transformer::new(&config, &mut repo, &expander)
            .transform(&RawEvent {
                start: "20260105".to_string(),
                end: "20260105".to_string(),
                ..RawEvent::default()
            })
            .expect("transform succeeds");

        let span_minutes = (instances[0].end_value - instances[0].value) / 60;
        assert_eq!(span_minutes, 24 * 60 - 1);
    }

    #[test]
    fn test_recurring_branch_persists_rule_and_emits_indexed_instances() {
        let config = config(None);
        let mut repo = MemoryRepository::new();
        let expander = RRuleExpander;

        let instances = Transformer::new(&config, &mut repo, &expander)
            .transform(&RawEvent {
                start: "20260105T100000".to_string(),
                end: "20260105T110000".to_string(),
                rrule: Some("FREQ=DAILY;COUNT=4".to_string()),
                ..RawEvent::default()
            })
            .expect("transform succeeds");

        assert_eq!(instances.len(), 4);
        assert_eq!(repo.rule_count(), 1);
        let rule = instances[0].rrule.expect("rule identity");
        for (i, instance) in instances.iter().enumerate() {
            assert_eq!(instance.rrule, Some(rule));
            assert_eq!(instance.rrule_index, Some(i));
            assert_eq!(instance.duration, 60);
        }
    }

    #[test]
    fn test_malformed_start_token_aborts() {
        let config = config(None);
        let mut repo = MemoryRepository::new();
        let expander = RRuleExpander;

        let result = Transformer::new(&config, &mut repo, &expander).transform(&RawEvent {
            start: "yesterday".to_string(),
            end: "20260105T110000".to_string(),
            ..RawEvent::default()
        });
        assert!(result.is_err());
        assert_eq!(repo.rule_count(), 0);
    }
}
