//! End-to-end transformation scenarios against the in-memory repository and
//! the rrule-backed expander.

use chrono::{TimeZone, Utc};
use chrono_tz::Tz;
use koyomi_core::config::{LoggingConfig, Settings, TransformConfig, WindowConfig};
use koyomi_core::types::{RuleId, TargetKey};
use koyomi_recur::Transformer;
use koyomi_recur::expand::RRuleExpander;
use koyomi_recur::input::{PayloadTime, RawEvent, RecurrencePayload};
use koyomi_recur::repo::{MemoryRepository, RecurrenceRepository, RepoStats};

const TZ: Tz = Tz::America__New_York;

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

/// Daily event at 10:00 for one hour, starting 2026-01-05.
fn daily_event(count: u32) -> RawEvent {
    RawEvent {
        start: "20260105T100000".to_string(),
        end: "20260105T110000".to_string(),
        rrule: Some(format!("FREQ=DAILY;COUNT={count}")),
        ..RawEvent::default()
    }
}

fn replacement_payload(day: u32, hour: u32, minutes: i64) -> RecurrencePayload {
    RecurrencePayload {
        recurrence_id: TZ.with_ymd_and_hms(2026, 1, day, 10, 0, 0).unwrap(),
        time: PayloadTime {
            start: TZ.with_ymd_and_hms(2026, 1, day, hour, 0, 0).unwrap(),
            end: TZ.with_ymd_and_hms(2026, 1, day, hour, 0, 0).unwrap()
                + chrono::TimeDelta::minutes(minutes),
        },
    }
}

fn override_op_counts(stats: RepoStats) -> (usize, usize, usize) {
    (
        stats.overrides_created,
        stats.overrides_updated,
        stats.overrides_deleted,
    )
}

#[test_log::test]
fn idempotence_second_run_changes_nothing() {
    let mut repo = MemoryRepository::new();
    let expander = RRuleExpander;

    let mut event = daily_event(5);
    event.exdate = vec!["20260106T100000".to_string()];
    event.recurrences = vec![replacement_payload(8, 14, 90)];

    let first = Transformer::new(&config(None), &mut repo, &expander)
        .transform(&event)
        .expect("first run succeeds");
    let rule = first[0].rrule.expect("rule identity");
    let ops_after_first = override_op_counts(repo.stats);

    let second = Transformer::new(&config(Some(rule)), &mut repo, &expander)
        .transform(&event)
        .expect("second run succeeds");

    assert_eq!(first, second);
    // No net override operations on the second run.
    assert_eq!(override_op_counts(repo.stats), ops_after_first);
    assert_eq!(repo.rule_count(), 1);
}

#[test_log::test]
fn rule_identity_is_reused_across_runs() {
    let mut repo = MemoryRepository::new();
    let expander = RRuleExpander;

    let first = Transformer::new(&config(None), &mut repo, &expander)
        .transform(&daily_event(3))
        .expect("first run succeeds");
    let rule = first[0].rrule.expect("rule identity");

    // Changed rule text, same target: the persisted identity must survive.
    let second = Transformer::new(&config(Some(rule)), &mut repo, &expander)
        .transform(&daily_event(6))
        .expect("second run succeeds");

    assert_eq!(second[0].rrule, Some(rule));
    assert_eq!(second.len(), 6);
    assert_eq!(repo.rule_count(), 1);
}

#[test_log::test]
fn exdate_suppresses_matching_occurrence() {
    let mut repo = MemoryRepository::new();
    let expander = RRuleExpander;

    let mut event = daily_event(4);
    event.exdate = vec!["20260106T100000".to_string()];

    let instances = Transformer::new(&config(None), &mut repo, &expander)
        .transform(&event)
        .expect("transform succeeds");

    // Jan 6 (index 1) is suppressed; the remaining instances keep their
    // original ordinals.
    let indices: Vec<_> = instances.iter().filter_map(|i| i.rrule_index).collect();
    assert_eq!(indices, vec![0, 2, 3]);
    assert_eq!(repo.override_count(), 1);
}

#[test_log::test]
fn exdate_off_by_one_second_matches_nothing() {
    let mut repo = MemoryRepository::new();
    let expander = RRuleExpander;

    let mut event = daily_event(4);
    event.exdate = vec!["20260106T100001".to_string()];

    let instances = Transformer::new(&config(None), &mut repo, &expander)
        .transform(&event)
        .expect("transform succeeds");

    assert_eq!(instances.len(), 4);
    assert_eq!(repo.override_count(), 0);
}

#[test_log::test]
fn payload_replaces_occurrence_timing() {
    let mut repo = MemoryRepository::new();
    let expander = RRuleExpander;

    let mut event = daily_event(3);
    event.recurrences = vec![replacement_payload(6, 15, 90)];

    let instances = Transformer::new(&config(None), &mut repo, &expander)
        .transform(&event)
        .expect("transform succeeds");

    assert_eq!(instances.len(), 3);
    let replaced = &instances[1];
    assert_eq!(replaced.rrule_index, Some(1));
    assert_eq!(
        replaced.value,
        TZ.with_ymd_and_hms(2026, 1, 6, 15, 0, 0).unwrap().timestamp()
    );
    assert_eq!(replaced.duration, 90);
}

#[test_log::test]
fn payload_wins_over_exdate_on_same_occurrence() {
    let mut repo = MemoryRepository::new();
    let expander = RRuleExpander;

    let mut event = daily_event(3);
    event.exdate = vec!["20260106T100000".to_string()];
    event.recurrences = vec![replacement_payload(6, 16, 30)];

    let instances = Transformer::new(&config(None), &mut repo, &expander)
        .transform(&event)
        .expect("transform succeeds");

    // The occurrence is replaced, not suppressed.
    assert_eq!(instances.len(), 3);
    let replaced = &instances[1];
    assert_eq!(
        replaced.value,
        TZ.with_ymd_and_hms(2026, 1, 6, 16, 0, 0).unwrap().timestamp()
    );
    assert_eq!(replaced.duration, 30);
}

#[test_log::test]
fn narrower_exception_list_retracts_overrides() {
    let mut repo = MemoryRepository::new();
    let expander = RRuleExpander;

    let mut event = daily_event(5);
    event.exdate = vec![
        "20260105T100000".to_string(),
        "20260106T100000".to_string(),
        "20260107T100000".to_string(),
    ];

    let first = Transformer::new(&config(None), &mut repo, &expander)
        .transform(&event)
        .expect("first run succeeds");
    let rule = first[0].rrule.expect("rule identity");
    assert_eq!(repo.override_count(), 3);

    event.exdate = vec!["20260106T100000".to_string()];
    let second = Transformer::new(&config(Some(rule)), &mut repo, &expander)
        .transform(&event)
        .expect("second run succeeds");

    assert_eq!(repo.override_count(), 1);
    let indices: Vec<_> = second.iter().filter_map(|i| i.rrule_index).collect();
    assert_eq!(indices, vec![0, 2, 3, 4]);
}

#[test_log::test]
fn non_recurring_input_tears_down_stale_rule() {
    let mut repo = MemoryRepository::new();
    let expander = RRuleExpander;

    let mut event = daily_event(4);
    event.exdate = vec!["20260106T100000".to_string()];

    let first = Transformer::new(&config(None), &mut repo, &expander)
        .transform(&event)
        .expect("first run succeeds");
    let rule = first[0].rrule.expect("rule identity");
    assert_eq!(repo.override_count(), 1);

    let single = RawEvent {
        start: "20260105T100000".to_string(),
        end: "20260105T110000".to_string(),
        ..RawEvent::default()
    };
    let second = Transformer::new(&config(Some(rule)), &mut repo, &expander)
        .transform(&single)
        .expect("second run succeeds");

    assert_eq!(second.len(), 1);
    assert_eq!(second[0].rrule, None);
    assert_eq!(second[0].rrule_index, None);
    assert_eq!(repo.rule_count(), 0);
    // Rule deletion cascades to its overrides.
    assert_eq!(repo.override_count(), 0);
    assert!(repo.load_rule(rule).expect("no error").is_none());
}

#[test_log::test]
fn unresolvable_existing_identity_is_fresh_state() {
    let mut repo = MemoryRepository::new();
    let expander = RRuleExpander;

    // Identity from a state that was since wiped: proceed as if creating fresh.
    let instances = Transformer::new(&config(Some(RuleId::new())), &mut repo, &expander)
        .transform(&daily_event(2))
        .expect("transform succeeds");

    assert_eq!(instances.len(), 2);
    assert_eq!(repo.rule_count(), 1);
}

#[test_log::test]
fn override_outside_window_is_dropped() {
    let mut repo = MemoryRepository::new();
    let expander = RRuleExpander;

    let mut event = daily_event(3);
    // Timestamp the rule never produces.
    event.recurrences = vec![replacement_payload(25, 9, 60)];

    let instances = Transformer::new(&config(None), &mut repo, &expander)
        .transform(&event)
        .expect("transform succeeds");

    assert_eq!(instances.len(), 3);
    assert_eq!(repo.override_count(), 0);
}
