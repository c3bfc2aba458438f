//! Categorical cleaning for the raw event table
//!
//! Two in-place passes over raw_events: a blank pre-pass turning
//! all-whitespace strings into NULL, then a per-column allow-list pass that
//! lowercases and trims each value and NULLs anything outside the column's
//! vocabulary. No rows are added or removed. Out-of-vocabulary values are
//! coerced silently at the row level, but the per-column counts are
//! surfaced in the returned [`CleanReport`] for data-quality auditing.

use crate::data::Database;
use crate::{HitType, RallyOutcome, Result, Side};
use std::collections::BTreeMap;

/// Text columns subject to the blank pre-pass
///
/// set_location carries free-form text and has no allow-list, but blank
/// values must still not survive as non-null.
pub const TEXT_COLUMNS: [&str; 10] = [
    "team",
    "pass_rating",
    "set_type",
    "set_location",
    "hit_type",
    "block_touch",
    "serve_type",
    "win_reason",
    "lose_reason",
    "winning_team",
];

/// Fixed vocabulary per categorical column
pub fn vocabularies() -> Vec<(&'static str, Vec<&'static str>)> {
    let sides: Vec<&str> = Side::BOTH.iter().map(|s| s.as_str()).collect();
    let hit_types: Vec<&str> = HitType::ALL.iter().map(|h| h.as_str()).collect();
    let outcomes: Vec<&str> = RallyOutcome::ALL.iter().map(|o| o.as_str()).collect();

    vec![
        ("team", sides.clone()),
        ("pass_rating", vec!["in", "out"]),
        ("set_type", vec!["opposite", "quick", "off_speed", "bic"]),
        ("serve_type", vec!["jump", "float"]),
        ("block_touch", vec!["yes", "no"]),
        ("hit_type", hit_types),
        ("win_reason", outcomes.clone()),
        ("lose_reason", outcomes),
        ("winning_team", sides),
    ]
}

/// Per-column counts of values removed by the cleaning passes
#[derive(Debug, Clone, Default)]
pub struct CleanReport {
    /// All-whitespace values turned into NULL, by column
    pub blanked: BTreeMap<&'static str, usize>,
    /// Out-of-vocabulary values turned into NULL, by column
    pub coerced: BTreeMap<&'static str, usize>,
}

impl CleanReport {
    pub fn total_blanked(&self) -> usize {
        self.blanked.values().sum()
    }

    pub fn total_coerced(&self) -> usize {
        self.coerced.values().sum()
    }

    /// True when no value had to be removed
    pub fn is_clean(&self) -> bool {
        self.total_blanked() == 0 && self.total_coerced() == 0
    }
}

/// Run both cleaning passes over raw_events, in place
///
/// Idempotent: a second run finds nothing left to blank or coerce.
pub fn normalize_raw_events(db: &Database) -> Result<CleanReport> {
    let mut report = CleanReport::default();

    for column in TEXT_COLUMNS {
        let changed = db.execute_update(&format!(
            "UPDATE raw_events SET {col} = NULL
             WHERE {col} IS NOT NULL AND TRIM({col}) = ''",
            col = column,
        ))?;
        if changed > 0 {
            log::warn!("{}: blanked {} whitespace-only value(s)", column, changed);
            report.blanked.insert(column, changed);
        }
    }

    for (column, vocabulary) in vocabularies() {
        let allowed = quoted_list(&vocabulary);

        let coerced = db.query_count(&format!(
            "SELECT COUNT(*) FROM raw_events
             WHERE {col} IS NOT NULL AND LOWER(TRIM({col})) NOT IN ({allowed})",
            col = column,
            allowed = allowed,
        ))?;

        db.execute_update(&format!(
            "UPDATE raw_events SET {col} = CASE
                WHEN LOWER(TRIM({col})) IN ({allowed}) THEN LOWER(TRIM({col}))
                ELSE NULL
             END
             WHERE {col} IS NOT NULL",
            col = column,
            allowed = allowed,
        ))?;

        if coerced > 0 {
            log::warn!(
                "{}: coerced {} out-of-vocabulary value(s) to NULL",
                column,
                coerced
            );
            report.coerced.insert(column, coerced);
        }
    }

    Ok(report)
}

fn quoted_list(tokens: &[&str]) -> String {
    tokens
        .iter()
        .map(|t| format!("'{}'", t))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RawEvent;

    fn event_with(
        team: &str,
        hit_type: Option<&str>,
        win_reason: Option<&str>,
        set_location: Option<&str>,
    ) -> RawEvent {
        RawEvent {
            rally: Some(1),
            team: Some(team.to_string()),
            hit_type: hit_type.map(str::to_string),
            win_reason: win_reason.map(str::to_string),
            set_location: set_location.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_case_and_whitespace_normalized() {
        let mut db = Database::in_memory().unwrap();
        db.insert_raw_events(&[event_with(" A ", Some("TIP"), Some(" Kill"), None)])
            .unwrap();

        let report = normalize_raw_events(&db).unwrap();
        assert!(report.is_clean());

        let events = db.get_raw_events().unwrap();
        assert_eq!(events[0].team.as_deref(), Some("a"));
        assert_eq!(events[0].hit_type.as_deref(), Some("tip"));
        assert_eq!(events[0].win_reason.as_deref(), Some("kill"));
    }

    #[test]
    fn test_out_of_vocabulary_coerced_and_counted() {
        let mut db = Database::in_memory().unwrap();
        db.insert_raw_events(&[
            event_with("a", Some("spike"), Some("forfeit"), None),
            event_with("c", Some("tip"), None, None),
        ])
        .unwrap();

        let report = normalize_raw_events(&db).unwrap();
        assert_eq!(report.coerced.get("hit_type"), Some(&1));
        assert_eq!(report.coerced.get("win_reason"), Some(&1));
        assert_eq!(report.coerced.get("team"), Some(&1));
        assert_eq!(report.total_coerced(), 3);

        let events = db.get_raw_events().unwrap();
        assert_eq!(events[0].hit_type, None);
        assert_eq!(events[0].win_reason, None);
        assert_eq!(events[1].team, None);
        assert_eq!(events[1].hit_type.as_deref(), Some("tip"));
    }

    #[test]
    fn test_blank_pre_pass_covers_unlisted_column() {
        let mut db = Database::in_memory().unwrap();
        db.insert_raw_events(&[
            event_with("a", None, None, Some("   ")),
            event_with("a", None, None, Some("left side")),
        ])
        .unwrap();

        let report = normalize_raw_events(&db).unwrap();
        assert_eq!(report.blanked.get("set_location"), Some(&1));

        let events = db.get_raw_events().unwrap();
        assert_eq!(events[0].set_location, None);
        // Free-form text survives: set_location has no allow-list
        assert_eq!(events[1].set_location.as_deref(), Some("left side"));
    }

    #[test]
    fn test_normalization_idempotent() {
        let mut db = Database::in_memory().unwrap();
        db.insert_raw_events(&[
            event_with(" B ", Some("Roll_Shot"), Some("junk"), Some(" ")),
            event_with("a", Some("hit"), Some("ace"), None),
        ])
        .unwrap();

        let first = normalize_raw_events(&db).unwrap();
        assert!(!first.is_clean());
        let after_first = db.get_raw_events().unwrap();

        let second = normalize_raw_events(&db).unwrap();
        assert!(second.is_clean());
        let after_second = db.get_raw_events().unwrap();

        for (a, b) in after_first.iter().zip(after_second.iter()) {
            assert_eq!(a.team, b.team);
            assert_eq!(a.hit_type, b.hit_type);
            assert_eq!(a.win_reason, b.win_reason);
            assert_eq!(a.set_location, b.set_location);
        }
    }

    #[test]
    fn test_vocabulary_closure() {
        let mut db = Database::in_memory().unwrap();
        db.insert_raw_events(&[
            event_with("A", Some("free_BALL"), Some("net "), None),
            event_with("whoknows", Some("9"), Some(""), None),
        ])
        .unwrap();

        normalize_raw_events(&db).unwrap();

        for event in db.get_raw_events().unwrap() {
            if let Some(team) = event.team.as_deref() {
                assert!(Side::from_token(team).is_some());
            }
            if let Some(ht) = event.hit_type.as_deref() {
                assert!(HitType::from_token(ht).is_some());
            }
            if let Some(reason) = event.win_reason.as_deref() {
                assert!(RallyOutcome::from_token(reason).is_some());
            }
        }
    }
}
