//! Rally derivation from the raw event log
//!
//! One rally per distinct rally identifier, keyed explicitly on the log's
//! natural id. The first raw row carrying an id (in insertion order)
//! defines the rally; later action rows for the same rally are folded away.
//! Rows without a rally id cannot be keyed and are skipped with a warning.

use crate::data::Database;
use crate::{HitType, Rally, RallyOutcome, RawEvent, Result, Side};
use std::collections::BTreeMap;

/// Counts from one rally derivation pass
#[derive(Debug, Clone, Copy)]
pub struct RallyDerivation {
    pub rallies: usize,
    pub skipped: usize,
}

/// Derive the rallies table from raw_events
pub fn derive_rallies(db: &mut Database) -> Result<RallyDerivation> {
    let events = db.get_raw_events()?;

    let mut skipped = 0usize;
    let mut first_rows: BTreeMap<i64, RawEvent> = BTreeMap::new();
    for event in events {
        match event.rally {
            Some(id) => {
                first_rows.entry(id).or_insert(event);
            }
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        log::warn!("skipped {} raw row(s) without a rally id", skipped);
    }

    let rallies: Vec<Rally> = first_rows
        .into_iter()
        .map(|(id, event)| rally_from_event(id, event))
        .collect();

    let inserted = db.insert_rallies(&rallies)?;
    Ok(RallyDerivation {
        rallies: inserted,
        skipped,
    })
}

fn rally_from_event(rally_id: i64, event: RawEvent) -> Rally {
    Rally {
        rally_id,
        round: event.round,
        team: event.team.as_deref().and_then(Side::from_token),
        receive_location: event.receive_location,
        digger_location: event.digger_location,
        pass_land_location: event.pass_land_location,
        hitter_location: event.hitter_location,
        hit_land_location: event.hit_land_location,
        pass_rating: event.pass_rating,
        set_type: event.set_type,
        set_location: event.set_location,
        hit_type: event.hit_type.as_deref().and_then(HitType::from_token),
        num_blockers: event.num_blockers,
        block_touch: event.block_touch,
        serve_type: event.serve_type,
        win_reason: event.win_reason.as_deref().and_then(RallyOutcome::from_token),
        lose_reason: event.lose_reason.as_deref().and_then(RallyOutcome::from_token),
        winning_team: event.winning_team.as_deref().and_then(Side::from_token),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(rally: Option<i64>, team: &str, hit_type: Option<&str>) -> RawEvent {
        RawEvent {
            rally,
            team: Some(team.to_string()),
            hit_type: hit_type.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_one_rally_per_identifier() {
        let mut db = Database::in_memory().unwrap();
        db.insert_raw_events(&[
            event(Some(1), "a", Some("tip")),
            event(Some(1), "a", Some("hit")),
            event(Some(2), "b", None),
            event(Some(1), "a", Some("blocked")),
        ])
        .unwrap();

        let derivation = derive_rallies(&mut db).unwrap();
        assert_eq!(derivation.rallies, 2);
        assert_eq!(derivation.skipped, 0);

        let rallies = db.get_rallies().unwrap();
        assert_eq!(rallies.len(), 2);
        // The first row for rally 1 wins
        assert_eq!(rallies[0].rally_id, 1);
        assert_eq!(rallies[0].hit_type, Some(HitType::Tip));
        assert_eq!(rallies[1].rally_id, 2);
        assert_eq!(rallies[1].team, Some(Side::B));
    }

    #[test]
    fn test_rows_without_rally_id_skipped() {
        let mut db = Database::in_memory().unwrap();
        db.insert_raw_events(&[
            event(None, "a", Some("tip")),
            event(Some(3), "a", None),
            event(None, "b", None),
        ])
        .unwrap();

        let derivation = derive_rallies(&mut db).unwrap();
        assert_eq!(derivation.rallies, 1);
        assert_eq!(derivation.skipped, 2);
    }

    #[test]
    fn test_typed_fields_parsed() {
        let mut db = Database::in_memory().unwrap();
        let mut e = event(Some(5), "a", Some("roll_shot"));
        e.win_reason = Some("kill".to_string());
        e.winning_team = Some("a".to_string());
        e.round = Some(2);
        db.insert_raw_events(&[e]).unwrap();

        derive_rallies(&mut db).unwrap();
        let rallies = db.get_rallies().unwrap();
        assert_eq!(rallies[0].round, Some(2));
        assert_eq!(rallies[0].hit_type, Some(HitType::RollShot));
        assert_eq!(rallies[0].win_reason, Some(RallyOutcome::Kill));
        assert_eq!(rallies[0].winning_team, Some(Side::A));
    }
}
