//! Roster derivation and per-player statistics
//!
//! The roster is the set-union of every (jersey, team) pair observed in a
//! receiver, digger, or hitter role anywhere in the raw log. Attack
//! statistics join on the hitter role directly against raw events. The raw
//! schema has no serving-player field, so per-player service statistics
//! are left NULL; serving numbers live on the team tables.

use crate::aggregate::stats::AttackLine;
use crate::data::Database;
use crate::{HitType, RallyOutcome, Result, Side};
use std::collections::{BTreeMap, BTreeSet};

/// Derive the distinct (jersey_number, team) roster
pub fn derive_roster(db: &mut Database) -> Result<usize> {
    let events = db.get_raw_events()?;

    let mut roster: BTreeSet<(i64, Side)> = BTreeSet::new();
    for event in &events {
        let Some(side) = event.team.as_deref().and_then(Side::from_token) else {
            continue;
        };
        let roles = [
            event.receive_location,
            event.digger_location,
            event.hitter_location,
        ];
        for jersey in roles.into_iter().flatten() {
            roster.insert((jersey, side));
        }
    }

    let roster: Vec<(i64, Side)> = roster.into_iter().collect();
    db.insert_players(&roster)?;
    Ok(roster.len())
}

/// Recompute attack statistics for every rostered player
pub fn compute_player_stats(db: &Database) -> Result<usize> {
    let mut lines: BTreeMap<(i64, Side), AttackLine> = BTreeMap::new();
    for player in db.get_players()? {
        lines.insert((player.jersey_number, player.team), AttackLine::new());
    }

    for event in db.get_raw_events()? {
        let Some(side) = event.team.as_deref().and_then(Side::from_token) else {
            continue;
        };
        let Some(hitter) = event.hitter_location else {
            continue;
        };
        if let Some(line) = lines.get_mut(&(hitter, side)) {
            line.record(
                event.win_reason.as_deref().and_then(RallyOutcome::from_token),
                event.hit_type.as_deref().and_then(HitType::from_token),
            );
        }
    }

    for ((jersey, side), line) in &lines {
        db.update_player_attack(*jersey, *side, &line.stats())?;
    }
    Ok(lines.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RawEvent;

    fn event(team: &str, receiver: Option<i64>, digger: Option<i64>, hitter: Option<i64>) -> RawEvent {
        RawEvent {
            rally: Some(1),
            team: Some(team.to_string()),
            receive_location: receiver,
            digger_location: digger,
            hitter_location: hitter,
            ..Default::default()
        }
    }

    #[test]
    fn test_roster_union_of_roles() {
        let mut db = Database::in_memory().unwrap();
        db.insert_raw_events(&[
            event("a", Some(4), None, Some(7)),
            event("a", Some(4), Some(9), None),
            event("b", None, None, Some(4)),
            // No side: cannot be attributed to a roster entry
            RawEvent {
                rally: Some(9),
                hitter_location: Some(11),
                ..Default::default()
            },
        ])
        .unwrap();

        let count = derive_roster(&mut db).unwrap();
        assert_eq!(count, 4);

        let players = db.get_players().unwrap();
        let pairs: Vec<(i64, Side)> = players.iter().map(|p| (p.jersey_number, p.team)).collect();
        assert_eq!(
            pairs,
            vec![(4, Side::A), (7, Side::A), (9, Side::A), (4, Side::B)]
        );
    }

    #[test]
    fn test_roster_rerun_does_not_duplicate() {
        let mut db = Database::in_memory().unwrap();
        db.insert_raw_events(&[event("a", Some(4), None, None)]).unwrap();

        derive_roster(&mut db).unwrap();
        derive_roster(&mut db).unwrap();
        assert_eq!(db.get_players().unwrap().len(), 1);
    }

    #[test]
    fn test_player_stats_scenario() {
        // Three rallies, player 4 hitting for side a: a kill, a hit error
        // without a hit type, and an untyped-outcome tip.
        let mut db = Database::in_memory().unwrap();
        let mut first = event("a", None, None, Some(4));
        first.hit_type = Some("hit".to_string());
        first.win_reason = Some("kill".to_string());
        let mut second = event("a", None, None, Some(4));
        second.rally = Some(2);
        second.win_reason = Some("hit_error".to_string());
        let mut third = event("a", None, None, Some(4));
        third.rally = Some(3);
        third.hit_type = Some("tip".to_string());
        db.insert_raw_events(&[first, second, third]).unwrap();

        derive_roster(&mut db).unwrap();
        assert_eq!(compute_player_stats(&db).unwrap(), 1);

        let players = db.get_players().unwrap();
        let p4 = &players[0];
        assert_eq!(p4.jersey_number, 4);
        assert_eq!(p4.attack.total_kills, 1);
        assert_eq!(p4.attack.total_hit_errors, 1);
        assert_eq!(p4.attack.total_hits, 2);
        assert_eq!(p4.attack.hitting_efficiency, Some(0.0));
        assert_eq!(p4.attack.pct_of(HitType::Tip), Some(0.5));
    }

    #[test]
    fn test_stats_keyed_on_hitter_and_side() {
        let mut db = Database::in_memory().unwrap();
        let mut a4 = event("a", None, None, Some(4));
        a4.hit_type = Some("hit".to_string());
        a4.win_reason = Some("kill".to_string());
        let mut b4 = event("b", None, None, Some(4));
        b4.rally = Some(2);
        b4.hit_type = Some("tip".to_string());
        // Receiving does not feed attack statistics
        let receive_only = event("a", Some(4), None, None);
        db.insert_raw_events(&[a4, b4, receive_only]).unwrap();

        derive_roster(&mut db).unwrap();
        compute_player_stats(&db).unwrap();

        let players = db.get_players().unwrap();
        let a = players
            .iter()
            .find(|p| p.team == Side::A && p.jersey_number == 4)
            .unwrap();
        let b = players
            .iter()
            .find(|p| p.team == Side::B && p.jersey_number == 4)
            .unwrap();
        assert_eq!(a.attack.total_kills, 1);
        assert_eq!(a.attack.total_hits, 1);
        assert_eq!(b.attack.total_kills, 0);
        assert_eq!(b.attack.total_hits, 1);
        assert_eq!(b.attack.pct_of(HitType::Tip), Some(1.0));
    }
}
