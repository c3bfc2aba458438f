//! Team-side derivation and aggregate computation
//!
//! Each side gets one participation row per rally it acted in, then a full
//! recomputation of the team-level aggregate columns over all rallies.
//! Service statistics are keyed on the serving side through the outcome
//! vocabulary: only the server can score an ace, and only the server can
//! lose the rally on a serve error.

use crate::aggregate::stats::{AttackLine, ServeLine};
use crate::data::Database;
use crate::{Rally, RallyOutcome, Result, Side, TeamAggregates, TeamSideRecord};

/// Derive per-rally participation rows for one side
pub fn derive_team_records(db: &mut Database, side: Side) -> Result<usize> {
    let rallies = db.get_rallies()?;
    let records: Vec<TeamSideRecord> = rallies
        .iter()
        .filter(|rally| rally.team == Some(side))
        .map(|rally| TeamSideRecord {
            rally_id: rally.rally_id,
            receiver: rally.receive_location,
            digger: rally.digger_location,
            hitter: rally.hitter_location,
        })
        .collect();
    db.insert_team_records(side, &records)
}

/// Recompute one side's aggregates and overwrite them on every row
pub fn compute_team_aggregates(db: &Database, side: Side) -> Result<TeamAggregates> {
    let rallies = db.get_rallies()?;
    let agg = aggregates_from_rallies(&rallies, side);
    db.update_team_aggregates(side, &agg)?;
    Ok(agg)
}

/// Pure aggregation over a rally population for one side
pub fn aggregates_from_rallies(rallies: &[Rally], side: Side) -> TeamAggregates {
    let mut attack = AttackLine::new();
    for rally in rallies.iter().filter(|r| r.team == Some(side)) {
        attack.record(rally.win_reason, rally.hit_type);
    }

    let mut serve = ServeLine::default();
    for rally in rallies {
        let Some(winner) = rally.winning_team else {
            continue;
        };
        if winner == side && rally.win_reason == Some(RallyOutcome::Ace) {
            serve.record_ace();
        }
        if winner == side.opponent()
            && (rally.win_reason == Some(RallyOutcome::ServeError)
                || rally.lose_reason == Some(RallyOutcome::ServeError))
        {
            serve.record_error();
        }
    }

    TeamAggregates {
        attack: attack.stats(),
        total_service_aces: serve.aces,
        total_service_errors: serve.errors,
        service_ace_ratio: serve.ace_error_ratio(),
    }
}
