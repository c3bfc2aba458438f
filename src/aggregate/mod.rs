//! Derivation and aggregation pipeline
//!
//! Sequential, single-writer batch steps over the raw event table. The
//! caller resets the derived tables first; every aggregate is a full
//! recomputation, so reruns on unchanged input reproduce identical tables.

pub mod player;
pub mod rally;
pub mod stats;
pub mod team;

use crate::data::Database;
use crate::{Result, Side};

/// Counts from one derive-and-aggregate pass
#[derive(Debug, Clone, Copy)]
pub struct PipelineSummary {
    pub rallies: usize,
    pub skipped_rows: usize,
    pub team_a_records: usize,
    pub team_b_records: usize,
    pub players: usize,
}

/// Full derivation pass over a cleaned raw table
pub fn run(db: &mut Database) -> Result<PipelineSummary> {
    let derivation = rally::derive_rallies(db)?;

    let mut team_records = [0usize; 2];
    for (i, side) in Side::BOTH.into_iter().enumerate() {
        team_records[i] = team::derive_team_records(db, side)?;
        team::compute_team_aggregates(db, side)?;
    }

    let players = player::derive_roster(db)?;
    player::compute_player_stats(db)?;

    Ok(PipelineSummary {
        rallies: derivation.rallies,
        skipped_rows: derivation.skipped,
        team_a_records: team_records[0],
        team_b_records: team_records[1],
        players,
    })
}
