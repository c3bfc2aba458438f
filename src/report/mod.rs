//! Scouting report rendering and tabular exports
//!
//! Reads the derived tables as read-only snapshots and renders per-team
//! text scouting reports, a cross-team comparison, and CSV/JSON exports of
//! the result sets. All rounding happens here, at render time.

use crate::data::Database;
use crate::{Config, HitType, Player, Rally, Result, Side, TeamAggregates};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

fn team_name(config: &Config, side: Side) -> &str {
    match side {
        Side::A => &config.report.team_a_name,
        Side::B => &config.report.team_b_name,
    }
}

/// Two-decimal rendering with an explicit marker for undefined ratios
fn fmt_ratio(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "n/a".to_string(),
    }
}

/// Full-precision cell for exports; undefined stays empty
fn cell_f64(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn cell_i64(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn cell_str(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

/// Write one side's scouting report and return its path
pub fn write_scouting_report(db: &Database, config: &Config, side: Side) -> Result<PathBuf> {
    let players: Vec<Player> = db
        .get_players()?
        .into_iter()
        .filter(|p| p.team == side)
        .collect();
    let agg = db.get_team_aggregates(side)?.unwrap_or_default();

    let dir = Path::new(&config.report.output_dir);
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("scouting_report_team_{}.txt", side));
    let mut out = File::create(&path)?;

    writeln!(out, "Scouting Report - {}", team_name(config, side))?;
    writeln!(out, "{}", "=".repeat(50))?;
    writeln!(out)?;
    writeln!(
        out,
        "Generated: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M")
    )?;
    writeln!(out)?;
    writeln!(out, "Number of players: {}", players.len())?;
    writeln!(out)?;

    writeln!(out, "Team Summary Statistics:")?;
    writeln!(out, "  Total Hits: {}", agg.attack.total_hits)?;
    writeln!(out, "  Total Kills: {}", agg.attack.total_kills)?;
    writeln!(out, "  Total Hit Errors: {}", agg.attack.total_hit_errors)?;
    writeln!(
        out,
        "  Hitting Efficiency: {}",
        fmt_ratio(agg.attack.hitting_efficiency)
    )?;
    writeln!(
        out,
        "  Average Player Efficiency: {}",
        fmt_ratio(mean_efficiency(&players))
    )?;
    writeln!(out, "  Total Service Aces: {}", agg.total_service_aces)?;
    writeln!(out, "  Total Service Errors: {}", agg.total_service_errors)?;
    writeln!(
        out,
        "  Service Ace/Error Ratio: {}",
        fmt_ratio(agg.service_ace_ratio)
    )?;
    writeln!(out)?;

    writeln!(out, "Team Hit Type Breakdown:")?;
    for ht in HitType::ALL {
        writeln!(out, "  {}: {}", ht, fmt_ratio(agg.attack.pct_of(ht)))?;
    }
    writeln!(out)?;

    writeln!(out, "Player Details:")?;
    for player in &players {
        writeln!(out, "Player {}:", player.jersey_number)?;
        writeln!(out, "  Total Hits: {}", player.attack.total_hits)?;
        writeln!(out, "  Total Kills: {}", player.attack.total_kills)?;
        writeln!(out, "  Total Hit Errors: {}", player.attack.total_hit_errors)?;
        writeln!(
            out,
            "  Hitting Efficiency: {}",
            fmt_ratio(player.attack.hitting_efficiency)
        )?;
        writeln!(out)?;
    }

    Ok(path)
}

fn mean_efficiency(players: &[Player]) -> Option<f64> {
    let defined: Vec<f64> = players
        .iter()
        .filter_map(|p| p.attack.hitting_efficiency)
        .collect();
    if defined.is_empty() {
        None
    } else {
        Some(defined.iter().sum::<f64>() / defined.len() as f64)
    }
}

/// Side-by-side hitting efficiency comparison of the two teams
pub fn write_comparison(db: &Database, config: &Config) -> Result<PathBuf> {
    let dir = Path::new(&config.report.output_dir);
    std::fs::create_dir_all(dir)?;
    let path = dir.join("hitting_efficiency_comparison.txt");
    let mut out = File::create(&path)?;

    writeln!(
        out,
        "Hitting Efficiency Comparison: {} vs {}",
        config.report.team_a_name, config.report.team_b_name
    )?;
    writeln!(out, "{}", "=".repeat(50))?;

    let players = db.get_players()?;
    for side in Side::BOTH {
        let agg = db.get_team_aggregates(side)?.unwrap_or_default();
        writeln!(out)?;
        writeln!(
            out,
            "{}: {}",
            team_name(config, side),
            fmt_ratio(agg.attack.hitting_efficiency)
        )?;
        for player in players.iter().filter(|p| p.team == side) {
            writeln!(
                out,
                "  Player {}: {}",
                player.jersey_number,
                fmt_ratio(player.attack.hitting_efficiency)
            )?;
        }
    }

    Ok(path)
}

/// Write all four result sets as CSV files into the given directory
pub fn export_tables(db: &Database, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let path = dir.join("players.csv");
    export_players_csv(db, &path)?;
    written.push(path);

    for side in Side::BOTH {
        let path = dir.join(format!("team_{}.csv", side.as_str()));
        export_team_csv(db, side, &path)?;
        written.push(path);
    }

    let path = dir.join("rallies.csv");
    export_rallies_csv(db, &path)?;
    written.push(path);

    Ok(written)
}

fn pct_header() -> String {
    HitType::ALL
        .iter()
        .map(|ht| ht.pct_column())
        .collect::<Vec<_>>()
        .join(",")
}

fn pct_cells(stats: &crate::AttackStats) -> String {
    HitType::ALL
        .iter()
        .map(|ht| cell_f64(stats.pct_of(*ht)))
        .collect::<Vec<_>>()
        .join(",")
}

fn export_players_csv(db: &Database, path: &Path) -> Result<()> {
    let mut out = File::create(path)?;
    writeln!(
        out,
        "jersey_number,team,total_kills,total_hit_errors,total_hits,hitting_efficiency,{}",
        pct_header()
    )?;
    for player in db.get_players()? {
        writeln!(
            out,
            "{},{},{},{},{},{},{}",
            player.jersey_number,
            player.team.as_str(),
            player.attack.total_kills,
            player.attack.total_hit_errors,
            player.attack.total_hits,
            cell_f64(player.attack.hitting_efficiency),
            pct_cells(&player.attack),
        )?;
    }
    Ok(())
}

fn export_team_csv(db: &Database, side: Side, path: &Path) -> Result<()> {
    let records = db.get_team_records(side)?;
    let agg = db.get_team_aggregates(side)?.unwrap_or_default();

    let mut out = File::create(path)?;
    writeln!(
        out,
        "rally_id,receiver,digger,hitter,total_kills,total_hit_errors,total_hits,\
hitting_efficiency,total_service_aces,total_service_errors,service_ace_ratio,{}",
        pct_header()
    )?;
    for record in records {
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{},{}",
            record.rally_id,
            cell_i64(record.receiver),
            cell_i64(record.digger),
            cell_i64(record.hitter),
            agg.attack.total_kills,
            agg.attack.total_hit_errors,
            agg.attack.total_hits,
            cell_f64(agg.attack.hitting_efficiency),
            agg.total_service_aces,
            agg.total_service_errors,
            cell_f64(agg.service_ace_ratio),
            pct_cells(&agg.attack),
        )?;
    }
    Ok(())
}

fn export_rallies_csv(db: &Database, path: &Path) -> Result<()> {
    let mut out = File::create(path)?;
    writeln!(
        out,
        "rally_id,round,team,receive_location,digger_location,pass_land_location,\
hitter_location,hit_land_location,pass_rating,set_type,set_location,hit_type,num_blockers,\
block_touch,serve_type,win_reason,lose_reason,winning_team"
    )?;
    for rally in db.get_rallies()? {
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            rally.rally_id,
            cell_i64(rally.round),
            cell_str(rally.team.map(|s| s.as_str())),
            cell_i64(rally.receive_location),
            cell_i64(rally.digger_location),
            cell_i64(rally.pass_land_location),
            cell_i64(rally.hitter_location),
            cell_i64(rally.hit_land_location),
            cell_str(rally.pass_rating.as_deref()),
            cell_str(rally.set_type.as_deref()),
            cell_str(rally.set_location.as_deref()),
            cell_str(rally.hit_type.map(|h| h.as_str())),
            cell_i64(rally.num_blockers),
            cell_str(rally.block_touch.as_deref()),
            cell_str(rally.serve_type.as_deref()),
            cell_str(rally.win_reason.map(|r| r.as_str())),
            cell_str(rally.lose_reason.map(|r| r.as_str())),
            cell_str(rally.winning_team.map(|s| s.as_str())),
        )?;
    }
    Ok(())
}

/// Write the result sets as one JSON document
pub fn export_json(db: &Database, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join("tables.json");

    let players: Vec<serde_json::Value> = db
        .get_players()?
        .iter()
        .map(|p| {
            let mut obj = serde_json::json!({
                "jersey_number": p.jersey_number,
                "team": p.team.as_str(),
                "total_kills": p.attack.total_kills,
                "total_hit_errors": p.attack.total_hit_errors,
                "total_hits": p.attack.total_hits,
                "hitting_efficiency": p.attack.hitting_efficiency,
            });
            for ht in HitType::ALL {
                obj[ht.pct_column()] = serde_json::json!(p.attack.pct_of(ht));
            }
            obj
        })
        .collect();

    let teams: Vec<serde_json::Value> = Side::BOTH
        .iter()
        .map(|side| -> Result<serde_json::Value> {
            let agg = db.get_team_aggregates(*side)?.unwrap_or_default();
            Ok(team_json(*side, &agg))
        })
        .collect::<Result<Vec<_>>>()?;

    let rallies: Vec<serde_json::Value> = db
        .get_rallies()?
        .iter()
        .map(rally_json)
        .collect();

    let doc = serde_json::json!({
        "players": players,
        "teams": teams,
        "rallies": rallies,
    });

    let mut out = File::create(&path)?;
    writeln!(out, "{}", serde_json::to_string_pretty(&doc).unwrap_or_default())?;
    Ok(path)
}

fn team_json(side: Side, agg: &TeamAggregates) -> serde_json::Value {
    let mut obj = serde_json::json!({
        "team": side.as_str(),
        "total_kills": agg.attack.total_kills,
        "total_hit_errors": agg.attack.total_hit_errors,
        "total_hits": agg.attack.total_hits,
        "hitting_efficiency": agg.attack.hitting_efficiency,
        "total_service_aces": agg.total_service_aces,
        "total_service_errors": agg.total_service_errors,
        "service_ace_ratio": agg.service_ace_ratio,
    });
    for ht in HitType::ALL {
        obj[ht.pct_column()] = serde_json::json!(agg.attack.pct_of(ht));
    }
    obj
}

fn rally_json(rally: &Rally) -> serde_json::Value {
    serde_json::json!({
        "rally_id": rally.rally_id,
        "round": rally.round,
        "team": rally.team.map(|s| s.as_str()),
        "receive_location": rally.receive_location,
        "digger_location": rally.digger_location,
        "pass_land_location": rally.pass_land_location,
        "hitter_location": rally.hitter_location,
        "hit_land_location": rally.hit_land_location,
        "pass_rating": rally.pass_rating,
        "set_type": rally.set_type,
        "set_location": rally.set_location,
        "hit_type": rally.hit_type.map(|h| h.as_str()),
        "num_blockers": rally.num_blockers,
        "block_touch": rally.block_touch,
        "serve_type": rally.serve_type,
        "win_reason": rally.win_reason.map(|r| r.as_str()),
        "lose_reason": rally.lose_reason.map(|r| r.as_str()),
        "winning_team": rally.winning_team.map(|s| s.as_str()),
    })
}
