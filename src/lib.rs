//! Volleyball scouting statistics pipeline
//!
//! Ingests a per-action match event log into SQLite, cleans categorical
//! fields, derives rally/team/player tables, and computes aggregate
//! hitting and serving statistics for scouting reports.

pub mod aggregate;
pub mod data;
pub mod normalize;
pub mod report;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One of the two competing teams in a rally
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::A, Side::B];

    /// Lowercase token used in the event log and database
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::A => "a",
            Side::B => "b",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "a" => Some(Side::A),
            "b" => Some(Side::B),
            _ => None,
        }
    }

    pub fn opponent(&self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// Categorical classification of an attacking action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HitType {
    Tip,
    RollShot,
    FreeBall,
    OffSpeed,
    Hit,
    Overpass,
    Blocked,
}

impl HitType {
    pub const ALL: [HitType; 7] = [
        HitType::Tip,
        HitType::RollShot,
        HitType::FreeBall,
        HitType::OffSpeed,
        HitType::Hit,
        HitType::Overpass,
        HitType::Blocked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HitType::Tip => "tip",
            HitType::RollShot => "roll_shot",
            HitType::FreeBall => "free_ball",
            HitType::OffSpeed => "off_speed",
            HitType::Hit => "hit",
            HitType::Overpass => "overpass",
            HitType::Blocked => "blocked",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "tip" => Some(HitType::Tip),
            "roll_shot" => Some(HitType::RollShot),
            "free_ball" => Some(HitType::FreeBall),
            "off_speed" => Some(HitType::OffSpeed),
            "hit" => Some(HitType::Hit),
            "overpass" => Some(HitType::Overpass),
            "blocked" => Some(HitType::Blocked),
            _ => None,
        }
    }

    /// Stable position in [`HitType::ALL`], used for count arrays
    pub fn index(&self) -> usize {
        match self {
            HitType::Tip => 0,
            HitType::RollShot => 1,
            HitType::FreeBall => 2,
            HitType::OffSpeed => 3,
            HitType::Hit => 4,
            HitType::Overpass => 5,
            HitType::Blocked => 6,
        }
    }

    /// Column name carrying this type's share of total hits
    pub fn pct_column(&self) -> String {
        format!("pct_{}", self.as_str())
    }
}

impl fmt::Display for HitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a rally ended, shared by the win_reason and lose_reason columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RallyOutcome {
    Kill,
    HitError,
    ServeError,
    Tool,
    Ace,
    Net,
}

impl RallyOutcome {
    pub const ALL: [RallyOutcome; 6] = [
        RallyOutcome::Kill,
        RallyOutcome::HitError,
        RallyOutcome::ServeError,
        RallyOutcome::Tool,
        RallyOutcome::Ace,
        RallyOutcome::Net,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RallyOutcome::Kill => "kill",
            RallyOutcome::HitError => "hit_error",
            RallyOutcome::ServeError => "serve_error",
            RallyOutcome::Tool => "tool",
            RallyOutcome::Ace => "ace",
            RallyOutcome::Net => "net",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "kill" => Some(RallyOutcome::Kill),
            "hit_error" => Some(RallyOutcome::HitError),
            "serve_error" => Some(RallyOutcome::ServeError),
            "tool" => Some(RallyOutcome::Tool),
            "ace" => Some(RallyOutcome::Ace),
            "net" => Some(RallyOutcome::Net),
            _ => None,
        }
    }
}

impl fmt::Display for RallyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One logged action from the raw event file
///
/// Categorical fields stay raw strings here: values are stored verbatim at
/// load time and only coerced against their vocabularies by the cleaning
/// pass. Jersey and location columns are nullable integers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawEvent {
    pub rally: Option<i64>,
    pub round: Option<i64>,
    pub team: Option<String>,
    pub receive_location: Option<i64>,
    pub digger_location: Option<i64>,
    pub pass_land_location: Option<i64>,
    pub hitter_location: Option<i64>,
    pub hit_land_location: Option<i64>,
    pub pass_rating: Option<String>,
    pub set_type: Option<String>,
    pub set_location: Option<String>,
    pub hit_type: Option<String>,
    pub num_blockers: Option<i64>,
    pub block_touch: Option<String>,
    pub serve_type: Option<String>,
    pub win_reason: Option<String>,
    pub lose_reason: Option<String>,
    pub winning_team: Option<String>,
}

/// One rally, derived from the first raw row carrying its rally identifier
///
/// Outcome and hit-type fields are typed: by the time rallies are derived
/// the raw table has been cleaned, so every non-null categorical value
/// parses into its vocabulary enum.
#[derive(Debug, Clone)]
pub struct Rally {
    pub rally_id: i64,
    pub round: Option<i64>,
    pub team: Option<Side>,
    pub receive_location: Option<i64>,
    pub digger_location: Option<i64>,
    pub pass_land_location: Option<i64>,
    pub hitter_location: Option<i64>,
    pub hit_land_location: Option<i64>,
    pub pass_rating: Option<String>,
    pub set_type: Option<String>,
    pub set_location: Option<String>,
    pub hit_type: Option<HitType>,
    pub num_blockers: Option<i64>,
    pub block_touch: Option<String>,
    pub serve_type: Option<String>,
    pub win_reason: Option<RallyOutcome>,
    pub lose_reason: Option<RallyOutcome>,
    pub winning_team: Option<Side>,
}

/// Per-rally participation record for one side
#[derive(Debug, Clone)]
pub struct TeamSideRecord {
    pub rally_id: i64,
    pub receiver: Option<i64>,
    pub digger: Option<i64>,
    pub hitter: Option<i64>,
}

/// Attack statistics shared by the team and player tables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttackStats {
    pub total_kills: i64,
    pub total_hit_errors: i64,
    pub total_hits: i64,
    pub hitting_efficiency: Option<f64>,
    /// Share of total hits per hit type, indexed by [`HitType::index`]
    pub pct: [Option<f64>; 7],
}

impl AttackStats {
    pub fn pct_of(&self, hit_type: HitType) -> Option<f64> {
        self.pct[hit_type.index()]
    }
}

/// Team-level aggregate columns, recomputed by full overwrite
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamAggregates {
    pub attack: AttackStats,
    pub total_service_aces: i64,
    pub total_service_errors: i64,
    pub service_ace_ratio: Option<f64>,
}

/// One roster entry: a distinct (jersey_number, team) pair from the raw log
#[derive(Debug, Clone)]
pub struct Player {
    pub jersey_number: i64,
    pub team: Side,
    pub attack: AttackStats,
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum VolleyError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Input schema mismatch at column {index}: expected `{expected}`, found `{found}`")]
    SchemaMismatch {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("Input has {found} columns, expected {expected}")]
    ColumnCount { expected: usize, found: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, VolleyError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub database_path: String,
    pub input_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub output_dir: String,
    pub team_a_name: String,
    pub team_b_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data: DataConfig {
                database_path: "data/volley.db".to_string(),
                input_path: "dataset_full.csv".to_string(),
            },
            report: ReportConfig {
                output_dir: "reports".to_string(),
                team_a_name: "Team A".to_string(),
                team_b_name: "Team B".to_string(),
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            VolleyError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| VolleyError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| VolleyError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_tokens() {
        assert_eq!(Side::from_token(" A "), Some(Side::A));
        assert_eq!(Side::from_token("b"), Some(Side::B));
        assert_eq!(Side::from_token("c"), None);
        assert_eq!(Side::A.opponent(), Side::B);
        assert_eq!(Side::B.opponent(), Side::A);
    }

    #[test]
    fn test_hit_type_round_trip() {
        for (i, ht) in HitType::ALL.iter().enumerate() {
            assert_eq!(ht.index(), i);
            assert_eq!(HitType::from_token(ht.as_str()), Some(*ht));
        }
        assert_eq!(HitType::from_token("spike"), None);
    }

    #[test]
    fn test_outcome_round_trip() {
        for outcome in RallyOutcome::ALL {
            assert_eq!(RallyOutcome::from_token(outcome.as_str()), Some(outcome));
        }
        assert_eq!(RallyOutcome::from_token("timeout"), None);
    }

    #[test]
    fn test_config_round_trip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.data.database_path, config.data.database_path);
        assert_eq!(parsed.report.output_dir, config.report.output_dir);
    }
}
