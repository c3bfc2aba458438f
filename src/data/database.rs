//! SQLite storage for the volleyball event log and derived tables

use crate::{
    AttackStats, HitType, Player, Rally, RallyOutcome, RawEvent, Result, Side, TeamAggregates,
    TeamSideRecord,
};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(RAW_DDL)?;
        self.conn.execute_batch(&derived_ddl())?;
        Ok(())
    }

    fn team_table(side: Side) -> &'static str {
        match side {
            Side::A => "team_a",
            Side::B => "team_b",
        }
    }

    // ==================== Reset Discipline ====================

    /// Drop and recreate the raw event table (start of a fresh load)
    pub fn reset_raw(&self) -> Result<()> {
        self.conn.execute_batch("DROP TABLE IF EXISTS raw_events;")?;
        self.conn.execute_batch(RAW_DDL)?;
        Ok(())
    }

    /// Drop and recreate every derived table (start of a derive pass)
    pub fn reset_derived(&self) -> Result<()> {
        self.conn.execute_batch(
            "DROP TABLE IF EXISTS team_a;
             DROP TABLE IF EXISTS team_b;
             DROP TABLE IF EXISTS players;
             DROP TABLE IF EXISTS rallies;",
        )?;
        self.conn.execute_batch(&derived_ddl())?;
        Ok(())
    }

    // ==================== Raw Events ====================

    /// Bulk-insert raw events in one transaction (all-or-nothing)
    pub fn insert_raw_events(&mut self, events: &[RawEvent]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO raw_events (rally, round, team, receive_location, digger_location,
                    pass_land_location, hitter_location, hit_land_location, pass_rating,
                    set_type, set_location, hit_type, num_blockers, block_touch, serve_type,
                    win_reason, lose_reason, winning_team)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            )?;
            for event in events {
                stmt.execute(params![
                    event.rally,
                    event.round,
                    event.team,
                    event.receive_location,
                    event.digger_location,
                    event.pass_land_location,
                    event.hitter_location,
                    event.hit_land_location,
                    event.pass_rating,
                    event.set_type,
                    event.set_location,
                    event.hit_type,
                    event.num_blockers,
                    event.block_touch,
                    event.serve_type,
                    event.win_reason,
                    event.lose_reason,
                    event.winning_team,
                ])?;
            }
        }
        tx.commit()?;
        Ok(events.len())
    }

    /// All raw events in insertion order
    pub fn get_raw_events(&self) -> Result<Vec<RawEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT rally, round, team, receive_location, digger_location, pass_land_location,
                    hitter_location, hit_land_location, pass_rating, set_type, set_location,
                    hit_type, num_blockers, block_touch, serve_type, win_reason, lose_reason,
                    winning_team
             FROM raw_events ORDER BY event_id",
        )?;

        let events = stmt
            .query_map([], Self::row_to_raw_event)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(events)
    }

    fn row_to_raw_event(row: &rusqlite::Row) -> rusqlite::Result<RawEvent> {
        Ok(RawEvent {
            rally: row.get(0)?,
            round: row.get(1)?,
            team: row.get(2)?,
            receive_location: row.get(3)?,
            digger_location: row.get(4)?,
            pass_land_location: row.get(5)?,
            hitter_location: row.get(6)?,
            hit_land_location: row.get(7)?,
            pass_rating: row.get(8)?,
            set_type: row.get(9)?,
            set_location: row.get(10)?,
            hit_type: row.get(11)?,
            num_blockers: row.get(12)?,
            block_touch: row.get(13)?,
            serve_type: row.get(14)?,
            win_reason: row.get(15)?,
            lose_reason: row.get(16)?,
            winning_team: row.get(17)?,
        })
    }

    // ==================== Rallies ====================

    /// Insert derived rallies in one transaction
    pub fn insert_rallies(&mut self, rallies: &[Rally]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO rallies (rally_id, round, team, receive_location, digger_location,
                    pass_land_location, hitter_location, hit_land_location, pass_rating,
                    set_type, set_location, hit_type, num_blockers, block_touch, serve_type,
                    win_reason, lose_reason, winning_team)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            )?;
            for rally in rallies {
                stmt.execute(params![
                    rally.rally_id,
                    rally.round,
                    rally.team.map(|s| s.as_str()),
                    rally.receive_location,
                    rally.digger_location,
                    rally.pass_land_location,
                    rally.hitter_location,
                    rally.hit_land_location,
                    rally.pass_rating,
                    rally.set_type,
                    rally.set_location,
                    rally.hit_type.map(|h| h.as_str()),
                    rally.num_blockers,
                    rally.block_touch,
                    rally.serve_type,
                    rally.win_reason.map(|r| r.as_str()),
                    rally.lose_reason.map(|r| r.as_str()),
                    rally.winning_team.map(|s| s.as_str()),
                ])?;
            }
        }
        tx.commit()?;
        Ok(rallies.len())
    }

    /// All rallies ordered by rally id
    pub fn get_rallies(&self) -> Result<Vec<Rally>> {
        let mut stmt = self.conn.prepare(
            "SELECT rally_id, round, team, receive_location, digger_location, pass_land_location,
                    hitter_location, hit_land_location, pass_rating, set_type, set_location,
                    hit_type, num_blockers, block_touch, serve_type, win_reason, lose_reason,
                    winning_team
             FROM rallies ORDER BY rally_id",
        )?;

        let rallies = stmt
            .query_map([], Self::row_to_rally)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rallies)
    }

    fn row_to_rally(row: &rusqlite::Row) -> rusqlite::Result<Rally> {
        let team: Option<String> = row.get(2)?;
        let hit_type: Option<String> = row.get(11)?;
        let win_reason: Option<String> = row.get(15)?;
        let lose_reason: Option<String> = row.get(16)?;
        let winning_team: Option<String> = row.get(17)?;

        Ok(Rally {
            rally_id: row.get(0)?,
            round: row.get(1)?,
            team: team.as_deref().and_then(Side::from_token),
            receive_location: row.get(3)?,
            digger_location: row.get(4)?,
            pass_land_location: row.get(5)?,
            hitter_location: row.get(6)?,
            hit_land_location: row.get(7)?,
            pass_rating: row.get(8)?,
            set_type: row.get(9)?,
            set_location: row.get(10)?,
            hit_type: hit_type.as_deref().and_then(HitType::from_token),
            num_blockers: row.get(12)?,
            block_touch: row.get(13)?,
            serve_type: row.get(14)?,
            win_reason: win_reason.as_deref().and_then(RallyOutcome::from_token),
            lose_reason: lose_reason.as_deref().and_then(RallyOutcome::from_token),
            winning_team: winning_team.as_deref().and_then(Side::from_token),
        })
    }

    // ==================== Team Side Tables ====================

    /// Insert per-rally participation records for one side
    pub fn insert_team_records(&mut self, side: Side, records: &[TeamSideRecord]) -> Result<usize> {
        let sql = format!(
            "INSERT INTO {} (rally_id, receiver, digger, hitter) VALUES (?1, ?2, ?3, ?4)",
            Self::team_table(side)
        );
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for record in records {
                stmt.execute(params![
                    record.rally_id,
                    record.receiver,
                    record.digger,
                    record.hitter,
                ])?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }

    /// Participation records for one side, ordered by rally
    pub fn get_team_records(&self, side: Side) -> Result<Vec<TeamSideRecord>> {
        let sql = format!(
            "SELECT rally_id, receiver, digger, hitter FROM {} ORDER BY rally_id",
            Self::team_table(side)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map([], |row| {
                Ok(TeamSideRecord {
                    rally_id: row.get(0)?,
                    receiver: row.get(1)?,
                    digger: row.get(2)?,
                    hitter: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Overwrite the aggregate columns on every row of one side's table
    pub fn update_team_aggregates(&self, side: Side, agg: &TeamAggregates) -> Result<usize> {
        let sql = format!(
            "UPDATE {} SET
                total_kills = ?1, total_hit_errors = ?2, total_hits = ?3,
                hitting_efficiency = ?4, total_service_aces = ?5, total_service_errors = ?6,
                service_ace_ratio = ?7, pct_tip = ?8, pct_roll_shot = ?9, pct_free_ball = ?10,
                pct_off_speed = ?11, pct_hit = ?12, pct_overpass = ?13, pct_blocked = ?14",
            Self::team_table(side)
        );
        let changed = self.conn.execute(
            &sql,
            params![
                agg.attack.total_kills,
                agg.attack.total_hit_errors,
                agg.attack.total_hits,
                agg.attack.hitting_efficiency,
                agg.total_service_aces,
                agg.total_service_errors,
                agg.service_ace_ratio,
                agg.attack.pct[0],
                agg.attack.pct[1],
                agg.attack.pct[2],
                agg.attack.pct[3],
                agg.attack.pct[4],
                agg.attack.pct[5],
                agg.attack.pct[6],
            ],
        )?;
        Ok(changed)
    }

    /// Aggregate columns for one side, or None when that side has no rallies
    pub fn get_team_aggregates(&self, side: Side) -> Result<Option<TeamAggregates>> {
        let sql = format!(
            "SELECT total_kills, total_hit_errors, total_hits, hitting_efficiency,
                    total_service_aces, total_service_errors, service_ace_ratio,
                    pct_tip, pct_roll_shot, pct_free_ball, pct_off_speed, pct_hit,
                    pct_overpass, pct_blocked
             FROM {} LIMIT 1",
            Self::team_table(side)
        );
        let agg = self
            .conn
            .query_row(&sql, [], |row| {
                Ok(TeamAggregates {
                    attack: AttackStats {
                        total_kills: row.get::<_, Option<i64>>(0)?.unwrap_or(0),
                        total_hit_errors: row.get::<_, Option<i64>>(1)?.unwrap_or(0),
                        total_hits: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
                        hitting_efficiency: row.get(3)?,
                        pct: [
                            row.get(7)?,
                            row.get(8)?,
                            row.get(9)?,
                            row.get(10)?,
                            row.get(11)?,
                            row.get(12)?,
                            row.get(13)?,
                        ],
                    },
                    total_service_aces: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
                    total_service_errors: row.get::<_, Option<i64>>(5)?.unwrap_or(0),
                    service_ace_ratio: row.get(6)?,
                })
            })
            .optional()?;
        Ok(agg)
    }

    // ==================== Players ====================

    /// Insert the derived roster; the unique constraint collapses duplicates
    pub fn insert_players(&mut self, roster: &[(i64, Side)]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx
                .prepare("INSERT OR IGNORE INTO players (jersey_number, team) VALUES (?1, ?2)")?;
            for (jersey, side) in roster {
                stmt.execute(params![jersey, side.as_str()])?;
            }
        }
        tx.commit()?;
        Ok(roster.len())
    }

    /// Overwrite one player's attack statistics
    pub fn update_player_attack(&self, jersey: i64, side: Side, attack: &AttackStats) -> Result<()> {
        self.conn.execute(
            "UPDATE players SET
                total_kills = ?1, total_hit_errors = ?2, total_hits = ?3,
                hitting_efficiency = ?4, pct_tip = ?5, pct_roll_shot = ?6, pct_free_ball = ?7,
                pct_off_speed = ?8, pct_hit = ?9, pct_overpass = ?10, pct_blocked = ?11
             WHERE jersey_number = ?12 AND team = ?13",
            params![
                attack.total_kills,
                attack.total_hit_errors,
                attack.total_hits,
                attack.hitting_efficiency,
                attack.pct[0],
                attack.pct[1],
                attack.pct[2],
                attack.pct[3],
                attack.pct[4],
                attack.pct[5],
                attack.pct[6],
                jersey,
                side.as_str(),
            ],
        )?;
        Ok(())
    }

    /// Full roster with attack statistics, ordered by team then jersey
    pub fn get_players(&self) -> Result<Vec<Player>> {
        let mut stmt = self.conn.prepare(
            "SELECT jersey_number, team, total_kills, total_hit_errors, total_hits,
                    hitting_efficiency, pct_tip, pct_roll_shot, pct_free_ball, pct_off_speed,
                    pct_hit, pct_overpass, pct_blocked
             FROM players ORDER BY team, jersey_number",
        )?;

        let players = stmt
            .query_map([], |row| {
                let team: String = row.get(1)?;
                Ok(Player {
                    jersey_number: row.get(0)?,
                    team: Side::from_token(&team).unwrap_or(Side::A),
                    attack: AttackStats {
                        total_kills: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
                        total_hit_errors: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
                        total_hits: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
                        hitting_efficiency: row.get(5)?,
                        pct: [
                            row.get(6)?,
                            row.get(7)?,
                            row.get(8)?,
                            row.get(9)?,
                            row.get(10)?,
                            row.get(11)?,
                            row.get(12)?,
                        ],
                    },
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(players)
    }

    // ==================== Cleaning Support ====================

    /// Number of rows changed by an UPDATE statement (used by the normalizer)
    pub(crate) fn execute_update(&self, sql: &str) -> Result<usize> {
        Ok(self.conn.execute(sql, [])?)
    }

    /// Scalar COUNT(*) query (used by the normalizer's coercion audit)
    pub(crate) fn query_count(&self, sql: &str) -> Result<usize> {
        let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n as usize)
    }

    // ==================== Statistics ====================

    fn count(&self, table: &str) -> Result<usize> {
        self.query_count(&format!("SELECT COUNT(*) FROM {}", table))
    }

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        Ok(DatabaseStats {
            raw_events: self.count("raw_events")?,
            rallies: self.count("rallies")?,
            team_a_records: self.count("team_a")?,
            team_b_records: self.count("team_b")?,
            players: self.count("players")?,
        })
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub raw_events: usize,
    pub rallies: usize,
    pub team_a_records: usize,
    pub team_b_records: usize,
    pub players: usize,
}

const RAW_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS raw_events (
    event_id INTEGER PRIMARY KEY AUTOINCREMENT,
    rally INTEGER,
    round INTEGER,
    team TEXT,
    receive_location INTEGER,
    digger_location INTEGER,
    pass_land_location INTEGER,
    hitter_location INTEGER,
    hit_land_location INTEGER,
    pass_rating TEXT,
    set_type TEXT,
    set_location TEXT,
    hit_type TEXT,
    num_blockers INTEGER,
    block_touch TEXT,
    serve_type TEXT,
    win_reason TEXT,
    lose_reason TEXT,
    winning_team TEXT
);
"#;

/// Aggregate columns shared by the team tables and the players table
const AGGREGATE_COLUMNS: &str = r#"
    total_kills INTEGER,
    total_hit_errors INTEGER,
    total_hits INTEGER,
    hitting_efficiency REAL,
    total_service_aces INTEGER,
    total_service_errors INTEGER,
    service_ace_ratio REAL,
    pct_tip REAL,
    pct_roll_shot REAL,
    pct_free_ball REAL,
    pct_off_speed REAL,
    pct_hit REAL,
    pct_overpass REAL,
    pct_blocked REAL"#;

fn derived_ddl() -> String {
    let team_table = |name: &str| {
        format!(
            r#"
CREATE TABLE IF NOT EXISTS {name} (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    rally_id INTEGER NOT NULL REFERENCES rallies(rally_id),
    receiver INTEGER,
    digger INTEGER,
    hitter INTEGER,{columns}
);
"#,
            name = name,
            columns = AGGREGATE_COLUMNS,
        )
    };

    format!(
        r#"
CREATE TABLE IF NOT EXISTS rallies (
    rally_id INTEGER PRIMARY KEY,
    round INTEGER,
    team TEXT,
    receive_location INTEGER,
    digger_location INTEGER,
    pass_land_location INTEGER,
    hitter_location INTEGER,
    hit_land_location INTEGER,
    pass_rating TEXT,
    set_type TEXT,
    set_location TEXT,
    hit_type TEXT,
    num_blockers INTEGER,
    block_touch TEXT,
    serve_type TEXT,
    win_reason TEXT,
    lose_reason TEXT,
    winning_team TEXT
);
{team_a}
{team_b}
CREATE TABLE IF NOT EXISTS players (
    player_id INTEGER PRIMARY KEY AUTOINCREMENT,
    jersey_number INTEGER NOT NULL,
    team TEXT NOT NULL,{columns},
    UNIQUE(jersey_number, team)
);
"#,
        team_a = team_table("team_a"),
        team_b = team_table("team_b"),
        columns = AGGREGATE_COLUMNS,
    )
}
