use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

pub mod models;
use models::*;

use crate::error::PoolError;
use crate::scoring::MatchResult;
use crate::tournament::MatchId;

/// Predictions of many players for many matches, read in one pass.
pub type PredictionSnapshot = HashMap<(i64, MatchId), MatchResult>;

/// Thread-safe SQLite store for players and predictions (single connection
/// with mutex, which also serializes every read-modify-write)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        self.lock()?.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection mutex poisoned"))
    }

    // ── Players ──────────────────────────────────────────────────────────────

    /// Register a new player. Fails if the id is already taken.
    pub fn create_player(&self, player: &Player) -> Result<()> {
        let conn = self.lock()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM players WHERE id=?1)",
            params![player.id],
            |row| row.get(0),
        )?;
        if exists {
            return Err(PoolError::AlreadyRegistered(player.id).into());
        }
        conn.execute(
            "INSERT INTO players (id, first_name, last_name, display_name, is_queen, is_bot, timezone)
             VALUES (?1,?2,?3,?4,?5,?6,?7)",
            params![
                player.id,
                player.first_name,
                player.last_name,
                player.display_name,
                player.is_queen,
                player.is_bot,
                player.timezone,
            ],
        )?;
        Ok(())
    }

    pub fn get_player(&self, id: i64) -> Result<Option<Player>> {
        let conn = self.lock()?;
        let player = conn
            .query_row(
                "SELECT id, first_name, last_name, display_name, is_queen, is_bot, timezone
                 FROM players WHERE id=?1",
                params![id],
                map_player,
            )
            .optional()?;
        Ok(player)
    }

    /// All players, by id
    pub fn list_players(&self) -> Result<Vec<Player>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, first_name, last_name, display_name, is_queen, is_bot, timezone
             FROM players ORDER BY id",
        )?;
        let players = stmt
            .query_map([], map_player)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(players)
    }

    pub fn set_queen(&self, id: i64, is_queen: bool) -> Result<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE players SET is_queen=?1 WHERE id=?2",
            params![is_queen, id],
        )?;
        if updated == 0 {
            return Err(PoolError::PlayerNotFound(id).into());
        }
        Ok(())
    }

    pub fn set_timezone(&self, id: i64, timezone: &str) -> Result<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE players SET timezone=?1 WHERE id=?2",
            params![timezone, id],
        )?;
        if updated == 0 {
            return Err(PoolError::PlayerNotFound(id).into());
        }
        Ok(())
    }

    /// Remove a player together with their predictions. Returns whether the
    /// player existed.
    pub fn delete_player(&self, id: i64) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM predictions WHERE player_id=?1", params![id])?;
        let deleted = tx.execute("DELETE FROM players WHERE id=?1", params![id])?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    // ── Predictions ──────────────────────────────────────────────────────────

    /// Insert or overwrite the prediction of `player_id` for `match_id`
    pub fn add_prediction(
        &self,
        player_id: i64,
        match_id: &MatchId,
        result: &MatchResult,
        submitted_at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO predictions (player_id, match_id, result, submitted_at)
             VALUES (?1,?2,?3,?4)
             ON CONFLICT(player_id, match_id) DO UPDATE SET
                result=excluded.result,
                submitted_at=excluded.submitted_at",
            params![player_id, match_id, result, submitted_at],
        )?;
        Ok(())
    }

    pub fn get_prediction(&self, player_id: i64, match_id: &MatchId) -> Result<Option<Prediction>> {
        let conn = self.lock()?;
        let prediction = conn
            .query_row(
                "SELECT player_id, match_id, result, submitted_at
                 FROM predictions WHERE player_id=?1 AND match_id=?2",
                params![player_id, match_id],
                map_prediction,
            )
            .optional()?;
        Ok(prediction)
    }

    pub fn predictions_for_player(&self, player_id: i64) -> Result<Vec<Prediction>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT player_id, match_id, result, submitted_at
             FROM predictions WHERE player_id=?1",
        )?;
        let predictions = stmt
            .query_map(params![player_id], map_prediction)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(predictions)
    }

    /// Every registered player with their prediction for `match_id`, if any,
    /// by player id
    pub fn predictions_for_match(&self, match_id: &MatchId) -> Result<Vec<(i64, Option<MatchResult>)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT p.id, pr.result
             FROM players p
             LEFT JOIN predictions pr ON pr.player_id = p.id AND pr.match_id = ?1
             ORDER BY p.id",
        )?;
        let rows = stmt
            .query_map(params![match_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// All predictions for the given matches, read under one lock so every
    /// match sees a consistent peer set
    pub fn prediction_snapshot<'a>(
        &self,
        match_ids: impl IntoIterator<Item = &'a MatchId>,
    ) -> Result<PredictionSnapshot> {
        let wanted: HashSet<&MatchId> = match_ids.into_iter().collect();
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT player_id, match_id, result FROM predictions")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, MatchId>(1)?, row.get::<_, MatchResult>(2)?))
        })?;
        let mut snapshot = PredictionSnapshot::new();
        for row in rows {
            let (player_id, match_id, result) = row?;
            if wanted.contains(&match_id) {
                snapshot.insert((player_id, match_id), result);
            }
        }
        Ok(snapshot)
    }

    /// Ids of registered players with no prediction for `match_id`
    pub fn missing_players(&self, match_id: &MatchId) -> Result<Vec<i64>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id FROM players WHERE id NOT IN
                (SELECT player_id FROM predictions WHERE match_id=?1)
             ORDER BY id",
        )?;
        let ids = stmt
            .query_map(params![match_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

fn map_player(row: &rusqlite::Row) -> rusqlite::Result<Player> {
    Ok(Player {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        display_name: row.get(3)?,
        is_queen: row.get(4)?,
        is_bot: row.get(5)?,
        timezone: row.get(6)?,
    })
}

fn map_prediction(row: &rusqlite::Row) -> rusqlite::Result<Prediction> {
    Ok(Prediction {
        player_id: row.get(0)?,
        match_id: row.get(1)?,
        result: row.get(2)?,
        submitted_at: row.get(3)?,
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS players (
    id           INTEGER PRIMARY KEY,
    first_name   TEXT,
    last_name    TEXT,
    display_name TEXT,
    is_queen     INTEGER NOT NULL DEFAULT 0,
    is_bot       INTEGER NOT NULL DEFAULT 0,
    timezone     TEXT
);

CREATE TABLE IF NOT EXISTS predictions (
    player_id    INTEGER NOT NULL,
    match_id     TEXT    NOT NULL,
    result       TEXT    NOT NULL,
    submitted_at TEXT    NOT NULL,
    PRIMARY KEY (player_id, match_id)
);

CREATE INDEX IF NOT EXISTS idx_predictions_match ON predictions(match_id);
"#;
