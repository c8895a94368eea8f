use crate::words::Difficulty;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use itertools::Itertools;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Number of results kept; older ones are evicted first
pub const MAX_RESULTS: usize = 20;

/// Outcome of one completed test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub wpm: u32,
    pub accuracy: u32,
    pub difficulty: Difficulty,
    pub duration_secs: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("results database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to create results directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt result row {id}: {reason}")]
    Corrupt { id: i64, reason: String },
}

/// Append-only, bounded store of past results
pub trait ResultStore {
    fn save(&mut self, record: &ResultRecord) -> Result<(), HistoryError>;
    /// All kept records in insertion order
    fn load_all(&self) -> Result<Vec<ResultRecord>, HistoryError>;
}

/// Results kept in a SQLite table; the autoincrement id gives insertion order
#[derive(Debug)]
pub struct SqliteResultStore {
    conn: Connection,
}

impl SqliteResultStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, HistoryError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self, HistoryError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, HistoryError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                wpm INTEGER NOT NULL,
                accuracy INTEGER NOT NULL,
                difficulty TEXT NOT NULL,
                duration_secs INTEGER NOT NULL,
                timestamp TEXT NOT NULL
            )
            "#,
            [],
        )?;

        Ok(Self { conn })
    }
}

impl ResultStore for SqliteResultStore {
    fn save(&mut self, record: &ResultRecord) -> Result<(), HistoryError> {
        let tx = self.conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO results (wpm, accuracy, difficulty, duration_secs, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                record.wpm,
                record.accuracy,
                record.difficulty.to_string(),
                record.duration_secs as i64,
                record.timestamp.to_rfc3339(),
            ],
        )?;

        let evicted = tx.execute(
            "DELETE FROM results WHERE id NOT IN (SELECT id FROM results ORDER BY id DESC LIMIT ?1)",
            params![MAX_RESULTS as i64],
        )?;

        tx.commit()?;

        if evicted > 0 {
            log::debug!("evicted {evicted} old result(s)");
        }
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<ResultRecord>, HistoryError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, wpm, accuracy, difficulty, duration_secs, timestamp FROM results ORDER BY id",
        )?;

        let rows = stmt.query_map([], |row| Ok(parse_row(row)))?;

        let mut records = Vec::new();
        for row in rows {
            match row? {
                Ok(record) => records.push(record),
                Err(e) => log::warn!("skipping result row: {e}"),
            }
        }

        Ok(records)
    }
}

/// One stored row; a bad value spoils only its own row
fn parse_row(row: &Row<'_>) -> Result<ResultRecord, HistoryError> {
    let id: i64 = row.get(0)?;
    let corrupt = |reason: String| HistoryError::Corrupt { id, reason };

    let wpm: u32 = row.get(1).map_err(|e| corrupt(e.to_string()))?;
    let accuracy: u32 = row.get(2).map_err(|e| corrupt(e.to_string()))?;
    let difficulty: String = row.get(3).map_err(|e| corrupt(e.to_string()))?;
    let duration_secs: i64 = row.get(4).map_err(|e| corrupt(e.to_string()))?;
    let timestamp: String = row.get(5).map_err(|e| corrupt(e.to_string()))?;

    let difficulty = Difficulty::from_str(&difficulty, true).map_err(corrupt)?;
    let timestamp = DateTime::parse_from_rfc3339(&timestamp)
        .map_err(|e| corrupt(e.to_string()))?
        .with_timezone(&Utc);

    Ok(ResultRecord {
        wpm,
        accuracy,
        difficulty,
        duration_secs: duration_secs.max(0) as u64,
        timestamp,
    })
}

/// Oldest first, for the trend chart
pub fn sorted_by_timestamp(records: &[ResultRecord]) -> Vec<ResultRecord> {
    records.iter().sorted_by_key(|r| r.timestamp).cloned().collect()
}

/// Newest first, for the results list
pub fn newest_first(records: &[ResultRecord]) -> Vec<ResultRecord> {
    records
        .iter()
        .sorted_by_key(|r| std::cmp::Reverse(r.timestamp))
        .cloned()
        .collect()
}
