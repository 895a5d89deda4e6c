//! Verdict cache for the judge.
//!
//! Judging a fragment means compiling and running it once per exercise, and
//! trackers record the same fragment many times in a row. Scores are stored
//! by (language, fragment, exercise) so repeated fragments, and repeated
//! runs over the same logs, are judged once.
//!
//! # Thread Safety
//!
//! [`Database`] wraps a `rusqlite::Connection`, which is `Send` but not
//! `Sync`. Share it behind a `Mutex` or open one per thread.
//!
//! # Schema
//!
//! Timestamps are stored as TEXT in RFC 3339 UTC (`2024-01-15T10:30:00Z`).
//! Every verdict points at the run that produced it; a run is one
//! invocation of the judge, identified by a UUID v4.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use ct_core::{ExerciseId, Language, TestScore, ValidationError};
use rusqlite::{Connection, params};
use thiserror::Error;
use uuid::Uuid;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored value that no longer parses.
    #[error("invalid stored value: {0}")]
    InvalidRecord(String),
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        Self::InvalidRecord(err.to_string())
    }
}

/// One judge invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Log file the run was started for.
    pub input_path: String,
    pub language: Language,
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl Database {
    /// Opens or creates a database at the given path.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS runs (
                id TEXT PRIMARY KEY,
                started_at TEXT NOT NULL,
                input_path TEXT NOT NULL,
                language TEXT NOT NULL
            );

            -- One row per fragment and exercise; re-judging replaces the row
            CREATE TABLE IF NOT EXISTS verdicts (
                language TEXT NOT NULL,
                fragment TEXT NOT NULL,
                exercise TEXT NOT NULL,
                total INTEGER NOT NULL,
                passed INTEGER NOT NULL,
                run_id TEXT NOT NULL,
                recorded_at TEXT NOT NULL,
                PRIMARY KEY (language, fragment, exercise),
                FOREIGN KEY (run_id) REFERENCES runs(id)
            );

            CREATE INDEX IF NOT EXISTS idx_verdicts_run ON verdicts(run_id);
            ",
        )?;
        Ok(())
    }

    /// Records the start of a judge run.
    pub fn record_run(&mut self, run: &RunRecord) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO runs (id, started_at, input_path, language) VALUES (?, ?, ?, ?)",
            params![
                run.id.to_string(),
                format_timestamp(run.started_at),
                run.input_path,
                run.language.as_str(),
            ],
        )?;
        tracing::debug!(run_id = %run.id, "recorded run");
        Ok(())
    }

    /// Returns cached scores for a fragment, by exercise.
    ///
    /// Exercises never judged for this fragment are absent.
    pub fn cached_scores(
        &self,
        language: Language,
        fragment: &str,
    ) -> Result<BTreeMap<ExerciseId, TestScore>, DbError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT exercise, total, passed FROM verdicts WHERE language = ? AND fragment = ?",
        )?;
        let rows = stmt.query_map(params![language.as_str(), fragment], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, u32>(2)?,
            ))
        })?;

        let mut scores = BTreeMap::new();
        for row in rows {
            let (exercise, total, passed) = row?;
            scores.insert(ExerciseId::new(exercise)?, TestScore::new(total, passed));
        }
        Ok(scores)
    }

    /// Stores the scores of a fragment, replacing earlier verdicts.
    ///
    /// The run must have been recorded with [`Database::record_run`].
    pub fn store_scores(
        &mut self,
        run_id: Uuid,
        language: Language,
        fragment: &str,
        scores: &BTreeMap<ExerciseId, TestScore>,
    ) -> Result<usize, DbError> {
        if scores.is_empty() {
            return Ok(0);
        }
        let recorded_at = format_timestamp(Utc::now());
        let run_id = run_id.to_string();
        let tx = self.conn.transaction()?;
        let mut stored = 0;
        {
            let mut stmt = tx.prepare(
                "
                INSERT OR REPLACE INTO verdicts
                (language, fragment, exercise, total, passed, run_id, recorded_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ",
            )?;
            for (exercise, score) in scores {
                stored += stmt.execute(params![
                    language.as_str(),
                    fragment,
                    exercise.as_str(),
                    score.total,
                    score.passed,
                    run_id,
                    recorded_at,
                ])?;
            }
        }
        tx.commit()?;
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn id(name: &str) -> ExerciseId {
        ExerciseId::new(name).unwrap()
    }

    fn run(language: Language) -> RunRecord {
        RunRecord {
            id: Uuid::new_v4(),
            started_at: DateTime::parse_from_rfc3339("2024-01-15T10:30:00Z")
                .unwrap()
                .with_timezone(&Utc),
            input_path: "logs/pies.csv".to_string(),
            language,
        }
    }

    fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .unwrap();
        stmt.query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    fn count(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> i64 {
        conn.query_row(sql, params, |row| row.get(0)).unwrap()
    }

    fn verdicts_of(db: &Database, run_id: Uuid) -> i64 {
        count(
            &db.conn,
            "SELECT COUNT(*) FROM verdicts WHERE run_id = ?",
            params![run_id.to_string()],
        )
    }

    #[test]
    fn open_in_memory_database() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn schema_matches_data_model() {
        let db = Database::open_in_memory().expect("open in-memory db");
        assert_eq!(
            table_columns(&db.conn, "verdicts"),
            vec![
                "language",
                "fragment",
                "exercise",
                "total",
                "passed",
                "run_id",
                "recorded_at"
            ]
        );
        assert_eq!(
            table_columns(&db.conn, "runs"),
            vec!["id", "started_at", "input_path", "language"]
        );
    }

    #[test]
    fn recording_a_run_twice_keeps_one_row() {
        let mut db = Database::open_in_memory().unwrap();
        let record = run(Language::Kotlin);
        db.record_run(&record).unwrap();
        db.record_run(&record).unwrap();
        assert_eq!(count(&db.conn, "SELECT COUNT(*) FROM runs", params![]), 1);
        let started_at: String = db
            .conn
            .query_row("SELECT started_at FROM runs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(started_at, "2024-01-15T10:30:00.000Z");
    }

    #[test]
    fn stored_scores_are_found_by_fragment() {
        let mut db = Database::open_in_memory().unwrap();
        let record = run(Language::Python);
        db.record_run(&record).unwrap();

        let scores = BTreeMap::from([
            (id("pies"), TestScore::new(8, 8)),
            (id("zero"), TestScore::new(3, 0)),
        ]);
        let stored = db
            .store_scores(record.id, Language::Python, "print(1)", &scores)
            .unwrap();
        assert_eq!(stored, 2);

        assert_eq!(db.cached_scores(Language::Python, "print(1)").unwrap(), scores);
        assert!(db.cached_scores(Language::Python, "print(2)").unwrap().is_empty());
        assert!(db.cached_scores(Language::Cpp, "print(1)").unwrap().is_empty());
        assert_eq!(verdicts_of(&db, record.id), 2);
    }

    #[test]
    fn rejudging_replaces_verdict() {
        let mut db = Database::open_in_memory().unwrap();
        let first = run(Language::Python);
        let second = run(Language::Python);
        db.record_run(&first).unwrap();
        db.record_run(&second).unwrap();

        let fragment = "print(input())";
        let before = BTreeMap::from([(id("pies"), TestScore::new(8, 3))]);
        let after = BTreeMap::from([(id("pies"), TestScore::new(8, 8))]);
        db.store_scores(first.id, Language::Python, fragment, &before).unwrap();
        db.store_scores(second.id, Language::Python, fragment, &after).unwrap();

        assert_eq!(db.cached_scores(Language::Python, fragment).unwrap(), after);
        assert_eq!(verdicts_of(&db, first.id), 0);
        assert_eq!(verdicts_of(&db, second.id), 1);
    }

    #[test]
    fn verdicts_require_a_recorded_run() {
        let mut db = Database::open_in_memory().unwrap();
        let scores = BTreeMap::from([(id("pies"), TestScore::new(1, 1))]);
        let err = db
            .store_scores(Uuid::new_v4(), Language::Python, "x", &scores)
            .unwrap_err();
        assert!(matches!(err, DbError::Sqlite(_)));
    }

    #[test]
    fn file_database_persists_between_opens() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("verdicts.db");
        let record = run(Language::Cpp);
        {
            let mut db = Database::open(&path).unwrap();
            db.record_run(&record).unwrap();
            db.store_scores(
                record.id,
                Language::Cpp,
                "int main() {}",
                &BTreeMap::from([(id("zero"), TestScore::new(3, 1))]),
            )
            .unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(
            db.cached_scores(Language::Cpp, "int main() {}").unwrap(),
            BTreeMap::from([(id("zero"), TestScore::new(3, 1))])
        );
    }
}
