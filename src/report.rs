use chrono::{DateTime, Local};
use directories::ProjectDirs;
use rusqlite::{params, Connection, Result};
use std::path::{Path, PathBuf};

/// Summary emitted exactly once when a run reaches Completed. The engine
/// hands it to the caller and keeps nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionReport {
    pub completed: u32,
    pub total: u32,
    pub duration_minutes: u32,
}

/// One persisted run, as read back from the history database.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: i64,
    pub timer_name: String,
    pub completed: u32,
    pub total: u32,
    pub duration_minutes: u32,
    pub completed_at: DateTime<Local>,
}

/// Persistence sink for completion reports. The timer engine never writes
/// here; the embedding application does, with its own label for the run.
#[derive(Debug)]
pub struct SessionDb {
    conn: Connection,
}

impl SessionDb {
    /// Open the history database in the default state directory, creating
    /// the schema if needed.
    pub fn new() -> Result<Self> {
        let db_path = Self::db_path().unwrap_or_else(|| PathBuf::from("rally_sessions.db"));
        Self::open(db_path)
    }

    /// Open (or create) a history database at an explicit path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }

        let conn = Connection::open(path)?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS workout_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timer_name TEXT NOT NULL,
                exercises_completed INTEGER NOT NULL,
                total_exercises INTEGER NOT NULL,
                duration_minutes INTEGER NOT NULL,
                completed_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_workout_sessions_completed_at \
             ON workout_sessions(completed_at)",
            [],
        )?;

        Ok(SessionDb { conn })
    }

    /// Database file path under $HOME/.local/state/rally
    fn db_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home).join(".local").join("state").join("rally");
            Some(state_dir.join("sessions.db"))
        } else if let Some(proj_dirs) = ProjectDirs::from("", "", "rally") {
            Some(proj_dirs.data_local_dir().join("sessions.db"))
        } else {
            None
        }
    }

    /// Record one finished run under the caller-supplied timer name.
    pub fn record(&self, timer_name: &str, report: &CompletionReport) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO workout_sessions
            (timer_name, exercises_completed, total_exercises, duration_minutes, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                timer_name,
                report.completed,
                report.total,
                report.duration_minutes,
                Local::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Most recent sessions, newest first.
    pub fn recent(&self, limit: u32) -> Result<Vec<SessionRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, timer_name, exercises_completed, total_exercises,
                   duration_minutes, completed_at
            FROM workout_sessions
            ORDER BY completed_at DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map([limit], |row| {
            let ts: String = row.get(5)?;
            let completed_at = DateTime::parse_from_rfc3339(&ts)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        5,
                        "completed_at".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);

            Ok(SessionRecord {
                id: row.get(0)?,
                timer_name: row.get(1)?,
                completed: row.get(2)?,
                total: row.get(3)?,
                duration_minutes: row.get(4)?,
                completed_at,
            })
        })?;

        let mut records = Vec::new();
        for record in rows {
            records.push(record?);
        }
        Ok(records)
    }

    /// Lifetime totals: (session count, minutes trained).
    pub fn totals(&self) -> Result<(u64, u64)> {
        self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(duration_minutes), 0) FROM workout_sessions",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn report(completed: u32, total: u32, minutes: u32) -> CompletionReport {
        CompletionReport {
            completed,
            total,
            duration_minutes: minutes,
        }
    }

    #[test]
    fn record_and_read_back() {
        let dir = tempdir().unwrap();
        let db = SessionDb::open(dir.path().join("sessions.db")).unwrap();

        db.record("Tabata Tuesday", &report(8, 8, 4)).unwrap();

        let recent = db.recent(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].timer_name, "Tabata Tuesday");
        assert_eq!(recent[0].completed, 8);
        assert_eq!(recent[0].total, 8);
        assert_eq!(recent[0].duration_minutes, 4);
    }

    #[test]
    fn recent_respects_limit() {
        let dir = tempdir().unwrap();
        let db = SessionDb::open(dir.path().join("sessions.db")).unwrap();

        for i in 0..5 {
            db.record(&format!("run {}", i), &report(1, 1, 1)).unwrap();
        }

        assert_eq!(db.recent(3).unwrap().len(), 3);
    }

    #[test]
    fn totals_sum_minutes() {
        let dir = tempdir().unwrap();
        let db = SessionDb::open(dir.path().join("sessions.db")).unwrap();

        db.record("a", &report(8, 8, 12)).unwrap();
        db.record("b", &report(4, 5, 30)).unwrap();

        assert_eq!(db.totals().unwrap(), (2, 42));
    }

    #[test]
    fn empty_db_has_zero_totals() {
        let dir = tempdir().unwrap();
        let db = SessionDb::open(dir.path().join("sessions.db")).unwrap();
        assert_eq!(db.totals().unwrap(), (0, 0));
        assert!(db.recent(10).unwrap().is_empty());
    }
}
