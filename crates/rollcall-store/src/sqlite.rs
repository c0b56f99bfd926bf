//! SQLite-backed record store, one row per identity.

use rollcall_core::{Identity, Profile, RecordStore, StoreError};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS students (
    id                   TEXT PRIMARY KEY NOT NULL,
    name                 TEXT,
    major                TEXT,
    starting_year        INTEGER,
    standing             TEXT,
    year                 INTEGER,
    total_attendance     INTEGER,
    last_attendance_time TEXT
);
";

const SELECT_COLUMNS: &str = "id, name, major, starting_year, standing, year, \
                              total_attendance, last_attendance_time";

/// Record store over a local SQLite database.
///
/// Not `Sync`; open it on the thread that runs the frame loop.
pub struct SqliteRecordStore {
    conn: Connection,
}

impl SqliteRecordStore {
    /// Open (or create) the database at `path`.
    ///
    /// `busy_timeout` bounds how long a call waits on a locked database
    /// before failing, so a stuck writer cannot stall the loop forever.
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)
            .map_err(|e| StoreError::Unavailable(format!("{}: {e}", path.display())))?;
        conn.busy_timeout(busy_timeout)
            .map_err(|e| StoreError::Backend(format!("busy_timeout: {e}")))?;
        tracing::debug!(path = %path.display(), "opened attendance database");
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| StoreError::Backend(format!("schema init failed: {e}")))?;
        Ok(Self { conn })
    }

    /// Insert or fully replace a record.
    pub fn put(&self, id: &Identity, profile: &Profile) -> Result<(), StoreError> {
        let total = profile
            .total_attendance
            .map(|t| to_sql_count(id, t))
            .transpose()?;
        self.conn
            .execute(
                "INSERT OR REPLACE INTO students
                 (id, name, major, starting_year, standing, year,
                  total_attendance, last_attendance_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id.as_str(),
                    profile.name,
                    profile.major,
                    profile.starting_year,
                    profile.standing,
                    profile.year,
                    total,
                    profile.last_attendance_time,
                ],
            )
            .map_err(|e| StoreError::Backend(format!("put {id} failed: {e}")))?;
        Ok(())
    }

    /// All records ordered by identity.
    pub fn list(&self) -> Result<Vec<(Identity, Profile)>, StoreError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM students ORDER BY id");
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| StoreError::Backend(format!("list prepare failed: {e}")))?;
        let rows = stmt
            .query_map([], row_to_record)
            .map_err(|e| StoreError::Backend(format!("list query failed: {e}")))?;

        let mut out = Vec::new();
        for row in rows {
            let (id, profile) =
                row.map_err(|e| StoreError::Backend(format!("list row failed: {e}")))?;
            out.push((id, profile));
        }
        Ok(out)
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM students", [], |row| row.get(0))
            .map_err(|e| StoreError::Backend(format!("count failed: {e}")))?;
        Ok(n.max(0) as usize)
    }
}

impl RecordStore for SqliteRecordStore {
    fn fetch(&self, id: &Identity) -> Result<Option<Profile>, StoreError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM students WHERE id = ?1");
        let record = self
            .conn
            .query_row(&sql, params![id.as_str()], row_to_record)
            .optional()
            .map_err(|e| StoreError::Backend(format!("fetch {id} failed: {e}")))?;
        Ok(record.map(|(_, profile)| profile))
    }

    fn record_attendance(
        &self,
        id: &Identity,
        total_attendance: u64,
        last_attendance_time: &str,
    ) -> Result<(), StoreError> {
        let total = to_sql_count(id, total_attendance)?;
        self.conn
            .execute(
                "INSERT INTO students (id, total_attendance, last_attendance_time)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET
                     total_attendance = excluded.total_attendance,
                     last_attendance_time = excluded.last_attendance_time",
                params![id.as_str(), total, last_attendance_time],
            )
            .map_err(|e| StoreError::Backend(format!("attendance write for {id} failed: {e}")))?;
        Ok(())
    }
}

fn to_sql_count(id: &Identity, value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::Malformed {
        id: id.to_string(),
        reason: format!("total_attendance {value} out of range"),
    })
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<(Identity, Profile)> {
    let id: String = row.get(0)?;
    let total: Option<i64> = row.get(6)?;
    let total_attendance = total
        .map(|t| u64::try_from(t).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(6, t)))
        .transpose()?;

    Ok((
        Identity::new(id),
        Profile {
            name: row.get(1)?,
            major: row.get(2)?,
            starting_year: row.get(3)?,
            standing: row.get(4)?,
            year: row.get(5)?,
            total_attendance,
            last_attendance_time: row.get(7)?,
        },
    ))
}
