use crate::model::StorageError;
use crate::storage::SnapshotPaths;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};
use std::path::{Path, PathBuf};

/// One persisted dataset snapshot as recorded in the index.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRecord {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub data_version: String,
    pub row_count: usize,
    pub csv_path: PathBuf,
    pub binary_path: PathBuf,
}

impl SnapshotRecord {
    pub fn new(
        paths: &SnapshotPaths,
        created_at: DateTime<Utc>,
        data_version: &str,
        row_count: usize,
    ) -> Self {
        Self {
            name: paths.name.clone(),
            created_at,
            data_version: data_version.to_string(),
            row_count,
            csv_path: paths.csv_path.clone(),
            binary_path: paths.binary_path.clone(),
        }
    }
}

/// SQLite catalog of written snapshots, newest first on lookup.
pub struct SnapshotIndex {
    conn: Connection,
}

impl SnapshotIndex {
    /// Opens the index database and creates the schema if needed.
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        Self::init(conn)
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS snapshots (
                name TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                data_version TEXT NOT NULL,
                row_count INTEGER NOT NULL,
                csv_path TEXT NOT NULL,
                binary_path TEXT NOT NULL
            );
            ",
        )?;
        Ok(Self { conn })
    }

    /// Records a snapshot. Snapshots are write-once, so a duplicate name is an error.
    pub fn register(&self, record: &SnapshotRecord) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO snapshots
                 (name, created_at, data_version, row_count, csv_path, binary_path)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                &record.name,
                &record.created_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
                &record.data_version,
                record.row_count as i64,
                record.csv_path.to_string_lossy().into_owned(),
                record.binary_path.to_string_lossy().into_owned(),
            ],
        )?;
        Ok(())
    }

    /// Most recent snapshot, the one that supersedes all others.
    pub fn latest(&self) -> Result<Option<SnapshotRecord>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT name, created_at, data_version, row_count, csv_path, binary_path
             FROM snapshots ORDER BY created_at DESC LIMIT 1",
        )?;

        let mut rows = stmt.query([])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Self::map_record(row)?))
        } else {
            Ok(None)
        }
    }

    /// All snapshots, newest first.
    pub fn list(&self) -> Result<Vec<SnapshotRecord>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT name, created_at, data_version, row_count, csv_path, binary_path
             FROM snapshots ORDER BY created_at DESC",
        )?;

        let rows = stmt.query_map([], |row| Self::map_record(row))?;
        let mut records = Vec::new();
        for record in rows {
            records.push(record?);
        }
        Ok(records)
    }

    fn map_record(row: &Row) -> Result<SnapshotRecord, rusqlite::Error> {
        let created_at_str: String = row.get(1)?;
        let created_at = created_at_str.parse().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let row_count: i64 = row.get(3)?;
        let csv_path: String = row.get(4)?;
        let binary_path: String = row.get(5)?;

        Ok(SnapshotRecord {
            name: row.get(0)?,
            created_at,
            data_version: row.get(2)?,
            row_count: row_count.max(0) as usize,
            csv_path: PathBuf::from(csv_path),
            binary_path: PathBuf::from(binary_path),
        })
    }
}
