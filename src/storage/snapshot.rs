use crate::model::{
    Dataset, DatasetRow, Difficulty, RawLevelRecord, StorageError, CANONICAL_COLUMNS,
};
use crate::utils::{parse_datetime, parse_snapshot_name, raw_archive_name, snapshot_name};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotPaths {
    pub name: String,
    pub csv_path: PathBuf,
    pub binary_path: PathBuf,
}

/// Writes dataset snapshots into a directory. Artifacts are published
/// atomically and never overwritten.
pub struct SnapshotWriter {
    data_dir: PathBuf,
}

impl SnapshotWriter {
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    pub fn write(&self, dataset: &Dataset) -> Result<SnapshotPaths, StorageError> {
        let name = snapshot_name(&dataset.timestamp);
        let paths = SnapshotPaths {
            csv_path: self.data_dir.join(format!("{name}.csv")),
            binary_path: self.data_dir.join(format!("{name}.bin")),
            name,
        };

        if paths.csv_path.exists() || paths.binary_path.exists() {
            return Err(StorageError::SnapshotExists(paths.name));
        }

        publish(&paths.csv_path, |w| write_csv(dataset, w))?;
        info!("Dataset saved to {}", paths.csv_path.display());

        if let Err(e) = publish(&paths.binary_path, |w| {
            bincode::serialize_into(w, dataset).map_err(StorageError::from)
        }) {
            // A snapshot is both artifacts or neither.
            if let Err(rm) = fs::remove_file(&paths.csv_path) {
                warn!("Failed to remove {}: {}", paths.csv_path.display(), rm);
            }
            return Err(e);
        }
        info!("Dataset saved to {}", paths.binary_path.display());

        Ok(paths)
    }

    /// Archives the unioned raw records as `raw_data_<stamp>.json`, before
    /// any validation touches them. Write-once like the dataset artifacts.
    pub fn write_raw(
        &self,
        levels: &[RawLevelRecord],
        captured_at: &DateTime<Utc>,
    ) -> Result<PathBuf, StorageError> {
        let name = raw_archive_name(captured_at);
        let path = self.data_dir.join(format!("{name}.json"));
        if path.exists() {
            return Err(StorageError::SnapshotExists(name));
        }

        let archive = RawArchive {
            levels: levels.to_vec(),
        };
        publish(&path, |w| {
            serde_json::to_writer_pretty(w, &archive).map_err(StorageError::from)
        })?;
        info!("Raw data saved to {}", path.display());
        Ok(path)
    }
}

#[derive(Serialize, Deserialize)]
struct RawArchive {
    levels: Vec<RawLevelRecord>,
}

/// Reloads a raw archive written by [`SnapshotWriter::write_raw`].
pub fn load_raw(path: impl AsRef<Path>) -> Result<Vec<RawLevelRecord>, StorageError> {
    let reader = BufReader::new(File::open(path)?);
    let archive: RawArchive = serde_json::from_reader(reader)?;
    Ok(archive.levels)
}

/// Writes into `<path>.tmp`, syncs, then renames onto `path`.
/// The temporary file is removed on every failure path.
fn publish<F>(path: &Path, write: F) -> Result<(), StorageError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), StorageError>,
{
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));

    let result = write_then_rename(&tmp_path, path, write);
    if result.is_err() && tmp_path.exists() {
        if let Err(rm) = fs::remove_file(&tmp_path) {
            warn!("Failed to remove {}: {}", tmp_path.display(), rm);
        }
    }
    result
}

fn write_then_rename<F>(tmp_path: &Path, path: &Path, write: F) -> Result<(), StorageError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), StorageError>,
{
    let mut writer = BufWriter::new(File::create(tmp_path)?);
    write(&mut writer)?;
    writer.flush()?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    drop(file);
    fs::rename(tmp_path, path)?;
    Ok(())
}

fn write_csv<W: Write>(dataset: &Dataset, out: W) -> Result<(), StorageError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(CANONICAL_COLUMNS)?;
    for row in &dataset.rows {
        writer.write_record(row_cells(row))?;
    }
    writer.flush()?;
    Ok(())
}

fn row_cells(row: &DatasetRow) -> [String; 15] {
    [
        row.level_id.clone(),
        row.difficulty.to_string(),
        opt_cell(row.clear_rate),
        opt_cell(row.attempts),
        opt_cell(row.clears),
        row.likes.to_string(),
        row.title.clone(),
        row.maker.clone(),
        row.tags.clone(),
        opt_cell(row.difficulty_score),
        opt_cell(row.popularity_score),
        opt_cell(row.engagement_score),
        opt_cell(row.completion_rate),
        row.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
        row.data_version.clone(),
    ]
}

fn opt_cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Lossless reload of the binary artifact.
pub fn load_binary(path: impl AsRef<Path>) -> Result<Dataset, StorageError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(bincode::deserialize_from(reader)?)
}

/// Reloads the textual artifact, re-parsing every cell into its typed column.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Dataset, StorageError> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?.clone();
    if !headers.iter().eq(CANONICAL_COLUMNS.iter().copied()) {
        return Err(StorageError::Corrupt(format!(
            "unexpected header in {}",
            path.display()
        )));
    }

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let cell = |i: usize| record.get(i).unwrap_or("");
        let corrupt = |column: &str| {
            StorageError::Corrupt(format!("row {}: bad {} value", line + 1, column))
        };

        rows.push(DatasetRow {
            level_id: cell(0).to_string(),
            difficulty: Difficulty::parse(cell(1)).ok_or_else(|| corrupt("difficulty"))?,
            clear_rate: parse_opt(cell(2)).map_err(|_| corrupt("clear_rate"))?,
            attempts: parse_opt(cell(3)).map_err(|_| corrupt("attempts"))?,
            clears: parse_opt(cell(4)).map_err(|_| corrupt("clears"))?,
            likes: cell(5).parse().map_err(|_| corrupt("likes"))?,
            title: cell(6).to_string(),
            maker: cell(7).to_string(),
            tags: cell(8).to_string(),
            difficulty_score: parse_opt(cell(9)).map_err(|_| corrupt("difficulty_score"))?,
            popularity_score: parse_opt(cell(10)).map_err(|_| corrupt("popularity_score"))?,
            engagement_score: parse_opt(cell(11)).map_err(|_| corrupt("engagement_score"))?,
            completion_rate: parse_opt(cell(12)).map_err(|_| corrupt("completion_rate"))?,
            timestamp: parse_datetime(cell(13)).ok_or_else(|| corrupt("timestamp"))?,
            data_version: cell(14).to_string(),
        });
    }

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let timestamp = match rows.first() {
        Some(row) => row.timestamp,
        None => parse_snapshot_name(&name).ok_or_else(|| {
            StorageError::Corrupt(format!("cannot derive timestamp from {name}"))
        })?,
    };
    let data_version = rows
        .first()
        .map(|row| row.data_version.clone())
        .unwrap_or_else(|| crate::model::DATA_VERSION.to_string());

    Ok(Dataset {
        timestamp,
        data_version,
        columns: headers.iter().map(str::to_string).collect(),
        rows,
    })
}

fn parse_opt<T: std::str::FromStr>(cell: &str) -> Result<Option<T>, T::Err> {
    if cell.is_empty() {
        Ok(None)
    } else {
        cell.parse().map(Some)
    }
}
