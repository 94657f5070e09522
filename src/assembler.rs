use crate::model::{
    CleanedLevelRecord, Dataset, DatasetRow, CANONICAL_COLUMNS, DATA_VERSION, RAW_FIELDS,
};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

/// Builds the canonical table stamped with the current instant.
pub fn assemble(records: &[CleanedLevelRecord]) -> Dataset {
    assemble_at(records, Utc::now())
}

/// Builds the canonical table. Every row shares `timestamp`; an empty input
/// still yields the full column set with zero rows.
pub fn assemble_at(records: &[CleanedLevelRecord], timestamp: DateTime<Utc>) -> Dataset {
    for column in missing_columns(records) {
        warn!("Column {} missing from input, filling with null", column);
    }

    let rows = records
        .iter()
        .map(|record| DatasetRow {
            level_id: record.level_id.clone(),
            difficulty: record.difficulty,
            clear_rate: record.clear_rate,
            attempts: record.attempts,
            clears: record.clears,
            likes: record.likes,
            title: record.title.clone(),
            maker: record.maker.clone(),
            tags: join_tags(record.tags.as_deref()),
            difficulty_score: record.difficulty_score,
            popularity_score: record.popularity_score,
            engagement_score: record.engagement_score,
            completion_rate: record.completion_rate,
            timestamp,
            data_version: DATA_VERSION.to_string(),
        })
        .collect::<Vec<_>>();

    info!("Assembled dataset with {} rows", rows.len());

    Dataset {
        timestamp,
        data_version: DATA_VERSION.to_string(),
        columns: CANONICAL_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows,
    }
}

/// Data columns for which no input record carries a value.
pub fn missing_columns(records: &[CleanedLevelRecord]) -> Vec<&'static str> {
    RAW_FIELDS
        .iter()
        .copied()
        .filter(|column| !records.iter().any(|r| r.has_value(column)))
        .collect()
}

/// Comma-joined tag list; absent tags become an empty string, never null.
pub fn join_tags(tags: Option<&[String]>) -> String {
    tags.map(|t| t.join(",")).unwrap_or_default()
}
