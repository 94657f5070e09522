// Core structs: RawLevelRecord, CleanedLevelRecord, Dataset and the error enums
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Version literal stamped on every row of an assembled dataset.
pub const DATA_VERSION: &str = "1.0";

/// Keys a raw level record is expected to carry.
pub const RAW_FIELDS: [&str; 13] = [
    "level_id",
    "title",
    "maker",
    "difficulty",
    "clear_rate",
    "attempts",
    "clears",
    "likes",
    "tags",
    "completion_rate",
    "difficulty_score",
    "popularity_score",
    "engagement_score",
];

/// Keys without which a record is dropped by the validator.
pub const REQUIRED_FIELDS: [&str; 4] = ["level_id", "title", "maker", "difficulty"];

/// Column order of every persisted dataset snapshot.
pub const CANONICAL_COLUMNS: [&str; 15] = [
    "level_id",
    "difficulty",
    "clear_rate",
    "attempts",
    "clears",
    "likes",
    "title",
    "maker",
    "tags",
    "difficulty_score",
    "popularity_score",
    "engagement_score",
    "completion_rate",
    "timestamp",
    "data_version",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
    Expert,
}

impl Difficulty {
    /// Fixed enumeration order, also used as the tie-break order in group statistics.
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Normal,
        Difficulty::Hard,
        Difficulty::Expert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
            Difficulty::Expert => "expert",
        }
    }

    /// Case-insensitive lookup into the category set.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "normal" => Some(Difficulty::Normal),
            "hard" => Some(Difficulty::Hard),
            "expert" => Some(Difficulty::Expert),
            _ => None,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Untyped level record as delivered by a source. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawLevelRecord(Map<String, Value>);

impl RawLevelRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Accepts only JSON objects; anything else is a malformed input that aborts the run.
    pub fn from_value(value: Value) -> Result<Self, PipelineError> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(PipelineError::MalformedRecord(format!(
                "expected an object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Returns the field value, treating an explicit JSON null as absent.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| !v.is_null())
    }

    pub fn has(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Scalar field rendered as text. Lists and objects yield `None`.
    pub fn text(&self, field: &str) -> Option<String> {
        match self.get(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Identifier used in diagnostics.
    pub fn level_id(&self) -> String {
        self.text("level_id").unwrap_or_else(|| "unknown".to_string())
    }

    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }
}

impl From<&CleanedLevelRecord> for RawLevelRecord {
    fn from(record: &CleanedLevelRecord) -> Self {
        let mut fields = Map::new();
        fields.insert("level_id".into(), record.level_id.clone().into());
        fields.insert("title".into(), record.title.clone().into());
        fields.insert("maker".into(), record.maker.clone().into());
        fields.insert("difficulty".into(), record.difficulty.as_str().into());
        fields.insert("clear_rate".into(), record.clear_rate.into());
        fields.insert("attempts".into(), record.attempts.into());
        fields.insert("clears".into(), record.clears.into());
        fields.insert("likes".into(), record.likes.into());
        fields.insert("tags".into(), record.tags.clone().into());
        fields.insert("completion_rate".into(), record.completion_rate.into());
        fields.insert("difficulty_score".into(), record.difficulty_score.into());
        fields.insert("popularity_score".into(), record.popularity_score.into());
        fields.insert("engagement_score".into(), record.engagement_score.into());
        Self(fields)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Outcome of coercing one raw field to a number. `Unparseable` is kept apart
/// from `Missing` so diagnostics can tell a bad value from an absent one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coerced {
    Missing,
    Unparseable,
    Value(f64),
}

impl Coerced {
    pub fn value(self) -> Option<f64> {
        match self {
            Coerced::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// Typed level record produced by the normalizer. `None` marks an unknown value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedLevelRecord {
    pub level_id: String,
    pub title: String,
    pub maker: String,
    pub difficulty: Difficulty,
    pub clear_rate: Option<f64>,
    pub attempts: Option<u64>,
    pub clears: Option<u64>,
    pub likes: u64,
    pub tags: Option<Vec<String>>,
    pub completion_rate: Option<f64>,
    pub difficulty_score: Option<f64>,
    pub popularity_score: Option<f64>,
    pub engagement_score: Option<f64>,
}

impl CleanedLevelRecord {
    /// Whether this record carries a non-null value for the given data column.
    pub fn has_value(&self, column: &str) -> bool {
        match column {
            "clear_rate" => self.clear_rate.is_some(),
            "attempts" => self.attempts.is_some(),
            "clears" => self.clears.is_some(),
            "tags" => self.tags.is_some(),
            "completion_rate" => self.completion_rate.is_some(),
            "difficulty_score" => self.difficulty_score.is_some(),
            "popularity_score" => self.popularity_score.is_some(),
            "engagement_score" => self.engagement_score.is_some(),
            "level_id" | "title" | "maker" | "difficulty" | "likes" => true,
            _ => false,
        }
    }
}

/// One row of the canonical table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRow {
    pub level_id: String,
    pub difficulty: Difficulty,
    pub clear_rate: Option<f64>,
    pub attempts: Option<u64>,
    pub clears: Option<u64>,
    pub likes: u64,
    pub title: String,
    pub maker: String,
    pub tags: String,
    pub difficulty_score: Option<f64>,
    pub popularity_score: Option<f64>,
    pub engagement_score: Option<f64>,
    pub completion_rate: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub data_version: String,
}

/// Assembled table. Never updated after assembly, only superseded by a newer snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub timestamp: DateTime<Utc>,
    pub data_version: String,
    pub columns: Vec<String>,
    pub rows: Vec<DatasetRow>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Per-record problems. Recovered locally: logged, never propagated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordIssue {
    #[error("level {level_id}: missing required fields: {}", .fields.join(", "))]
    MissingRequiredField {
        level_id: String,
        fields: Vec<&'static str>,
    },
    #[error("level {level_id}: invalid difficulty {value:?}")]
    InvalidCategory { level_id: String, value: String },
    #[error("level {level_id}: unparseable value for {field}: {raw}")]
    UnparseableValue {
        level_id: String,
        field: &'static str,
        raw: String,
    },
    #[error("level {level_id}: clear_rate is absent and cannot be derived")]
    UndefinedClearRate { level_id: String },
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("unexpected response status {0}")]
    InvalidResponse(u16),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("payload error: {0}")]
    Parse(#[from] ParserError),
}

impl SourceError {
    /// A non-mapping record is a programming error upstream and aborts the run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SourceError::Parse(ParserError::Malformed(_)))
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Http(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("unexpected payload shape: {0}")]
    UnexpectedShape(String),
    #[error(transparent)]
    Malformed(#[from] PipelineError),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("binary encoding error: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Database(String),
    #[error("snapshot already exists: {0}")]
    SnapshotExists(String),
    #[error("corrupt snapshot: {0}")]
    Corrupt(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

/// Failures that abort a whole run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("malformed record: {0}")]
    MalformedRecord(String),
    #[error("persistence failed: {0}")]
    Storage(#[from] StorageError),
}
