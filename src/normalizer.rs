use crate::config::ExclusionPolicy;
use crate::model::{CleanedLevelRecord, Coerced, Difficulty, RawLevelRecord, RecordIssue};
use crate::validator;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Result of normalizing one validated record.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Clean(CleanedLevelRecord),
    /// The clear rate was neither given nor derivable. The record is still
    /// built, with `clear_rate = None`, so the caller can apply its policy.
    Excluded {
        record: CleanedLevelRecord,
        reason: RecordIssue,
    },
}

/// Normalizes every record and applies the exclusion policy. Never fails:
/// records that don't satisfy the validation contract are logged and skipped.
pub fn normalize_all(
    records: &[RawLevelRecord],
    policy: ExclusionPolicy,
) -> Vec<CleanedLevelRecord> {
    let mut cleaned = Vec::with_capacity(records.len());

    for record in records {
        match normalize(record) {
            Ok(Normalized::Clean(level)) => cleaned.push(level),
            Ok(Normalized::Excluded { record: level, reason }) => match policy {
                ExclusionPolicy::Drop => warn!("Dropping record: {}", reason),
                ExclusionPolicy::RetainNull => {
                    warn!("Keeping record with null clear_rate: {}", reason);
                    cleaned.push(level);
                }
            },
            Err(issue) => warn!("Skipping unvalidated record: {}", issue),
        }
    }

    info!("Normalization produced {} of {} records", cleaned.len(), records.len());
    cleaned
}

/// Coerces types, reconciles the clear rate and clips bounded scores.
/// Fails only when the record does not pass `validator::check`.
pub fn normalize(record: &RawLevelRecord) -> Result<Normalized, RecordIssue> {
    validator::check(record)?;

    let level_id = record.level_id();
    let difficulty = record
        .text("difficulty")
        .as_deref()
        .and_then(Difficulty::parse)
        .ok_or_else(|| RecordIssue::InvalidCategory {
            level_id: level_id.clone(),
            value: String::new(),
        })?;

    let attempts = count_field(record, "attempts", &level_id);
    let mut clears = count_field(record, "clears", &level_id);
    if let (Some(a), Some(c)) = (attempts, clears) {
        if c > a {
            warn!("Level {}: clears ({}) exceed attempts ({}), clamping", level_id, c, a);
            clears = Some(a);
        }
    }

    let explicit_rate = number_field(record, "clear_rate", &level_id)
        .map(|rate| rate.clamp(0.0, 100.0));
    let clear_rate = explicit_rate.or_else(|| calculated_clear_rate(clears, attempts));

    let likes = match number_field(record, "likes", &level_id) {
        Some(v) => v.max(0.0).trunc() as u64,
        None => 0,
    };

    let cleaned = CleanedLevelRecord {
        level_id: level_id.clone(),
        title: record.text("title").unwrap_or_default(),
        maker: record.text("maker").unwrap_or_default(),
        difficulty,
        clear_rate,
        attempts,
        clears,
        likes,
        tags: tag_list(record.get("tags")),
        completion_rate: number_field(record, "completion_rate", &level_id).map(clamp_unit),
        difficulty_score: number_field(record, "difficulty_score", &level_id).map(clamp_unit),
        popularity_score: number_field(record, "popularity_score", &level_id).map(clamp_unit),
        engagement_score: number_field(record, "engagement_score", &level_id).map(clamp_unit),
    };

    if cleaned.clear_rate.is_none() {
        return Ok(Normalized::Excluded {
            record: cleaned,
            reason: RecordIssue::UndefinedClearRate { level_id },
        });
    }
    Ok(Normalized::Clean(cleaned))
}

/// `clears / attempts * 100`, undefined unless both are known and `attempts > 0`.
pub fn calculated_clear_rate(clears: Option<u64>, attempts: Option<u64>) -> Option<f64> {
    match (clears, attempts) {
        (Some(c), Some(a)) if a > 0 => Some(c as f64 / a as f64 * 100.0),
        _ => None,
    }
}

pub fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Numeric coercion. Empty strings count as missing; anything that isn't a
/// finite number is unparseable.
pub fn coerce_number(value: Option<&Value>) -> Coerced {
    match value {
        None => Coerced::Missing,
        Some(Value::Number(n)) => n
            .as_f64()
            .filter(|v| v.is_finite())
            .map_or(Coerced::Unparseable, Coerced::Value),
        Some(Value::String(s)) if s.trim().is_empty() => Coerced::Missing,
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map_or(Coerced::Unparseable, Coerced::Value),
        Some(_) => Coerced::Unparseable,
    }
}

fn number_field(record: &RawLevelRecord, field: &'static str, level_id: &str) -> Option<f64> {
    let coerced = coerce_number(record.get(field));
    if coerced == Coerced::Unparseable {
        let issue = RecordIssue::UnparseableValue {
            level_id: level_id.to_string(),
            field,
            raw: record.get(field).map(|v| v.to_string()).unwrap_or_default(),
        };
        warn!("{}, treating as unknown", issue);
    }
    coerced.value()
}

fn count_field(record: &RawLevelRecord, field: &'static str, level_id: &str) -> Option<u64> {
    match number_field(record, field, level_id) {
        Some(v) if v < 0.0 => {
            warn!("Level {}: negative {} ({}), treating as unknown", level_id, field, v);
            None
        }
        Some(v) => Some(v.trunc() as u64),
        None => None,
    }
}

fn tag_list(value: Option<&Value>) -> Option<Vec<String>> {
    match value {
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .collect(),
        ),
        Some(other) => {
            debug!("tags is not a list ({}), ignoring", other);
            None
        }
        None => None,
    }
}
