use crate::model::{Difficulty, RawLevelRecord, RecordIssue, REQUIRED_FIELDS};
use tracing::{info, warn};

/// Keeps only the records that carry every required field and a known difficulty.
/// Rejected records are logged and dropped; this never fails.
pub fn validate(records: &[RawLevelRecord]) -> Vec<RawLevelRecord> {
    let accepted: Vec<RawLevelRecord> = records
        .iter()
        .filter(|record| match check(record) {
            Ok(()) => true,
            Err(issue) => {
                warn!("Dropping record: {}", issue);
                false
            }
        })
        .cloned()
        .collect();

    info!("Validation kept {} of {} records", accepted.len(), records.len());
    accepted
}

/// Checks one record against the required-field and category contract.
pub fn check(record: &RawLevelRecord) -> Result<(), RecordIssue> {
    let missing: Vec<&'static str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| !record.has(field))
        .collect();

    if !missing.is_empty() {
        return Err(RecordIssue::MissingRequiredField {
            level_id: record.level_id(),
            fields: missing,
        });
    }

    match record.text("difficulty") {
        Some(raw) if Difficulty::parse(&raw).is_some() => Ok(()),
        Some(raw) => Err(RecordIssue::InvalidCategory {
            level_id: record.level_id(),
            value: raw,
        }),
        None => Err(RecordIssue::InvalidCategory {
            level_id: record.level_id(),
            value: record
                .get("difficulty")
                .map(|v| v.to_string())
                .unwrap_or_default(),
        }),
    }
}
