use crate::analyzer::{AnalysisReport, Analyzer, AnalyzerImpl};
use crate::assembler::assemble;
use crate::config::{AppConfig, ExclusionPolicy};
use crate::model::{Dataset, PipelineError, RawLevelRecord};
use crate::normalizer::normalize_all;
use crate::storage::{SnapshotIndex, SnapshotPaths, SnapshotRecord, SnapshotWriter};
use crate::validator::validate;
use chrono::Utc;
use std::path::PathBuf;
use tracing::{error, info, info_span};

/// Everything one run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub dataset: Dataset,
    pub snapshot: SnapshotPaths,
    pub report: AnalysisReport,
}

/// Validate → normalize → assemble → persist → analyze, as one synchronous pass.
/// Each stage reads the previous stage's output and builds a new collection.
pub struct Pipeline<A: Analyzer = AnalyzerImpl> {
    policy: ExclusionPolicy,
    writer: SnapshotWriter,
    index: SnapshotIndex,
    analyzer: A,
}

impl Pipeline<AnalyzerImpl> {
    pub fn new(policy: ExclusionPolicy, writer: SnapshotWriter, index: SnapshotIndex) -> Self {
        Self::with_analyzer(policy, writer, index, AnalyzerImpl::new())
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, PipelineError> {
        let writer = SnapshotWriter::new(&config.data_dir)?;
        let index = SnapshotIndex::new(&config.index_path)?;
        Ok(Self::new(config.exclusion_policy, writer, index))
    }
}

impl<A: Analyzer> Pipeline<A> {
    pub fn with_analyzer(
        policy: ExclusionPolicy,
        writer: SnapshotWriter,
        index: SnapshotIndex,
        analyzer: A,
    ) -> Self {
        Self {
            policy,
            writer,
            index,
            analyzer,
        }
    }

    pub fn index(&self) -> &SnapshotIndex {
        &self.index
    }

    /// Keeps a copy of everything ingested, untouched, next to the snapshots.
    pub fn archive_raw(&self, raw: &[RawLevelRecord]) -> Result<PathBuf, PipelineError> {
        let path = self.writer.write_raw(raw, &Utc::now()).inspect_err(|e| {
            error!("Raw archive write failed: {}", e);
        })?;
        Ok(path)
    }

    /// Runs the whole batch. Per-record problems are logged and skipped;
    /// only persistence failures abort.
    pub fn run(&self, raw: &[RawLevelRecord]) -> Result<PipelineOutput, PipelineError> {
        let span = info_span!("pipeline", records = raw.len());
        let _enter = span.enter();

        info!("Validating {} raw records...", raw.len());
        let valid = validate(raw);

        info!("Normalizing...");
        let cleaned = normalize_all(&valid, self.policy);

        info!("Assembling dataset...");
        let dataset = assemble(&cleaned);

        info!("Persisting snapshot...");
        let snapshot = self.writer.write(&dataset).inspect_err(|e| {
            error!("Snapshot write failed: {}", e);
        })?;
        let record = SnapshotRecord::new(
            &snapshot,
            dataset.timestamp,
            &dataset.data_version,
            dataset.len(),
        );
        self.index.register(&record)?;

        info!("Analyzing...");
        let report = self.analyzer.analyze(&dataset);

        Ok(PipelineOutput {
            dataset,
            snapshot,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Difficulty;
    use serde_json::json;
    use tempfile::TempDir;

    fn pipeline(dir: &TempDir, policy: ExclusionPolicy) -> Pipeline {
        let writer = SnapshotWriter::new(dir.path()).unwrap();
        Pipeline::new(policy, writer, SnapshotIndex::in_memory().unwrap())
    }

    fn raw(id: &str, difficulty: &str) -> RawLevelRecord {
        RawLevelRecord::default()
            .with("level_id", id)
            .with("title", "t")
            .with("maker", "m")
            .with("difficulty", difficulty)
    }

    #[test]
    fn test_invalid_records_never_reach_dataset() {
        let dir = TempDir::new().unwrap();
        let input = vec![
            raw("1", "Easy").with("clear_rate", 10),
            raw("2", "legendary").with("clear_rate", 10),
            RawLevelRecord::default().with("difficulty", "hard"),
            raw("4", "EXPERT").with("clears", 50).with("attempts", 200),
        ];
        let output = pipeline(&dir, ExclusionPolicy::Drop).run(&input).unwrap();

        let ids: Vec<&str> = output.dataset.rows.iter().map(|r| r.level_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "4"]);
        assert_eq!(output.dataset.rows[1].difficulty, Difficulty::Expert);
        assert_eq!(output.dataset.rows[1].clear_rate, Some(25.0));
        assert_eq!(output.report.performance_metrics.total_levels, 2);
    }

    #[test]
    fn test_zero_attempts_dropped_by_default() {
        let dir = TempDir::new().unwrap();
        let input = vec![raw("1", "easy").with("attempts", 0).with("clears", 0)];
        let output = pipeline(&dir, ExclusionPolicy::Drop).run(&input).unwrap();
        assert!(output.dataset.is_empty());
    }

    #[test]
    fn test_zero_attempts_retained_with_null() {
        let dir = TempDir::new().unwrap();
        let input = vec![raw("1", "easy").with("attempts", 0).with("tags", json!(["x"]))];
        let output = pipeline(&dir, ExclusionPolicy::RetainNull).run(&input).unwrap();
        assert_eq!(output.dataset.len(), 1);
        assert_eq!(output.dataset.rows[0].clear_rate, None);
        assert_eq!(output.report.performance_metrics.average_clear_rate, None);
    }

    #[test]
    fn test_all_dropped_still_completes() {
        let dir = TempDir::new().unwrap();
        let p = pipeline(&dir, ExclusionPolicy::Drop);
        let output = p.run(&[raw("1", "nope")]).unwrap();
        assert!(output.dataset.is_empty());
        assert!(output.snapshot.csv_path.exists());
        assert_eq!(output.report.performance_metrics.total_levels, 0);

        let latest = p.index().latest().unwrap().unwrap();
        assert_eq!(latest.name, output.snapshot.name);
        assert_eq!(latest.row_count, 0);
    }

    #[test]
    fn test_raw_archive_keeps_rejected_records() {
        let dir = TempDir::new().unwrap();
        let p = pipeline(&dir, ExclusionPolicy::Drop);
        let input = vec![raw("1", "easy"), raw("2", "legendary")];

        let path = p.archive_raw(&input).unwrap();
        assert_eq!(crate::storage::load_raw(&path).unwrap(), input);
    }
}
