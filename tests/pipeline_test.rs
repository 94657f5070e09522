use levelscope::config::ExclusionPolicy;
use levelscope::model::{Difficulty, CANONICAL_COLUMNS};
use levelscope::parser::JsonLevelParser;
use levelscope::pipeline::Pipeline;
use levelscope::source::{fetch_all, FileSource, LevelSource};
use levelscope::storage::{load_binary, load_csv, SnapshotIndex, SnapshotWriter};
use serde_json::json;
use tempfile::tempdir;

fn payload() -> serde_json::Value {
    json!({
        "levels": [
            {"level_id": "E1", "title": "Green Hills", "maker": "peach", "difficulty": "Easy",
             "clear_rate": "80.5", "attempts": 40, "clears": 32, "likes": 12,
             "tags": ["short", "coins"], "completion_rate": 0.9, "difficulty_score": 0.1,
             "popularity_score": 0.4, "engagement_score": 0.3},
            {"level_id": "E2", "title": "Beach", "maker": "toad", "difficulty": "easy",
             "attempts": "200", "clears": 50, "likes": 8,
             "completion_rate": 1.4, "difficulty_score": 0.2,
             "popularity_score": 0.6, "engagement_score": 0.2},
            {"level_id": "H1", "title": "Airship", "maker": "bowser", "difficulty": "HARD",
             "clear_rate": 12, "attempts": 500, "clears": 60, "likes": 30, "tags": ["auto"],
             "completion_rate": 0.2, "difficulty_score": 0.8,
             "popularity_score": 0.9, "engagement_score": 0.7},
            {"level_id": "X1", "title": "Pit", "maker": "kamek", "difficulty": "expert",
             "attempts": 0, "clears": 0, "likes": "lots",
             "completion_rate": 0.0, "difficulty_score": 1.3,
             "popularity_score": 0.1, "engagement_score": 0.9},
            {"level_id": "B1", "title": "Void", "maker": "boo", "difficulty": "impossible",
             "clear_rate": 1},
            {"title": "Orphan", "maker": "nobody", "difficulty": "normal", "clear_rate": 50}
        ]
    })
}

#[tokio::test]
async fn test_end_to_end_from_file_source() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("levels.json");
    std::fs::write(&input, payload().to_string()).unwrap();

    let sources: Vec<Box<dyn LevelSource>> =
        vec![Box::new(FileSource::new("local", &input, Box::new(JsonLevelParser), None))];
    let raw = fetch_all(&sources).await.unwrap();
    assert_eq!(raw.len(), 6);

    let data_dir = dir.path().join("data");
    let pipeline = Pipeline::new(
        ExclusionPolicy::Drop,
        SnapshotWriter::new(&data_dir).unwrap(),
        SnapshotIndex::new(data_dir.join("snapshots.db")).unwrap(),
    );
    let output = pipeline.run(&raw).unwrap();
    let dataset = &output.dataset;

    // Invalid category, missing id and the underivable clear rate are all dropped.
    let ids: Vec<&str> = dataset.rows.iter().map(|r| r.level_id.as_str()).collect();
    assert_eq!(ids, vec!["E1", "E2", "H1"]);
    assert_eq!(dataset.columns, CANONICAL_COLUMNS.to_vec());

    for row in &dataset.rows {
        for score in [
            row.difficulty_score,
            row.engagement_score,
            row.popularity_score,
            row.completion_rate,
        ]
        .into_iter()
        .flatten()
        {
            assert!((0.0..=1.0).contains(&score));
        }
        assert_eq!(row.data_version, "1.0");
        assert_eq!(row.timestamp, dataset.timestamp);
    }

    let e2 = &dataset.rows[1];
    assert_eq!(e2.clear_rate, Some(25.0));
    assert_eq!(e2.completion_rate, Some(1.0));
    assert_eq!(e2.tags, "");
    assert_eq!(dataset.rows[0].tags, "short,coins");

    // Snapshots: both artifacts, one name, lossless binary reload.
    assert_eq!(load_binary(&output.snapshot.binary_path).unwrap(), *dataset);
    let from_csv = load_csv(&output.snapshot.csv_path).unwrap();
    assert_eq!(from_csv.len(), 3);
    assert_eq!(from_csv.rows[2].difficulty, Difficulty::Hard);
    assert_eq!(pipeline.index().latest().unwrap().unwrap().row_count, 3);

    let report = &output.report;
    assert_eq!(report.performance_metrics.total_levels, 3);
    assert_eq!(report.correlations.len(), 6);
    assert_eq!(report.difficulty_distribution.difficulty_distribution[&Difficulty::Easy], 2);
    assert_eq!(report.difficulty_distribution.difficulty_distribution[&Difficulty::Expert], 0);
    assert_eq!(
        report.player_patterns.popularity_metrics.most_liked_difficulty,
        Some(Difficulty::Hard)
    );
}

#[test]
fn test_empty_run_produces_schema_complete_snapshot() {
    let dir = tempdir().unwrap();
    let pipeline = Pipeline::new(
        ExclusionPolicy::Drop,
        SnapshotWriter::new(dir.path()).unwrap(),
        SnapshotIndex::in_memory().unwrap(),
    );
    let output = pipeline.run(&[]).unwrap();

    assert!(output.dataset.is_empty());
    assert_eq!(output.dataset.columns.len(), CANONICAL_COLUMNS.len());
    let header = std::fs::read_to_string(&output.snapshot.csv_path).unwrap();
    assert_eq!(header.trim_end(), CANONICAL_COLUMNS.join(","));

    assert_eq!(output.report.performance_metrics.total_levels, 0);
    assert!(output.report.correlations.values().all(Option::is_none));
    assert_eq!(output.report.difficulty_distribution.difficulty_std, None);
}

#[test]
fn test_unwritable_data_dir_aborts_run() {
    let dir = tempdir().unwrap();
    let data_dir = dir.path().join("data");
    let writer = SnapshotWriter::new(&data_dir).unwrap();
    let pipeline = Pipeline::new(
        ExclusionPolicy::Drop,
        writer,
        SnapshotIndex::in_memory().unwrap(),
    );

    // Replace the directory with a plain file so the publish step cannot create anything.
    std::fs::remove_dir(&data_dir).unwrap();
    std::fs::write(&data_dir, b"not a directory").unwrap();

    assert!(pipeline.run(&[]).is_err());
    assert!(pipeline.index().latest().unwrap().is_none());
}
