use crate::analyzer::groups::top_group;
use crate::analyzer::report::{
    AnalysisReport, DifficultyDistribution, Percentiles, PerformanceMetrics, PlayerPatterns,
    PopularityMetrics,
};
use crate::analyzer::statistics::{mean, median, pearson, percentile, sample_std};
use crate::model::{Dataset, DatasetRow, Difficulty};
use std::collections::BTreeMap;
use tracing::info;

/// Trait defining the interface for a dataset analyzer.
pub trait Analyzer {
    fn analyze(&self, dataset: &Dataset) -> AnalysisReport;
}

/// Bounded metrics compared pairwise in the correlation section, in key order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    DifficultyScore,
    PopularityScore,
    EngagementScore,
    CompletionRate,
}

impl Metric {
    pub const CORRELATED: [Metric; 4] = [
        Metric::DifficultyScore,
        Metric::PopularityScore,
        Metric::EngagementScore,
        Metric::CompletionRate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::DifficultyScore => "difficulty_score",
            Metric::PopularityScore => "popularity_score",
            Metric::EngagementScore => "engagement_score",
            Metric::CompletionRate => "completion_rate",
        }
    }

    pub fn value(&self, row: &DatasetRow) -> Option<f64> {
        match self {
            Metric::DifficultyScore => row.difficulty_score,
            Metric::PopularityScore => row.popularity_score,
            Metric::EngagementScore => row.engagement_score,
            Metric::CompletionRate => row.completion_rate,
        }
    }
}

/// Implementation of the dataset analyzer.
pub struct AnalyzerImpl;

impl AnalyzerImpl {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AnalyzerImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for AnalyzerImpl {
    fn analyze(&self, dataset: &Dataset) -> AnalysisReport {
        let rows = &dataset.rows;
        let report = AnalysisReport {
            difficulty_distribution: difficulty_distribution(rows),
            performance_metrics: performance_metrics(rows),
            player_patterns: player_patterns(rows),
            correlations: correlations(rows),
        };
        info!(
            "Analyzed {} levels, {} of {} correlations defined",
            rows.len(),
            report.correlations.values().filter(|c| c.is_some()).count(),
            report.correlations.len()
        );
        report
    }
}

fn attempts(row: &DatasetRow) -> Option<f64> {
    row.attempts.map(|a| a as f64)
}

fn likes(row: &DatasetRow) -> Option<f64> {
    Some(row.likes as f64)
}

/// Known values of one column, nulls skipped.
fn column<F>(rows: &[DatasetRow], f: F) -> Vec<f64>
where
    F: Fn(&DatasetRow) -> Option<f64>,
{
    rows.iter().filter_map(f).collect()
}

/// Rows where both columns are known.
fn paired<F, G>(rows: &[DatasetRow], fx: F, fy: G) -> Vec<(f64, f64)>
where
    F: Fn(&DatasetRow) -> Option<f64>,
    G: Fn(&DatasetRow) -> Option<f64>,
{
    rows.iter()
        .filter_map(|row| Some((fx(row)?, fy(row)?)))
        .collect()
}

fn difficulty_distribution(rows: &[DatasetRow]) -> DifficultyDistribution {
    let scores = column(rows, |r| r.difficulty_score);

    let mut counts: BTreeMap<Difficulty, usize> =
        Difficulty::ALL.iter().map(|&d| (d, 0)).collect();
    for row in rows {
        *counts.entry(row.difficulty).or_default() += 1;
    }

    DifficultyDistribution {
        mean_difficulty: mean(&scores),
        median_difficulty: median(&scores),
        difficulty_std: sample_std(&scores),
        difficulty_percentiles: Percentiles {
            p25: percentile(&scores, 0.25),
            p50: percentile(&scores, 0.5),
            p75: percentile(&scores, 0.75),
        },
        difficulty_distribution: counts,
    }
}

fn performance_metrics(rows: &[DatasetRow]) -> PerformanceMetrics {
    PerformanceMetrics {
        average_clear_rate: mean(&column(rows, |r| r.clear_rate)),
        median_attempts: median(&column(rows, attempts)),
        total_levels: rows.len(),
        difficulty_correlation: pearson(&paired(rows, |r| r.clear_rate, |r| r.difficulty_score)),
        average_completion_rate: mean(&column(rows, |r| r.completion_rate)),
        average_engagement_score: mean(&column(rows, |r| r.engagement_score)),
    }
}

fn player_patterns(rows: &[DatasetRow]) -> PlayerPatterns {
    // Levels nobody cleared have no defined ratio and are left out.
    let ratios: Vec<f64> = rows
        .iter()
        .filter_map(|row| match (row.attempts, row.clears) {
            (Some(a), Some(c)) if c > 0 => Some(a as f64 / c as f64),
            _ => None,
        })
        .collect();

    PlayerPatterns {
        likes_vs_difficulty: pearson(&paired(rows, likes, |r| r.difficulty_score)),
        attempts_vs_clears_ratio: mean(&ratios),
        popularity_metrics: PopularityMetrics {
            most_liked_difficulty: top_group(rows, likes),
            most_attempted_difficulty: top_group(rows, attempts),
            most_engaging_difficulty: top_group(rows, |r| r.engagement_score),
        },
    }
}

/// Every unordered pair of correlated metrics exactly once, keyed `<a>_vs_<b>`
/// with `a` before `b` in `Metric::CORRELATED`.
fn correlations(rows: &[DatasetRow]) -> BTreeMap<String, Option<f64>> {
    let metrics = Metric::CORRELATED;
    let mut result = BTreeMap::new();
    for (i, a) in metrics.iter().enumerate() {
        for b in &metrics[i + 1..] {
            let key = format!("{}_vs_{}", a.name(), b.name());
            result.insert(key, pearson(&paired(rows, |r| a.value(r), |r| b.value(r))));
        }
    }
    result
}
