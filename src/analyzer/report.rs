use crate::model::Difficulty;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate view of one dataset snapshot. `None` marks an undefined statistic
/// and serializes as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub difficulty_distribution: DifficultyDistribution,
    pub performance_metrics: PerformanceMetrics,
    pub player_patterns: PlayerPatterns,
    pub correlations: BTreeMap<String, Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyDistribution {
    pub mean_difficulty: Option<f64>,
    pub median_difficulty: Option<f64>,
    pub difficulty_std: Option<f64>,
    pub difficulty_percentiles: Percentiles,
    pub difficulty_distribution: BTreeMap<Difficulty, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Percentiles {
    pub p25: Option<f64>,
    pub p50: Option<f64>,
    pub p75: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub average_clear_rate: Option<f64>,
    pub median_attempts: Option<f64>,
    pub total_levels: usize,
    pub difficulty_correlation: Option<f64>,
    pub average_completion_rate: Option<f64>,
    pub average_engagement_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerPatterns {
    pub likes_vs_difficulty: Option<f64>,
    pub attempts_vs_clears_ratio: Option<f64>,
    pub popularity_metrics: PopularityMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopularityMetrics {
    pub most_liked_difficulty: Option<Difficulty>,
    pub most_attempted_difficulty: Option<Difficulty>,
    pub most_engaging_difficulty: Option<Difficulty>,
}
