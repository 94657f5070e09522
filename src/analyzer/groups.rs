use crate::analyzer::statistics::mean;
use crate::model::{DatasetRow, Difficulty};

/// Mean of a metric per difficulty, in category order. Categories without any
/// known value for the metric are omitted.
pub fn group_means<F>(rows: &[DatasetRow], metric: F) -> Vec<(Difficulty, f64)>
where
    F: Fn(&DatasetRow) -> Option<f64>,
{
    Difficulty::ALL
        .iter()
        .filter_map(|&difficulty| {
            let values: Vec<f64> = rows
                .iter()
                .filter(|row| row.difficulty == difficulty)
                .filter_map(&metric)
                .collect();
            mean(&values).map(|avg| (difficulty, avg))
        })
        .collect()
}

/// Category with the largest group mean. Ties go to the earlier category.
pub fn top_group<F>(rows: &[DatasetRow], metric: F) -> Option<Difficulty>
where
    F: Fn(&DatasetRow) -> Option<f64>,
{
    let mut best: Option<(Difficulty, f64)> = None;
    for (difficulty, avg) in group_means(rows, metric) {
        match best {
            Some((_, top)) if avg <= top => {}
            _ => best = Some((difficulty, avg)),
        }
    }
    best.map(|(difficulty, _)| difficulty)
}
