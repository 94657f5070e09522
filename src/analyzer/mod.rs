// Analyzer module: aggregates submodules for different aspects of analysis.

pub mod groups;
pub mod level_analysis;
pub mod report;
pub mod statistics;

// Re-export the main Analyzer implementation for ease of use.
pub use level_analysis::{Analyzer, AnalyzerImpl, Metric};
pub use report::AnalysisReport;
