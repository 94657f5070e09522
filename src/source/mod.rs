// Ingestion boundary: sources deliver raw level records to the pipeline.

pub mod fetcher;
pub mod traits;

pub use fetcher::{build_source, FileSource, HttpSource};
pub use traits::LevelSource;

use crate::model::{RawLevelRecord, SourceError};
use futures::future::join_all;
use tracing::{info, warn};

/// Fetches every source concurrently and unions the results in source order.
/// A failing source contributes nothing; a malformed record aborts the whole fetch.
pub async fn fetch_all(
    sources: &[Box<dyn LevelSource>],
) -> Result<Vec<RawLevelRecord>, SourceError> {
    let results = join_all(sources.iter().map(|s| s.fetch_raw_levels())).await;

    let mut levels = Vec::new();
    for (source, result) in sources.iter().zip(results) {
        match result {
            Ok(mut batch) => {
                info!("Source {} delivered {} levels", source.name(), batch.len());
                levels.append(&mut batch);
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => warn!("Source {} failed: {}", source.name(), e),
        }
    }
    Ok(levels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ParserError, PipelineError};

    struct StaticSource(Vec<RawLevelRecord>);
    struct BrokenSource(bool);

    #[async_trait::async_trait]
    impl LevelSource for StaticSource {
        fn name(&self) -> &str {
            "static"
        }
        async fn fetch_raw_levels(&self) -> Result<Vec<RawLevelRecord>, SourceError> {
            Ok(self.0.clone())
        }
    }

    #[async_trait::async_trait]
    impl LevelSource for BrokenSource {
        fn name(&self) -> &str {
            "broken"
        }
        async fn fetch_raw_levels(&self) -> Result<Vec<RawLevelRecord>, SourceError> {
            if self.0 {
                Err(ParserError::Malformed(PipelineError::MalformedRecord("42".into())).into())
            } else {
                Err(SourceError::InvalidResponse(503))
            }
        }
    }

    #[tokio::test]
    async fn test_failing_source_is_skipped() {
        let sources: Vec<Box<dyn LevelSource>> = vec![
            Box::new(StaticSource(vec![RawLevelRecord::default().with("level_id", "a")])),
            Box::new(BrokenSource(false)),
            Box::new(StaticSource(vec![RawLevelRecord::default().with("level_id", "b")])),
        ];
        let levels = fetch_all(&sources).await.unwrap();
        let ids: Vec<String> = levels.iter().map(|l| l.level_id()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_malformed_source_aborts() {
        let sources: Vec<Box<dyn LevelSource>> = vec![
            Box::new(StaticSource(vec![RawLevelRecord::default()])),
            Box::new(BrokenSource(true)),
        ];
        let err = fetch_all(&sources).await.unwrap_err();
        assert!(err.is_fatal());
    }
}
