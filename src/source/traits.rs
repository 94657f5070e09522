use crate::model::{RawLevelRecord, SourceError};

#[async_trait::async_trait]
pub trait LevelSource: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch_raw_levels(&self) -> Result<Vec<RawLevelRecord>, SourceError>;
}
