use crate::config::{SourceConfig, SourceKind};
use crate::model::{RawLevelRecord, SourceError};
use crate::parser::{parser_for, Parser};
use crate::source::LevelSource;

use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Reads a payload from the local filesystem.
pub struct FileSource {
    name: String,
    path: PathBuf,
    parser: Box<dyn Parser>,
    limit: Option<usize>,
}

/// Downloads a payload over HTTP, e.g. a raw file from a Git hosting service.
pub struct HttpSource {
    name: String,
    client: Client,
    url: String,
    parser: Box<dyn Parser>,
    limit: Option<usize>,
}

impl FileSource {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        parser: Box<dyn Parser>,
        limit: Option<usize>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            parser,
            limit,
        }
    }
}

impl HttpSource {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        parser: Box<dyn Parser>,
        limit: Option<usize>,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent("levelscope/0.1")
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            name: name.into(),
            client,
            url: url.into(),
            parser,
            limit,
        })
    }
}

pub fn build_source(cfg: &SourceConfig) -> Result<Box<dyn LevelSource>, SourceError> {
    let parser = parser_for(cfg.payload_format());
    let source: Box<dyn LevelSource> = match cfg.kind {
        SourceKind::File => Box::new(FileSource::new(&cfg.name, &cfg.location, parser, cfg.limit)),
        SourceKind::Http => Box::new(HttpSource::new(&cfg.name, &cfg.location, parser, cfg.limit)?),
    };
    Ok(source)
}

fn take_limit(mut levels: Vec<RawLevelRecord>, limit: Option<usize>) -> Vec<RawLevelRecord> {
    if let Some(limit) = limit {
        levels.truncate(limit);
    }
    levels
}

#[async_trait::async_trait]
impl LevelSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_raw_levels(&self) -> Result<Vec<RawLevelRecord>, SourceError> {
        info!("Reading levels from {}", self.path.display());
        let payload = tokio::fs::read_to_string(&self.path).await?;
        let levels = self.parser.parse(&payload)?;
        Ok(take_limit(levels, self.limit))
    }
}

#[async_trait::async_trait]
impl LevelSource for HttpSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_raw_levels(&self) -> Result<Vec<RawLevelRecord>, SourceError> {
        info!("Downloading levels from {}", self.url);
        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            return Err(SourceError::InvalidResponse(response.status().as_u16()));
        }

        let payload = response.text().await?;
        let levels = self.parser.parse(&payload)?;
        Ok(take_limit(levels, self.limit))
    }
}
