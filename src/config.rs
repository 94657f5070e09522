use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    File,
    Http,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadFormat {
    Json,
    Csv,
}

/// What to do with a record whose clear rate is neither given nor derivable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionPolicy {
    #[default]
    Drop,
    RetainNull,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub kind: SourceKind,
    pub location: String,
    /// Guessed from the location's extension when omitted.
    pub format: Option<PayloadFormat>,
    pub limit: Option<usize>,
}

impl SourceConfig {
    pub fn payload_format(&self) -> PayloadFormat {
        self.format.unwrap_or_else(|| {
            if self.location.to_lowercase().ends_with(".csv") {
                PayloadFormat::Csv
            } else {
                PayloadFormat::Json
            }
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub sources: Vec<SourceConfig>,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub exclusion_policy: ExclusionPolicy,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_index_path() -> PathBuf {
    PathBuf::from("data/snapshots.db")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_json::from_str(content)?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::Invalid("at least one source is required".into()));
        }
        for source in &self.sources {
            if source.location.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "source {} has an empty location",
                    source.name
                )));
            }
        }
        Ok(())
    }

    pub fn tracing_level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }
}

pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    AppConfig::from_json(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply() {
        let config = AppConfig::from_json(
            r#"{"sources": [{"name": "ped", "kind": "file", "location": "levels.csv"}]}"#,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.index_path, PathBuf::from("data/snapshots.db"));
        assert_eq!(config.exclusion_policy, ExclusionPolicy::Drop);
        assert_eq!(config.tracing_level(), tracing::Level::INFO);
        assert_eq!(config.sources[0].payload_format(), PayloadFormat::Csv);
    }

    #[test]
    fn test_explicit_values() {
        let config = AppConfig::from_json(
            r#"{
                "sources": [{
                    "name": "raw",
                    "kind": "http",
                    "location": "https://example.com/levels",
                    "format": "json",
                    "limit": 200
                }],
                "data_dir": "out",
                "log_level": "debug",
                "exclusion_policy": "retain_null"
            }"#,
        )
        .unwrap();
        assert_eq!(config.sources[0].kind, SourceKind::Http);
        assert_eq!(config.sources[0].limit, Some(200));
        assert_eq!(config.exclusion_policy, ExclusionPolicy::RetainNull);
        assert_eq!(config.tracing_level(), tracing::Level::DEBUG);
    }

    #[test]
    fn test_rejects_empty_sources() {
        let err = AppConfig::from_json(r#"{"sources": []}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
