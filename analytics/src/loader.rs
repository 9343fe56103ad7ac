use crate::dataset::{Dataset, EncodedRow};
use crate::errors::{AnalysisError, Result};
use crate::record::encode_cbor;
use crate::session::AnalysisSession;
use anyhow::Context;
use async_trait::async_trait;
use std::path::Path;
use tracing::info;

/// Source of datasets. Failures are reported as [`AnalysisError::DatasetUnavailable`].
#[async_trait]
pub trait DatasetLoader: Send + Sync {
    async fn load(&self, session: &AnalysisSession, identifier: &str) -> Result<Dataset>;
}

/// Reads files holding one `{"key": ..., "value": ...}` JSON object per line.
///
/// Keys can be strings or numbers. Values are stored as-is: their shape is only interpreted
/// when the dataset is analyzed.
#[derive(Debug, Clone, Default)]
pub struct JsonLinesLoader {
    /// Defaults to the session's `target_partitions`
    pub nb_partitions: Option<usize>,
}

impl JsonLinesLoader {
    pub fn new(nb_partitions: Option<usize>) -> Self {
        Self { nb_partitions }
    }
}

/// Table name derived from the file name: lowercase alphanumerics and underscores.
pub fn table_name_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let name: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("dataset_{name}")
    } else {
        name
    }
}

pub fn parse_json_line(line: &str) -> anyhow::Result<EncodedRow> {
    let mut object: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(line).with_context(|| "parsing json object")?;
    let key = match object.remove("key") {
        Some(serde_json::Value::String(key)) => key,
        Some(serde_json::Value::Number(key)) => key.to_string(),
        other => anyhow::bail!("invalid key {other:?}"),
    };
    let value = object
        .remove("value")
        .with_context(|| format!("missing value for key {key}"))?;
    Ok((key, encode_cbor(&value)?))
}

fn parse_json_lines(content: &str) -> anyhow::Result<Vec<EncodedRow>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            parse_json_line(line).with_context(|| format!("line {}", index + 1))
        })
        .collect()
}

#[async_trait]
impl DatasetLoader for JsonLinesLoader {
    async fn load(&self, session: &AnalysisSession, identifier: &str) -> Result<Dataset> {
        let unavailable = |source: anyhow::Error| AnalysisError::DatasetUnavailable {
            identifier: identifier.to_owned(),
            source,
        };
        let content = tokio::fs::read_to_string(identifier)
            .await
            .with_context(|| format!("reading {identifier}"))
            .map_err(unavailable)?;
        let rows = parse_json_lines(&content).map_err(unavailable)?;
        let nb_partitions = self
            .nb_partitions
            .unwrap_or(session.config().target_partitions);
        info!(
            "loaded {} records from {identifier} into {nb_partitions} partitions",
            rows.len()
        );
        session.dataset_from_encoded(
            &table_name_from_path(Path::new(identifier)),
            rows,
            nb_partitions,
        )
    }
}
