use crate::config::AnalysisConfig;
use crate::dataset::{Dataset, EncodedRow, encode_records, make_mem_table, split_rows};
use crate::errors::Result;
use crate::record::Record;
use datafusion::prelude::*;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// Explicit execution context of a pipeline run.
///
/// Every dataset is registered in the session's DataFusion context under its name, and every
/// operation runs its plans there. [`AnalysisSession::close`] releases the tables.
pub struct AnalysisSession {
    ctx: SessionContext,
    config: AnalysisConfig,
    tables: Mutex<Vec<String>>,
}

impl AnalysisSession {
    pub fn new(config: AnalysisConfig) -> Self {
        let session_config = SessionConfig::new().with_target_partitions(config.target_partitions);
        info!(
            "creating analysis session target_partitions={} sampling_seed={:?}",
            config.target_partitions, config.sampling_seed
        );
        Self {
            ctx: SessionContext::new_with_config(session_config),
            config,
            tables: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Seed for one sampling pass: the configured one, or a fresh random seed.
    pub fn sampling_seed(&self) -> u64 {
        self.config.sampling_seed.unwrap_or_else(rand::random)
    }

    /// Runs a SQL query over the registered datasets.
    pub async fn sql(&self, query: &str) -> Result<DataFrame> {
        Ok(self.ctx.sql(query).await?)
    }

    /// Creates a dataset split into `target_partitions` partitions.
    pub fn dataset_from_records(
        &self,
        name: &str,
        records: impl IntoIterator<Item = Record>,
    ) -> Result<Dataset> {
        let rows = encode_records(records)?;
        self.dataset_from_encoded(name, rows, self.config.target_partitions)
    }

    /// Creates a dataset with an explicit partitioning.
    pub fn dataset_from_partitions(
        &self,
        name: &str,
        partitions: Vec<Vec<Record>>,
    ) -> Result<Dataset> {
        let partitions = partitions
            .into_iter()
            .map(encode_records)
            .collect::<Result<Vec<_>>>()?;
        self.register(name, partitions)
    }

    /// Creates a dataset from rows whose values are already CBOR blobs.
    pub fn dataset_from_encoded(
        &self,
        name: &str,
        rows: Vec<EncodedRow>,
        nb_partitions: usize,
    ) -> Result<Dataset> {
        self.register(name, split_rows(rows, nb_partitions))
    }

    /// Registers the partitions under `name`, or `name_2`, `name_3`... when it is already taken.
    fn register(&self, name: &str, partitions: Vec<Vec<EncodedRow>>) -> Result<Dataset> {
        let nb_rows: usize = partitions.iter().map(Vec::len).sum();
        let table = Arc::new(make_mem_table(&partitions)?);
        let nb_partitions = partitions.len().max(1);
        let table_name = {
            let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
            let table_name = unique_table_name(name, &tables);
            self.ctx.register_table(table_name.as_str(), table.clone())?;
            tables.push(table_name.clone());
            table_name
        };
        debug!("registered dataset {table_name} nb_rows={nb_rows} nb_partitions={nb_partitions}");
        let df = self.ctx.read_table(table)?;
        Ok(Dataset::new(table_name, df, nb_partitions))
    }

    /// Deregisters every dataset. Plans already built keep their data alive until dropped.
    pub fn close(self) -> Result<()> {
        let tables = self
            .tables
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        for name in &tables {
            self.ctx.deregister_table(name.as_str())?;
        }
        info!("closed analysis session, released {} tables", tables.len());
        Ok(())
    }
}

fn unique_table_name(name: &str, taken: &[String]) -> String {
    let is_taken = |candidate: &str| taken.iter().any(|t| t == candidate);
    if !is_taken(name) {
        return name.to_owned();
    }
    (2..)
        .map(|suffix| format!("{name}_{suffix}"))
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_else(|| name.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_table_name() {
        let taken = vec!["songs".to_owned(), "songs_2".to_owned()];
        assert_eq!(unique_table_name("tempo", &taken), "tempo");
        assert_eq!(unique_table_name("songs", &taken), "songs_3");
        assert_eq!(unique_table_name("songs_2", &taken), "songs_2_2");
    }
}
