use crate::errors::{AnalysisError, Result};
use crate::record::Record;
use datafusion::{
    arrow::{
        array::{ArrayRef, BinaryBuilder, RecordBatch, StringBuilder},
        datatypes::{DataType, Field, Schema, SchemaRef},
    },
    catalog::MemTable,
    prelude::*,
};
use std::collections::HashSet;
use std::sync::Arc;

pub const KEY_COLUMN: &str = "key";
pub const VALUE_COLUMN: &str = "value";

/// Arrow schema shared by every dataset: a text key and a CBOR-encoded value.
pub fn dataset_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(KEY_COLUMN, DataType::Utf8, false),
        Field::new(VALUE_COLUMN, DataType::Binary, false),
    ]))
}

/// An immutable, partitioned collection of keyed records.
///
/// Cloning is cheap: the partitions are shared, only the logical plan is copied.
#[derive(Clone)]
pub struct Dataset {
    name: String,
    df: DataFrame,
    nb_partitions: usize,
}

impl std::fmt::Debug for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("name", &self.name)
            .field("nb_partitions", &self.nb_partitions)
            .finish()
    }
}

impl Dataset {
    pub(crate) fn new(name: String, df: DataFrame, nb_partitions: usize) -> Self {
        Self {
            name,
            df,
            nb_partitions,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nb_partitions(&self) -> usize {
        self.nb_partitions
    }

    /// Logical plan scanning the dataset, with columns `key` and `value`.
    pub fn dataframe(&self) -> DataFrame {
        self.df.clone()
    }

    /// Number of records.
    pub async fn count(&self) -> Result<usize> {
        Ok(self.df.clone().count().await?)
    }
}

/// Rows already encoded for storage: `(key, cbor_value)`.
pub type EncodedRow = (String, Vec<u8>);

fn make_batch(schema: &SchemaRef, rows: &[EncodedRow]) -> Result<RecordBatch> {
    let mut keys = StringBuilder::new();
    let mut values = BinaryBuilder::new();
    for (key, value) in rows {
        keys.append_value(key);
        values.append_value(value);
    }
    let columns: Vec<ArrayRef> = vec![Arc::new(keys.finish()), Arc::new(values.finish())];
    Ok(RecordBatch::try_new(schema.clone(), columns)?)
}

/// Builds the partitioned table holding `partitions`, one record batch per partition.
pub(crate) fn make_mem_table(partitions: &[Vec<EncodedRow>]) -> Result<MemTable> {
    let schema = dataset_schema();
    let mut seen = HashSet::new();
    let mut batches = Vec::with_capacity(partitions.len().max(1));
    for rows in partitions {
        for (key, _) in rows {
            if !seen.insert(key.as_str()) {
                return Err(AnalysisError::Configuration(format!(
                    "duplicate key {key} in dataset"
                )));
            }
        }
        batches.push(vec![make_batch(&schema, rows)?]);
    }
    if batches.is_empty() {
        batches.push(vec![make_batch(&schema, &[])?]);
    }
    Ok(MemTable::try_new(schema, batches)?)
}

/// Splits rows into `nb_partitions` contiguous chunks of similar size.
pub(crate) fn split_rows(rows: Vec<EncodedRow>, nb_partitions: usize) -> Vec<Vec<EncodedRow>> {
    let nb_partitions = nb_partitions.max(1);
    let base = rows.len() / nb_partitions;
    let remainder = rows.len() % nb_partitions;
    let mut rows = rows.into_iter();
    (0..nb_partitions)
        .map(|index| {
            let size = base + usize::from(index < remainder);
            rows.by_ref().take(size).collect()
        })
        .collect()
}

pub(crate) fn encode_records(records: impl IntoIterator<Item = Record>) -> Result<Vec<EncodedRow>> {
    records
        .into_iter()
        .map(|record| {
            let blob = record
                .value
                .encode()
                .map_err(AnalysisError::Encoding)?;
            Ok((record.key, blob))
        })
        .collect()
}
