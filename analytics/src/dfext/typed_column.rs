use anyhow::{Context, Result};
use datafusion::arrow::array::RecordBatch;

/// Column of a record batch, downcast to its concrete array type.
pub fn typed_column_by_name<'a, T: core::any::Any>(
    rb: &'a RecordBatch,
    column_name: &str,
) -> Result<&'a T> {
    let column = rb
        .column_by_name(column_name)
        .with_context(|| format!("getting column {column_name}"))?;
    column
        .as_any()
        .downcast_ref::<T>()
        .with_context(|| format!("casting {column_name}: {:?}", column.data_type()))
}

pub fn typed_column<T: core::any::Any>(rb: &RecordBatch, index: usize) -> Result<&T> {
    let column = rb
        .columns()
        .get(index)
        .with_context(|| format!("getting column {index}"))?;
    column
        .as_any()
        .downcast_ref::<T>()
        .with_context(|| format!("casting {index}: {:?}", column.data_type()))
}
