//! Distributed fixed-width histogram over the numeric elements of a dataset.
//!
//! Two aggregate passes over the partitions:
//! 1. `numeric_range` reduces min, max and element counts,
//! 2. `make_histogram` counts elements per bin over `[min, max]`.
//!
//! Both accumulators merge commutatively, so the result depends only on the multiset of
//! elements, not on how the records are partitioned or in which order partitions complete.

use crate::dataset::{Dataset, VALUE_COLUMN};
use crate::dfext::histogram::{
    accumulator::bin_edge,
    histogram_udaf::{HistogramArray, make_histo_udaf, selector_literal},
    range::{NumericRange, numeric_range_udaf},
};
use crate::dfext::typed_column::typed_column;
use crate::errors::{AnalysisError, Result};
use crate::flatten::ValueSelector;
use datafusion::arrow::array::{RecordBatch, StructArray};
use datafusion::prelude::*;
use serde::Serialize;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    /// `bin_counts.len() + 1` edges; bin `i` is `[edge_i, edge_i+1)`, the last bin is closed
    pub bin_boundaries: Vec<f64>,
    pub bin_counts: Vec<u64>,
    /// `None` when no element was retained
    pub global_min: Option<f64>,
    pub global_max: Option<f64>,
    /// Elements left out of the bins: `non_numeric_count + unrecognized_shape_count`
    pub filtered_element_count: u64,
    pub non_numeric_count: u64,
    /// Records whose value could not be flattened, one per record
    pub unrecognized_shape_count: u64,
}

impl Histogram {
    pub fn nb_bins(&self) -> usize {
        self.bin_counts.len()
    }

    pub fn retained_count(&self) -> u64 {
        self.bin_counts.iter().sum()
    }

    /// Every element considered, retained or filtered.
    pub fn total_elements(&self) -> u64 {
        self.retained_count() + self.filtered_element_count
    }

    /// Single bin of zero width.
    pub fn is_degenerate(&self) -> bool {
        self.global_min == self.global_max
    }

    fn degenerate(range: &NumericRange, value: f64) -> Self {
        Self {
            bin_boundaries: vec![value, value],
            bin_counts: vec![range.tally.retained],
            global_min: range.bounds().map(|(min, _)| min),
            global_max: range.bounds().map(|(_, max)| max),
            filtered_element_count: range.tally.filtered(),
            non_numeric_count: range.tally.non_numeric,
            unrecognized_shape_count: range.tally.unrecognized,
        }
    }
}

fn single_row_batch(batches: &[RecordBatch], what: &str) -> Result<RecordBatch> {
    let mut rows = batches.iter().filter(|rb| rb.num_rows() > 0);
    match (rows.next(), rows.next()) {
        (Some(rb), None) if rb.num_rows() == 1 => Ok(rb.clone()),
        _ => Err(anyhow::anyhow!("expected {what} to be size 1").into()),
    }
}

/// Min, max and element counts of the selected values, in one distributed reduction.
#[instrument(skip_all, fields(dataset = dataset.name()))]
pub async fn numeric_range(dataset: &Dataset, selector: &ValueSelector) -> Result<NumericRange> {
    let df = dataset.dataframe().aggregate(
        vec![],
        vec![
            numeric_range_udaf()
                .call(vec![selector_literal(selector), col(VALUE_COLUMN)])
                .alias("range"),
        ],
    )?;
    let batches = df.collect().await?;
    let rb = single_row_batch(&batches, "numeric_range")?;
    let column: &StructArray = typed_column(&rb, 0)?;
    let range = NumericRange::from_struct_array(column, 0)?;
    debug!("numeric_range={range:?}");
    Ok(range)
}

/// Histogram of every numeric element of the dataset's values.
///
/// Mapping values can't be flattened without a field: they are counted as unrecognized.
pub async fn histogram(dataset: &Dataset, bin_count: usize) -> Result<Histogram> {
    histogram_of(dataset, &ValueSelector::Whole, bin_count).await
}

/// Histogram of the numeric elements of the selected part of the dataset's values.
#[instrument(skip_all, fields(dataset = dataset.name(), bin_count = bin_count))]
pub async fn histogram_of(
    dataset: &Dataset,
    selector: &ValueSelector,
    bin_count: usize,
) -> Result<Histogram> {
    if bin_count == 0 {
        return Err(AnalysisError::Configuration(
            "bin_count should be greater than zero".into(),
        ));
    }
    let range = numeric_range(dataset, selector).await?;
    let Some((min, max)) = range.bounds() else {
        info!(
            "no numeric element in {}, filtered={}",
            dataset.name(),
            range.tally.filtered()
        );
        return Ok(Histogram::degenerate(&range, 0.0));
    };
    if min == max {
        info!("all numeric elements of {} equal {min}", dataset.name());
        return Ok(Histogram::degenerate(&range, min));
    }

    let df = dataset.dataframe().aggregate(
        vec![],
        vec![
            make_histo_udaf()
                .call(vec![
                    lit(min),
                    lit(max),
                    lit(bin_count as i64),
                    selector_literal(selector),
                    col(VALUE_COLUMN),
                ])
                .alias("histogram"),
        ],
    )?;
    let batches = df.collect().await?;
    let rb = single_row_batch(&batches, "make_histogram")?;
    let histo_array = HistogramArray::try_from(rb.column(0))?;
    let bins = histo_array.get_bins(0)?;
    let bin_counts: Vec<u64> = bins.values().to_vec();
    let binned = histo_array.get_count(0)?;
    if binned != range.tally.retained {
        return Err(anyhow::anyhow!(
            "binned {binned} elements but {} were retained by the range pass",
            range.tally.retained
        )
        .into());
    }

    let bin_boundaries = (0..=bin_count)
        .map(|i| bin_edge(min, max, bin_count, i))
        .collect();
    info!(
        "histogram of {} min={min} max={max} retained={} filtered={}",
        dataset.name(),
        range.tally.retained,
        range.tally.filtered()
    );
    Ok(Histogram {
        bin_boundaries,
        bin_counts,
        global_min: Some(min),
        global_max: Some(max),
        filtered_element_count: range.tally.filtered(),
        non_numeric_count: range.tally.non_numeric,
        unrecognized_shape_count: range.tally.unrecognized,
    })
}
