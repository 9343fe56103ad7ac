use std::sync::Arc;

use datafusion::{
    arrow::{
        array::{
            Array, ArrayBuilder, ArrayRef, BinaryArray, ListBuilder, PrimitiveBuilder,
            StructBuilder, UInt64Builder,
        },
        datatypes::{DataType, Field, Float64Type, UInt64Type},
    },
    error::DataFusionError,
    logical_expr::Accumulator,
    scalar::ScalarValue,
};

use super::histogram_udaf::HistogramArray;
use crate::flatten::{ElementTally, ValueSelector, visit_numeric_elements};

/// Counts the numeric elements of encoded record values in fixed-width bins over `[start, end]`.
///
/// Values below `start` land in the first bin, values at or above `end` in the last one.
/// Partial histograms of the same shape merge by summing their bins.
#[derive(Debug)]
pub struct HistogramAccumulator {
    start: f64,
    end: f64,
    selector: ValueSelector,
    count: u64,
    bins: Vec<u64>,
}

impl HistogramAccumulator {
    pub fn new(start: f64, end: f64, nb_bins: usize, selector: ValueSelector) -> Self {
        Self {
            start,
            end,
            selector,
            count: 0,
            bins: vec![0; nb_bins.max(1)],
        }
    }

    /// Index of the bin receiving `v`.
    pub fn bin_index(&self, v: f64) -> usize {
        let nb_bins = self.bins.len();
        let bin_width = bin_width(self.start, self.end, nb_bins);
        if bin_width.is_nan() || bin_width <= 0.0 {
            return 0;
        }
        let offset = v - self.start;
        let position = if offset.is_finite() {
            offset / bin_width
        } else {
            // v and start are both huge: the width is large enough to scale them first
            v / bin_width - self.start / bin_width
        };
        // a negative quotient saturates to 0 in the cast
        let bin_index = position.floor() as usize;
        bin_index.clamp(0, nb_bins - 1)
    }

    pub fn record(&mut self, v: f64) {
        let bin_index = self.bin_index(v);
        self.bins[bin_index] += 1;
        self.count += 1;
    }

    pub fn update_batch_blobs(&mut self, blobs: &BinaryArray) -> datafusion::error::Result<()> {
        let mut tally = ElementTally::default();
        let selector = self.selector.clone();
        for i in 0..blobs.len() {
            if !blobs.is_null(i) {
                visit_numeric_elements(blobs.value(i), &selector, &mut tally, |v| self.record(v));
            }
        }
        Ok(())
    }

    pub fn merge_histograms(
        &mut self,
        histo_array: &HistogramArray,
    ) -> datafusion::error::Result<()> {
        for index_histo in 0..histo_array.len() {
            if histo_array.get_start(index_histo)? != self.start
                || histo_array.get_end(index_histo)? != self.end
            {
                return Err(DataFusionError::Execution(
                    "Error merging incompatible histograms".into(),
                ));
            }
            let bins = histo_array.get_bins(index_histo)?;
            if bins.len() != self.bins.len() {
                return Err(DataFusionError::Execution(
                    "Error merging incompatible histograms".into(),
                ));
            }
            self.count += histo_array.get_count(index_histo)?;
            for (i, bin) in self.bins.iter_mut().enumerate() {
                *bin += bins.value(i);
            }
        }
        Ok(())
    }
}

impl Accumulator for HistogramAccumulator {
    fn update_batch(&mut self, values: &[ArrayRef]) -> datafusion::error::Result<()> {
        // [starts, ends, bin_counts, field_names, values_to_reduce]
        if values.len() != 5 {
            return Err(DataFusionError::Execution(format!(
                "invalid arguments to HistogramAccumulator::update_batch, nb_values={}",
                values.len()
            )));
        }
        let blobs = values[4]
            .as_any()
            .downcast_ref::<BinaryArray>()
            .ok_or_else(|| DataFusionError::Execution("values[4] should be a BinaryArray".into()))?;
        self.update_batch_blobs(blobs)
    }

    fn evaluate(&mut self) -> datafusion::error::Result<ScalarValue> {
        let mut struct_builder = StructBuilder::from_fields(state_arrow_fields(), 1);
        struct_builder
            .field_builder::<PrimitiveBuilder<Float64Type>>(0)
            .ok_or_else(|| DataFusionError::Execution("Error accessing to start builder".into()))?
            .append_value(self.start);
        struct_builder
            .field_builder::<PrimitiveBuilder<Float64Type>>(1)
            .ok_or_else(|| DataFusionError::Execution("Error accessing to end builder".into()))?
            .append_value(self.end);
        struct_builder
            .field_builder::<PrimitiveBuilder<UInt64Type>>(2)
            .ok_or_else(|| DataFusionError::Execution("Error accessing to count builder".into()))?
            .append_value(self.count);

        let bins_builder = struct_builder
            .field_builder::<ListBuilder<Box<dyn ArrayBuilder>>>(3)
            .ok_or_else(|| DataFusionError::Execution("Error accessing to bins builder".into()))?;
        let bin_array_builder = bins_builder
            .values()
            .as_any_mut()
            .downcast_mut::<UInt64Builder>()
            .ok_or_else(|| {
                DataFusionError::Execution("Error accessing to bins array builder".into())
            })?;
        bin_array_builder.append_slice(&self.bins);
        bins_builder.append(true);
        struct_builder.append(true);
        Ok(ScalarValue::Struct(Arc::new(struct_builder.finish())))
    }

    fn size(&self) -> usize {
        size_of_val(self) + size_of_val(self.bins.as_slice())
    }

    fn state(&mut self) -> datafusion::error::Result<Vec<ScalarValue>> {
        Ok(vec![self.evaluate()?])
    }

    fn merge_batch(&mut self, states: &[ArrayRef]) -> datafusion::error::Result<()> {
        for state in states {
            let histo_array: HistogramArray = state.try_into()?;
            self.merge_histograms(&histo_array)?;
        }
        Ok(())
    }
}

/// Width of each of the `nb_bins` bins over `[start, end]`, finite for any finite bounds.
pub fn bin_width(start: f64, end: f64, nb_bins: usize) -> f64 {
    let nb_bins = nb_bins.max(1) as f64;
    end / nb_bins - start / nb_bins
}

/// Edge `index` of `nb_bins` bins over `[start, end]`. The last edge is exactly `end`.
pub fn bin_edge(start: f64, end: f64, nb_bins: usize, index: usize) -> f64 {
    if index >= nb_bins {
        return end;
    }
    let ratio = index as f64 / nb_bins as f64;
    start * (1.0 - ratio) + end * ratio
}

/// Returns the Arrow fields for the histogram state.
pub fn state_arrow_fields() -> Vec<Field> {
    vec![
        Field::new("start", DataType::Float64, false),
        Field::new("end", DataType::Float64, false),
        Field::new("count", DataType::UInt64, false),
        Field::new(
            "bins",
            DataType::List(Arc::new(Field::new("bin", DataType::UInt64, false))),
            false,
        ),
    ]
}
