use datafusion::{
    arrow::{
        array::{Array, ArrayRef, Float64Array, ListArray, StructArray, UInt64Array},
        datatypes::{DataType, Fields},
    },
    error::DataFusionError,
    logical_expr::{Accumulator, AggregateUDF, Volatility, function::AccumulatorArgs},
    physical_plan::expressions::Literal,
    prelude::*,
    scalar::ScalarValue,
};
use std::sync::Arc;

use super::accumulator::{HistogramAccumulator, state_arrow_fields};
use crate::flatten::ValueSelector;

/// An array of histograms.
#[derive(Debug)]
pub struct HistogramArray {
    inner: Arc<StructArray>,
}

impl HistogramArray {
    pub fn new(inner: Arc<StructArray>) -> Self {
        Self { inner }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn f64_column(&self, index: usize) -> Result<&Float64Array, DataFusionError> {
        self.inner
            .column(index)
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| DataFusionError::Execution("downcasting to Float64Array".into()))
    }

    pub fn get_start(&self, index: usize) -> Result<f64, DataFusionError> {
        Ok(self.f64_column(0)?.value(index))
    }

    pub fn get_end(&self, index: usize) -> Result<f64, DataFusionError> {
        Ok(self.f64_column(1)?.value(index))
    }

    pub fn get_count(&self, index: usize) -> Result<u64, DataFusionError> {
        let counts = self
            .inner
            .column(2)
            .as_any()
            .downcast_ref::<UInt64Array>()
            .ok_or_else(|| DataFusionError::Execution("downcasting to UInt64Array".into()))?;
        Ok(counts.value(index))
    }

    pub fn get_bins(&self, index: usize) -> Result<UInt64Array, DataFusionError> {
        let bins_list = self
            .inner
            .column(3)
            .as_any()
            .downcast_ref::<ListArray>()
            .ok_or_else(|| DataFusionError::Execution("downcasting to ListArray".into()))?;
        let bins = bins_list.value(index);
        let bins = bins
            .as_any()
            .downcast_ref::<UInt64Array>()
            .ok_or_else(|| DataFusionError::Execution("downcasting to UInt64Array".into()))?;
        Ok(bins.clone())
    }
}

impl TryFrom<&ArrayRef> for HistogramArray {
    type Error = DataFusionError;

    fn try_from(value: &ArrayRef) -> Result<Self, Self::Error> {
        let struct_array = value
            .as_any()
            .downcast_ref::<StructArray>()
            .ok_or_else(|| DataFusionError::Execution("downcasting to StructArray".into()))?;
        Ok(Self::new(Arc::new(struct_array.clone())))
    }
}

/// Value of the literal passed as argument `index` of an aggregate call.
pub(crate) fn literal_arg<'a>(
    args: &'a AccumulatorArgs,
    index: usize,
) -> Result<&'a ScalarValue, DataFusionError> {
    Ok(args
        .exprs
        .get(index)
        .ok_or_else(|| DataFusionError::Execution(format!("Reading argument {index}")))?
        .as_any()
        .downcast_ref::<Literal>()
        .ok_or_else(|| {
            DataFusionError::Execution(format!("Downcasting argument {index} to Literal"))
        })?
        .value())
}

/// Field selection passed as a Utf8 literal, null meaning the whole value.
pub(crate) fn selector_arg(
    args: &AccumulatorArgs,
    index: usize,
) -> Result<ValueSelector, DataFusionError> {
    match literal_arg(args, index)? {
        ScalarValue::Utf8(name) => Ok(ValueSelector::from_field_name(name.as_deref())),
        other => Err(DataFusionError::Execution(format!(
            "arg {index} should be a utf8, found {other:?}"
        ))),
    }
}

/// Literal used to pass a selector to the aggregate functions.
pub fn selector_literal(selector: &ValueSelector) -> Expr {
    lit(ScalarValue::Utf8(selector.field_name().map(str::to_owned)))
}

fn make_state(args: AccumulatorArgs) -> Result<Box<dyn Accumulator>, DataFusionError> {
    let start = match literal_arg(&args, 0)? {
        ScalarValue::Float64(Some(start)) => *start,
        other => {
            return Err(DataFusionError::Execution(format!(
                "arg 0 should be a float64, found {other:?}"
            )));
        }
    };
    let end = match literal_arg(&args, 1)? {
        ScalarValue::Float64(Some(end)) => *end,
        other => {
            return Err(DataFusionError::Execution(format!(
                "arg 1 should be a float64, found {other:?}"
            )));
        }
    };
    let nb_bins = match literal_arg(&args, 2)? {
        ScalarValue::Int64(Some(nb_bins)) if *nb_bins > 0 => *nb_bins as usize,
        other => {
            return Err(DataFusionError::Execution(format!(
                "arg 2 should be a positive int64, found {other:?}"
            )));
        }
    };
    let selector = selector_arg(&args, 3)?;
    Ok(Box::new(HistogramAccumulator::new(
        start, end, nb_bins, selector,
    )))
}

pub fn make_histogram_arrow_type() -> DataType {
    DataType::Struct(Fields::from(state_arrow_fields()))
}

/// Creates a user-defined aggregate function to compute histograms of encoded record values.
///
/// `make_histogram(start, end, nb_bins, field_name, value)`
pub fn make_histo_udaf() -> AggregateUDF {
    create_udaf(
        "make_histogram",
        vec![
            DataType::Float64,
            DataType::Float64,
            DataType::Int64,
            DataType::Utf8,
            DataType::Binary,
        ],
        Arc::new(make_histogram_arrow_type()),
        Volatility::Immutable,
        Arc::new(&make_state),
        Arc::new(vec![make_histogram_arrow_type()]),
    )
}
