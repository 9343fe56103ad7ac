use std::sync::Arc;

use datafusion::{
    arrow::{
        array::{
            Array, ArrayRef, BinaryArray, Float64Array, PrimitiveBuilder, StructArray,
            StructBuilder, UInt64Array,
        },
        datatypes::{DataType, Field, Fields, Float64Type, UInt64Type},
    },
    error::DataFusionError,
    logical_expr::{Accumulator, AggregateUDF, Volatility, function::AccumulatorArgs},
    prelude::*,
    scalar::ScalarValue,
};

use super::histogram_udaf::selector_arg;
use crate::flatten::{ElementTally, ValueSelector, visit_numeric_elements};

/// Global extent of the numeric elements of a dataset, with the tally of rejected elements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRange {
    /// `f64::MAX` when no element was retained
    pub min: f64,
    /// `f64::MIN` when no element was retained
    pub max: f64,
    pub tally: ElementTally,
}

impl Default for NumericRange {
    fn default() -> Self {
        Self {
            min: f64::MAX,
            max: f64::MIN,
            tally: ElementTally::default(),
        }
    }
}

impl NumericRange {
    pub fn merge(&mut self, other: &NumericRange) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.tally.merge(&other.tally);
    }

    /// `(min, max)` of the retained elements, if any.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        (self.tally.retained > 0).then_some((self.min, self.max))
    }

    /// Reads row `index` of a `numeric_range` result column.
    pub fn from_struct_array(array: &StructArray, index: usize) -> Result<Self, DataFusionError> {
        let f64_column = |i: usize| {
            array
                .column(i)
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| DataFusionError::Execution("downcasting to Float64Array".into()))
        };
        let u64_column = |i: usize| {
            array
                .column(i)
                .as_any()
                .downcast_ref::<UInt64Array>()
                .ok_or_else(|| DataFusionError::Execution("downcasting to UInt64Array".into()))
        };
        Ok(Self {
            min: f64_column(0)?.value(index),
            max: f64_column(1)?.value(index),
            tally: ElementTally {
                retained: u64_column(2)?.value(index),
                non_numeric: u64_column(3)?.value(index),
                unrecognized: u64_column(4)?.value(index),
            },
        })
    }
}

/// First pass of the histogram: min, max and element counts in one reduction.
#[derive(Debug)]
pub struct NumericRangeAccumulator {
    selector: ValueSelector,
    range: NumericRange,
}

impl NumericRangeAccumulator {
    pub fn new(selector: ValueSelector) -> Self {
        Self {
            selector,
            range: NumericRange::default(),
        }
    }

    pub fn update_batch_blobs(&mut self, blobs: &BinaryArray) {
        let NumericRange { min, max, tally } = &mut self.range;
        for i in 0..blobs.len() {
            if !blobs.is_null(i) {
                visit_numeric_elements(blobs.value(i), &self.selector, tally, |v| {
                    *min = min.min(v);
                    *max = max.max(v);
                });
            }
        }
    }
}

impl Accumulator for NumericRangeAccumulator {
    fn update_batch(&mut self, values: &[ArrayRef]) -> datafusion::error::Result<()> {
        // [field_names, values_to_reduce]
        if values.len() != 2 {
            return Err(DataFusionError::Execution(format!(
                "invalid arguments to NumericRangeAccumulator::update_batch, nb_values={}",
                values.len()
            )));
        }
        let blobs = values[1]
            .as_any()
            .downcast_ref::<BinaryArray>()
            .ok_or_else(|| DataFusionError::Execution("values[1] should be a BinaryArray".into()))?;
        self.update_batch_blobs(blobs);
        Ok(())
    }

    fn evaluate(&mut self) -> datafusion::error::Result<ScalarValue> {
        let mut struct_builder = StructBuilder::from_fields(range_arrow_fields(), 1);
        let f64_values = [self.range.min, self.range.max];
        for (index, value) in f64_values.into_iter().enumerate() {
            struct_builder
                .field_builder::<PrimitiveBuilder<Float64Type>>(index)
                .ok_or_else(|| {
                    DataFusionError::Execution(format!("Error accessing to builder {index}"))
                })?
                .append_value(value);
        }
        let tally = &self.range.tally;
        let u64_values = [tally.retained, tally.non_numeric, tally.unrecognized];
        for (offset, value) in u64_values.into_iter().enumerate() {
            let index = f64_values.len() + offset;
            struct_builder
                .field_builder::<PrimitiveBuilder<UInt64Type>>(index)
                .ok_or_else(|| {
                    DataFusionError::Execution(format!("Error accessing to builder {index}"))
                })?
                .append_value(value);
        }
        struct_builder.append(true);
        Ok(ScalarValue::Struct(Arc::new(struct_builder.finish())))
    }

    fn size(&self) -> usize {
        size_of_val(self)
    }

    fn state(&mut self) -> datafusion::error::Result<Vec<ScalarValue>> {
        Ok(vec![self.evaluate()?])
    }

    fn merge_batch(&mut self, states: &[ArrayRef]) -> datafusion::error::Result<()> {
        for state in states {
            let struct_array = state
                .as_any()
                .downcast_ref::<StructArray>()
                .ok_or_else(|| DataFusionError::Execution("downcasting to StructArray".into()))?;
            for index in 0..struct_array.len() {
                let partial = NumericRange::from_struct_array(struct_array, index)?;
                self.range.merge(&partial);
            }
        }
        Ok(())
    }
}

pub fn range_arrow_fields() -> Vec<Field> {
    vec![
        Field::new("min", DataType::Float64, false),
        Field::new("max", DataType::Float64, false),
        Field::new("retained", DataType::UInt64, false),
        Field::new("non_numeric", DataType::UInt64, false),
        Field::new("unrecognized", DataType::UInt64, false),
    ]
}

pub fn make_range_arrow_type() -> DataType {
    DataType::Struct(Fields::from(range_arrow_fields()))
}

fn make_range_state(args: AccumulatorArgs) -> Result<Box<dyn Accumulator>, DataFusionError> {
    Ok(Box::new(NumericRangeAccumulator::new(selector_arg(
        &args, 0,
    )?)))
}

/// Creates a user-defined aggregate function measuring the numeric elements of encoded values.
///
/// `numeric_range(field_name, value)`
pub fn numeric_range_udaf() -> AggregateUDF {
    create_udaf(
        "numeric_range",
        vec![DataType::Utf8, DataType::Binary],
        Arc::new(make_range_arrow_type()),
        Volatility::Immutable,
        Arc::new(&make_range_state),
        Arc::new(vec![make_range_arrow_type()]),
    )
}
