use datafusion::arrow::array::{Array, BinaryArray, Float64Builder};
use datafusion::arrow::datatypes::DataType;
use datafusion::common::{Result, internal_err};
use datafusion::error::DataFusionError;
use datafusion::logical_expr::{
    ColumnarValue, ScalarFunctionArgs, ScalarUDF, ScalarUDFImpl, Signature, Volatility,
};
use std::any::Any;
use std::sync::Arc;

use crate::classifier::as_finite_f64;
use crate::flatten::{ValueSelector, flatten};
use crate::record::RecordValue;

/// Rule a projected value must satisfy for its record to take part in a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FieldValidity {
    /// Any finite number.
    #[default]
    Numeric,
    /// A finite number whose integer part is not 0, the marker of an unknown year.
    KnownYear,
}

impl FieldValidity {
    pub fn accept(&self, v: f64) -> bool {
        match self {
            FieldValidity::Numeric => true,
            FieldValidity::KnownYear => v.trunc() != 0.0,
        }
    }
}

/// First element of the selected part of an encoded value, if it is valid.
pub fn project_value(blob: &[u8], selector: &ValueSelector, validity: FieldValidity) -> Option<f64> {
    let value = RecordValue::decode(blob).ok()?;
    let first = flatten(&value, selector).ok()?.next()?;
    as_finite_f64(first).filter(|v| validity.accept(*v))
}

/// A scalar UDF mapping an encoded record value to a nullable Float64.
///
/// Null means the record has no usable value and must be excluded from the join.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ProjectNumeric {
    signature: Signature,
    selector: ValueSelector,
    validity: FieldValidity,
}

impl ProjectNumeric {
    pub fn new(selector: ValueSelector, validity: FieldValidity) -> Self {
        Self {
            signature: Signature::exact(vec![DataType::Binary], Volatility::Immutable),
            selector,
            validity,
        }
    }
}

impl ScalarUDFImpl for ProjectNumeric {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn name(&self) -> &str {
        "project_numeric"
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn return_type(&self, _args: &[DataType]) -> Result<DataType> {
        Ok(DataType::Float64)
    }

    fn invoke_with_args(&self, args: ScalarFunctionArgs) -> Result<ColumnarValue> {
        let args = ColumnarValue::values_to_arrays(&args.args)?;
        if args.len() != 1 {
            return internal_err!("wrong number of arguments to project_numeric()");
        }
        let blobs = args[0]
            .as_any()
            .downcast_ref::<BinaryArray>()
            .ok_or_else(|| DataFusionError::Internal("error casting to binary array".into()))?;
        let mut builder = Float64Builder::with_capacity(blobs.len());
        for i in 0..blobs.len() {
            if blobs.is_null(i) {
                builder.append_null();
            } else {
                builder.append_option(project_value(
                    blobs.value(i),
                    &self.selector,
                    self.validity,
                ));
            }
        }
        Ok(ColumnarValue::Array(Arc::new(builder.finish())))
    }
}

/// Creates the projection function for one join input.
pub fn make_project_numeric_udf(selector: ValueSelector, validity: FieldValidity) -> ScalarUDF {
    ScalarUDF::new_from_impl(ProjectNumeric::new(selector, validity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Element;
    use std::collections::BTreeMap;

    fn song(fields: &[(&str, Vec<Element>)]) -> Vec<u8> {
        let fields: BTreeMap<String, Vec<Element>> = fields
            .iter()
            .map(|(name, seq)| ((*name).to_owned(), seq.clone()))
            .collect();
        RecordValue::Mapping(fields).encode().expect("encode")
    }

    #[test]
    fn projects_first_element_of_field() {
        let blob = song(&[("tempo", vec![Element::Float(121.5), Element::Float(3.0)])]);
        assert_eq!(
            project_value(&blob, &ValueSelector::field("tempo"), FieldValidity::Numeric),
            Some(121.5)
        );
        assert_eq!(
            project_value(&blob, &ValueSelector::field("year"), FieldValidity::Numeric),
            None
        );
    }

    #[test]
    fn rejects_unknown_year_and_text() {
        let unknown = song(&[("year", vec![Element::Integer(0)])]);
        let known = song(&[("year", vec![Element::Integer(1987)])]);
        let text = song(&[("song_hotttnesss", vec![Element::Text("nan".into())])]);
        let year = ValueSelector::field("year");
        assert_eq!(project_value(&unknown, &year, FieldValidity::KnownYear), None);
        assert_eq!(project_value(&unknown, &year, FieldValidity::Numeric), Some(0.0));
        assert_eq!(
            project_value(&known, &year, FieldValidity::KnownYear),
            Some(1987.0)
        );
        assert_eq!(
            project_value(
                &text,
                &ValueSelector::field("song_hotttnesss"),
                FieldValidity::Numeric
            ),
            None
        );
    }
}
