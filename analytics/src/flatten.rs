//! Normalization of record values into sequences of elements.

use crate::classifier::as_finite_f64;
use crate::record::{Element, RecordValue, ShapeError};

/// Which part of a record value is considered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ValueSelector {
    /// The value itself. Mappings are rejected.
    #[default]
    Whole,
    /// One named field of a mapping value.
    Field(String),
}

impl ValueSelector {
    pub fn field(name: impl Into<String>) -> Self {
        ValueSelector::Field(name.into())
    }

    /// `None` for the whole value, the field name otherwise.
    pub fn field_name(&self) -> Option<&str> {
        match self {
            ValueSelector::Whole => None,
            ValueSelector::Field(name) => Some(name),
        }
    }

    pub fn from_field_name(name: Option<&str>) -> Self {
        match name {
            None => ValueSelector::Whole,
            Some(name) => ValueSelector::field(name),
        }
    }
}

/// Lazily yields the elements of a value, in order. Matrices are yielded row by row.
pub fn flatten<'a>(
    value: &'a RecordValue,
    selector: &ValueSelector,
) -> Result<Box<dyn Iterator<Item = &'a Element> + 'a>, ShapeError> {
    match (value, selector) {
        (RecordValue::Scalar(e), ValueSelector::Whole) => Ok(Box::new(std::iter::once(e))),
        (RecordValue::Sequence(seq), ValueSelector::Whole) => Ok(Box::new(seq.iter())),
        (RecordValue::Matrix(rows), ValueSelector::Whole) => {
            Ok(Box::new(rows.iter().flat_map(|row| row.iter())))
        }
        (RecordValue::Mapping(_), ValueSelector::Whole) => Err(ShapeError::UnselectedMapping),
        (RecordValue::Mapping(fields), ValueSelector::Field(name)) => fields
            .get(name)
            .map(|seq| Box::new(seq.iter()) as Box<dyn Iterator<Item = &'a Element>>)
            .ok_or_else(|| ShapeError::MissingField(name.clone())),
        (_, ValueSelector::Field(_)) => Err(ShapeError::FieldOnNonMapping),
    }
}

/// Outcome of flattening and classifying one or more records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElementTally {
    pub retained: u64,
    pub non_numeric: u64,
    /// Records dropped because their shape could not be interpreted, one per record.
    pub unrecognized: u64,
}

impl ElementTally {
    pub fn merge(&mut self, other: &ElementTally) {
        self.retained += other.retained;
        self.non_numeric += other.non_numeric;
        self.unrecognized += other.unrecognized;
    }

    pub fn filtered(&self) -> u64 {
        self.non_numeric + self.unrecognized
    }

    pub fn total(&self) -> u64 {
        self.retained + self.filtered()
    }
}

/// Decodes a stored value, flattens it and calls `sink` with every numeric element.
pub fn visit_numeric_elements(
    blob: &[u8],
    selector: &ValueSelector,
    tally: &mut ElementTally,
    mut sink: impl FnMut(f64),
) {
    let value = match RecordValue::decode(blob) {
        Ok(value) => value,
        Err(_) => {
            tally.unrecognized += 1;
            return;
        }
    };
    let elements = match flatten(&value, selector) {
        Ok(elements) => elements,
        Err(_) => {
            tally.unrecognized += 1;
            return;
        }
    };
    for element in elements {
        match as_finite_f64(element) {
            Some(v) => {
                tally.retained += 1;
                sink(v);
            }
            None => tally.non_numeric += 1,
        }
    }
}
