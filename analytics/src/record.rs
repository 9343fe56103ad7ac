//! Keyed records and the closed set of value shapes they can hold.
//!
//! Inside a dataset, a value is stored as a CBOR blob. Decoding goes through [`RecordValue::decode`],
//! which dispatches on the CBOR structure and rejects anything that is not one of the four shapes.

use anyhow::Result;
use ciborium::value::{Integer, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// One element of a record value, before classification.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Integer(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Null,
}

impl From<f64> for Element {
    fn from(value: f64) -> Self {
        Element::Float(value)
    }
}

impl From<i64> for Element {
    fn from(value: i64) -> Self {
        Element::Integer(value)
    }
}

impl From<&str> for Element {
    fn from(value: &str) -> Self {
        Element::Text(value.to_owned())
    }
}

/// Value of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    Scalar(Element),
    Sequence(Vec<Element>),
    Matrix(Vec<Vec<Element>>),
    /// Named fields, each holding a sequence. Never flattened without a field selection.
    Mapping(BTreeMap<String, Vec<Element>>),
}

/// A value that can't be interpreted, or a selection that doesn't apply to it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("undecodable value: {0}")]
    Undecodable(String),
    #[error("unsupported value shape: {0}")]
    Unsupported(&'static str),
    #[error("mapping value requires a field selection")]
    UnselectedMapping,
    #[error("field {0} not found in mapping")]
    MissingField(String),
    #[error("field selection applied to a value that is not a mapping")]
    FieldOnNonMapping,
}

/// Keyed record. Keys are unique within a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub key: String,
    pub value: RecordValue,
}

impl Record {
    pub fn new(key: impl Into<String>, value: RecordValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    pub fn scalar(key: impl Into<String>, value: impl Into<Element>) -> Self {
        Self::new(key, RecordValue::Scalar(value.into()))
    }

    pub fn sequence<E: Into<Element>>(
        key: impl Into<String>,
        values: impl IntoIterator<Item = E>,
    ) -> Self {
        Self::new(
            key,
            RecordValue::Sequence(values.into_iter().map(Into::into).collect()),
        )
    }
}

fn element_from_cbor(value: &Value) -> Option<Element> {
    match value {
        Value::Integer(i) => {
            let wide = i128::from(*i);
            Some(match i64::try_from(wide) {
                Ok(narrow) => Element::Integer(narrow),
                Err(_) => Element::Float(wide as f64),
            })
        }
        Value::Float(f) => Some(Element::Float(*f)),
        Value::Text(s) => Some(Element::Text(s.clone())),
        Value::Bool(b) => Some(Element::Bool(*b)),
        Value::Null => Some(Element::Null),
        _ => None,
    }
}

fn element_to_cbor(element: &Element) -> Value {
    match element {
        Element::Integer(i) => Value::Integer(Integer::from(*i)),
        Element::Float(f) => Value::Float(*f),
        Element::Text(s) => Value::Text(s.clone()),
        Element::Bool(b) => Value::Bool(*b),
        Element::Null => Value::Null,
    }
}

fn scalars_from_cbor(items: &[Value]) -> Option<Vec<Element>> {
    items.iter().map(element_from_cbor).collect()
}

fn sequence_from_cbor(items: &[Value]) -> std::result::Result<RecordValue, ShapeError> {
    if let Some(elements) = scalars_from_cbor(items) {
        return Ok(RecordValue::Sequence(elements));
    }
    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Array(row) => rows.push(
                scalars_from_cbor(row)
                    .ok_or(ShapeError::Unsupported("nested deeper than a matrix"))?,
            ),
            _ => return Err(ShapeError::Unsupported("array mixing scalars and arrays")),
        }
    }
    Ok(RecordValue::Matrix(rows))
}

fn mapping_from_cbor(entries: &[(Value, Value)]) -> std::result::Result<RecordValue, ShapeError> {
    let mut fields = BTreeMap::new();
    for (name, value) in entries {
        let Value::Text(name) = name else {
            return Err(ShapeError::Unsupported("mapping with a non-text field name"));
        };
        let sequence = match value {
            Value::Array(items) => scalars_from_cbor(items)
                .ok_or(ShapeError::Unsupported("mapping field that is not a sequence"))?,
            scalar => vec![
                element_from_cbor(scalar)
                    .ok_or(ShapeError::Unsupported("mapping field that is not a sequence"))?,
            ],
        };
        fields.insert(name.clone(), sequence);
    }
    Ok(RecordValue::Mapping(fields))
}

impl RecordValue {
    /// Interprets a CBOR value as one of the four shapes.
    pub fn from_cbor(value: &Value) -> std::result::Result<Self, ShapeError> {
        match value {
            Value::Array(items) => sequence_from_cbor(items),
            Value::Map(entries) => mapping_from_cbor(entries),
            Value::Bytes(_) => Err(ShapeError::Unsupported("byte string")),
            Value::Tag(_, _) => Err(ShapeError::Unsupported("tagged value")),
            scalar => element_from_cbor(scalar)
                .map(RecordValue::Scalar)
                .ok_or(ShapeError::Unsupported("unknown cbor item")),
        }
    }

    pub fn to_cbor(&self) -> Value {
        match self {
            RecordValue::Scalar(e) => element_to_cbor(e),
            RecordValue::Sequence(seq) => Value::Array(seq.iter().map(element_to_cbor).collect()),
            RecordValue::Matrix(rows) => Value::Array(
                rows.iter()
                    .map(|row| Value::Array(row.iter().map(element_to_cbor).collect()))
                    .collect(),
            ),
            RecordValue::Mapping(fields) => Value::Map(
                fields
                    .iter()
                    .map(|(name, seq)| {
                        (
                            Value::Text(name.clone()),
                            Value::Array(seq.iter().map(element_to_cbor).collect()),
                        )
                    })
                    .collect(),
            ),
        }
    }

    /// Decodes a blob stored in a dataset's `value` column.
    pub fn decode(bytes: &[u8]) -> std::result::Result<Self, ShapeError> {
        let value: Value =
            ciborium::from_reader(bytes).map_err(|e| ShapeError::Undecodable(e.to_string()))?;
        Self::from_cbor(&value)
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        encode_cbor(&self.to_cbor())
    }
}

/// Encodes a serializable object into CBOR format.
pub fn encode_cbor<T: serde::Serialize>(obj: &T) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(obj, &mut bytes)?;
    Ok(bytes)
}
