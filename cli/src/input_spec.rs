use anyhow::Result;
use lakestats_analytics::{FieldValidity, ValueSelector};
use std::str::FromStr;

/// `PATH[#FIELD[#year]]`: a dataset file, the field to project and its validity rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSpec {
    pub path: String,
    pub selector: ValueSelector,
    pub validity: FieldValidity,
}

impl FromStr for InputSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split('#');
        let path = parts.next().unwrap_or_default();
        if path.is_empty() {
            anyhow::bail!("missing path in input {s:?}");
        }
        let selector = match parts.next() {
            None => ValueSelector::Whole,
            Some("") => anyhow::bail!("empty field name in input {s:?}"),
            Some(field) => ValueSelector::field(field),
        };
        let validity = match parts.next() {
            None => FieldValidity::Numeric,
            Some("year") => FieldValidity::KnownYear,
            Some(other) => anyhow::bail!("unknown validity rule {other:?}, expected \"year\""),
        };
        if parts.next().is_some() {
            anyhow::bail!("too many '#' separators in input {s:?}");
        }
        Ok(Self {
            path: path.to_owned(),
            selector,
            validity,
        })
    }
}
