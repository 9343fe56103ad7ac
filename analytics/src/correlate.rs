//! Inner join of two or three datasets on their keys, followed by a Bernoulli sample of the
//! joined records, collected on the calling process.

use crate::dataset::{Dataset, KEY_COLUMN, VALUE_COLUMN};
use crate::dfext::projection::{FieldValidity, make_project_numeric_udf};
use crate::dfext::sampling::{BernoulliSampler, make_bernoulli_sample_udf};
use crate::dfext::typed_column::typed_column_by_name;
use crate::errors::{AnalysisError, Result};
use crate::flatten::ValueSelector;
use crate::session::AnalysisSession;
use datafusion::arrow::array::{Float64Array, StringArray};
use datafusion::logical_expr::JoinType;
use datafusion::prelude::*;
use serde::Serialize;
use tracing::{debug, info, instrument};

/// One side of the join: a dataset, the part of its values to use, and the validity rule.
#[derive(Debug, Clone)]
pub struct JoinInput {
    pub dataset: Dataset,
    pub selector: ValueSelector,
    pub validity: FieldValidity,
}

impl JoinInput {
    /// Values that are numeric scalars (or sequences, of which the first element is used).
    pub fn whole(dataset: Dataset) -> Self {
        Self {
            dataset,
            selector: ValueSelector::Whole,
            validity: FieldValidity::Numeric,
        }
    }

    /// First element of a named field of mapping values.
    pub fn field(dataset: Dataset, name: impl Into<String>) -> Self {
        Self {
            dataset,
            selector: ValueSelector::field(name),
            validity: FieldValidity::Numeric,
        }
    }

    pub fn with_validity(mut self, validity: FieldValidity) -> Self {
        self.validity = validity;
        self
    }

    fn key_column(index: usize) -> String {
        format!("k{index}")
    }

    fn value_column(index: usize) -> String {
        format!("v{index}")
    }

    /// `(k{index}, v{index})` for the records passing the validity rule.
    fn projected(&self, index: usize) -> Result<DataFrame> {
        let project = make_project_numeric_udf(self.selector.clone(), self.validity);
        let value_column = Self::value_column(index);
        let df = self
            .dataset
            .dataframe()
            .select(vec![
                col(KEY_COLUMN).alias(Self::key_column(index)),
                project
                    .call(vec![col(VALUE_COLUMN)])
                    .alias(value_column.as_str()),
            ])?
            .filter(col(value_column.as_str()).is_not_null())?;
        Ok(df)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplePoint {
    pub key: String,
    /// One value per joined dataset, in input order
    pub values: Vec<f64>,
}

/// Records drawn from a join, each kept independently with probability `fraction`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedSample {
    pub points: Vec<SamplePoint>,
    /// Number of values per point.
    pub dimensions: usize,
    /// Number of joined records the sample was drawn from.
    pub population: usize,
    pub fraction: f64,
    pub seed: u64,
}

impl JoinedSample {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The first two dimensions of every point.
    pub fn xy(&self) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .map(|p| (p.values[0], p.values[1]))
            .collect()
    }
}

/// Fraction of the population to draw so that the expected sample size is `target`.
pub fn sampling_fraction(target_sample_size: usize, population: usize) -> Result<f64> {
    if population == 0 {
        return Err(AnalysisError::DegenerateInput(
            "the join of the inputs is empty".into(),
        ));
    }
    Ok((target_sample_size as f64 / population as f64).min(1.0))
}

/// Joins the inputs on key and collects a Bernoulli sample of expected size `target_sample_size`.
///
/// The realized size is random; exact-size sampling would require a second pass.
#[instrument(skip_all, fields(nb_inputs = inputs.len(), target_sample_size = target_sample_size))]
pub async fn correlate(
    session: &AnalysisSession,
    inputs: &[JoinInput],
    target_sample_size: usize,
) -> Result<JoinedSample> {
    if !(2..=3).contains(&inputs.len()) {
        return Err(AnalysisError::Configuration(format!(
            "correlate expects 2 or 3 datasets, got {}",
            inputs.len()
        )));
    }
    if target_sample_size == 0 {
        return Err(AnalysisError::Configuration(
            "target_sample_size should be greater than zero".into(),
        ));
    }

    let mut joined = inputs[0].projected(0)?;
    for (index, input) in inputs.iter().enumerate().skip(1) {
        let right = input.projected(index)?;
        let left_key = JoinInput::key_column(0);
        let right_key = JoinInput::key_column(index);
        joined = joined.join(
            right,
            JoinType::Inner,
            &[left_key.as_str()],
            &[right_key.as_str()],
            None,
        )?;
    }
    let value_columns: Vec<String> = (0..inputs.len()).map(JoinInput::value_column).collect();
    let mut selection = vec![col(JoinInput::key_column(0)).alias(KEY_COLUMN)];
    selection.extend(value_columns.iter().map(|name| col(name.as_str())));
    let joined = joined.select(selection)?;

    let population = joined.clone().count().await?;
    let fraction = sampling_fraction(target_sample_size, population)?;
    let seed = session.sampling_seed();
    debug!("population={population} fraction={fraction} seed={seed}");

    let sample = make_bernoulli_sample_udf(BernoulliSampler::new(fraction, seed));
    let batches = joined
        .filter(sample.call(vec![col(KEY_COLUMN)]))?
        .collect()
        .await?;

    let mut points = Vec::with_capacity(target_sample_size);
    for rb in &batches {
        let keys: &StringArray = typed_column_by_name(rb, KEY_COLUMN)?;
        let columns = value_columns
            .iter()
            .map(|name| typed_column_by_name::<Float64Array>(rb, name))
            .collect::<anyhow::Result<Vec<_>>>()?;
        for row in 0..rb.num_rows() {
            points.push(SamplePoint {
                key: keys.value(row).to_owned(),
                values: columns.iter().map(|c| c.value(row)).collect(),
            });
        }
    }
    info!(
        "sampled {} of {population} joined records (target {target_sample_size})",
        points.len()
    );
    Ok(JoinedSample {
        points,
        dimensions: inputs.len(),
        population,
        fraction,
        seed,
    })
}
