use datafusion::arrow::array::{Array, BooleanBuilder, StringArray};
use datafusion::arrow::datatypes::DataType;
use datafusion::common::{Result, internal_err};
use datafusion::error::DataFusionError;
use datafusion::logical_expr::{
    ColumnarValue, ScalarFunctionArgs, ScalarUDF, ScalarUDFImpl, Signature, Volatility,
};
use std::any::Any;
use std::sync::Arc;
use xxhash_rust::xxh64::xxh64;

const HASH_SPACE: f64 = 18_446_744_073_709_551_616.0; // 2^64

/// Independent per-record inclusion with probability `fraction`.
///
/// The decision for a record is a function of its key and the seed only: a partition recomputed
/// after a failure, or read in a different order, selects exactly the same records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BernoulliSampler {
    /// `None` keeps every record
    threshold: Option<u64>,
    seed: u64,
}

impl BernoulliSampler {
    pub fn new(fraction: f64, seed: u64) -> Self {
        let threshold = if fraction >= 1.0 {
            None
        } else {
            Some((fraction.max(0.0) * HASH_SPACE) as u64)
        };
        Self { threshold, seed }
    }

    pub fn keep(&self, key: &str) -> bool {
        match self.threshold {
            None => true,
            Some(threshold) => xxh64(key.as_bytes(), self.seed) < threshold,
        }
    }
}

/// A scalar UDF returning true for the keys retained by a [`BernoulliSampler`].
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct BernoulliSample {
    signature: Signature,
    sampler: BernoulliSampler,
}

impl BernoulliSample {
    pub fn new(sampler: BernoulliSampler) -> Self {
        Self {
            signature: Signature::exact(vec![DataType::Utf8], Volatility::Immutable),
            sampler,
        }
    }
}

impl ScalarUDFImpl for BernoulliSample {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn name(&self) -> &str {
        "bernoulli_sample"
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn return_type(&self, _args: &[DataType]) -> Result<DataType> {
        Ok(DataType::Boolean)
    }

    fn invoke_with_args(&self, args: ScalarFunctionArgs) -> Result<ColumnarValue> {
        let args = ColumnarValue::values_to_arrays(&args.args)?;
        if args.len() != 1 {
            return internal_err!("wrong number of arguments to bernoulli_sample()");
        }
        let keys = args[0]
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| DataFusionError::Internal("error casting to string array".into()))?;
        let mut builder = BooleanBuilder::with_capacity(keys.len());
        for i in 0..keys.len() {
            builder.append_value(!keys.is_null(i) && self.sampler.keep(keys.value(i)));
        }
        Ok(ColumnarValue::Array(Arc::new(builder.finish())))
    }
}

pub fn make_bernoulli_sample_udf(sampler: BernoulliSampler) -> ScalarUDF {
    ScalarUDF::new_from_impl(BernoulliSample::new(sampler))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_fraction_keeps_everything() {
        let sampler = BernoulliSampler::new(1.0, 42);
        assert!((0..1000).all(|i| sampler.keep(&format!("TR{i:05}"))));
    }

    #[test]
    fn decision_depends_on_key_and_seed_only() {
        let a = BernoulliSampler::new(0.3, 7);
        let b = BernoulliSampler::new(0.3, 7);
        for i in 0..200 {
            let key = format!("TR{i:05}");
            assert_eq!(a.keep(&key), b.keep(&key));
        }
    }

    #[test]
    fn keeps_about_the_requested_fraction() {
        let sampler = BernoulliSampler::new(0.25, 1234);
        let kept = (0..20_000)
            .filter(|i| sampler.keep(&format!("key-{i}")))
            .count();
        // expectation 5000, standard deviation ~61
        assert!((4600..5400).contains(&kept), "kept={kept}");
    }
}
