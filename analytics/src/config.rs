use anyhow::{Context, Result};

/// Env variable overriding the number of partitions used by DataFusion plans.
pub const TARGET_PARTITIONS_ENV: &str = "LAKESTATS_TARGET_PARTITIONS";
/// Env variable fixing the seed of the Bernoulli sampler.
pub const SAMPLING_SEED_ENV: &str = "LAKESTATS_SAMPLING_SEED";

/// Settings of an [`crate::session::AnalysisSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Parallelism of the execution plans, and default partition count of in-memory datasets.
    pub target_partitions: usize,
    /// When set, every call to `correlate` draws the same sample for the same input.
    pub sampling_seed: Option<u64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            target_partitions: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            sampling_seed: None,
        }
    }
}

impl AnalysisConfig {
    /// Defaults overridden by `LAKESTATS_TARGET_PARTITIONS` and `LAKESTATS_SAMPLING_SEED`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(value) = std::env::var(TARGET_PARTITIONS_ENV) {
            config.target_partitions = value
                .parse()
                .with_context(|| format!("parsing {TARGET_PARTITIONS_ENV}={value}"))?;
        }
        if let Ok(value) = std::env::var(SAMPLING_SEED_ENV) {
            config.sampling_seed = Some(
                value
                    .parse()
                    .with_context(|| format!("parsing {SAMPLING_SEED_ENV}={value}"))?,
            );
        }
        if config.target_partitions == 0 {
            anyhow::bail!("{TARGET_PARTITIONS_ENV} should be greater than zero");
        }
        Ok(config)
    }

    pub fn with_target_partitions(mut self, target_partitions: usize) -> Self {
        self.target_partitions = target_partitions;
        self
    }

    pub fn with_sampling_seed(mut self, seed: u64) -> Self {
        self.sampling_seed = Some(seed);
        self
    }
}
