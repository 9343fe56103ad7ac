//! lakestats CLI
//!
//! Loads JSON lines datasets, computes a histogram or a correlation sample, prints the result.
//!
//! Env variables:
//!  - `LAKESTATS_TARGET_PARTITIONS` : parallelism of the plans and partitions per dataset
//!  - `LAKESTATS_SAMPLING_SEED` : fixed seed for reproducible samples
//!  - `RUST_LOG` : log filter, `info` by default

mod input_spec;
mod text_renderer;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use input_spec::InputSpec;
use lakestats_analytics::config::AnalysisConfig;
use lakestats_analytics::loader::{DatasetLoader, JsonLinesLoader};
use lakestats_analytics::render::Renderer;
use lakestats_analytics::{
    AnalysisError, AnalysisSession, JoinInput, ValueSelector, correlate, fit_line, histogram_of,
};
use text_renderer::TextRenderer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(name = "lakestats")]
#[clap(about = "Histograms and correlation samples of keyed datasets", version)]
#[clap(arg_required_else_help(true))]
struct Cli {
    /// Overrides LAKESTATS_TARGET_PARTITIONS
    #[clap(long)]
    target_partitions: Option<usize>,

    /// Overrides LAKESTATS_SAMPLING_SEED
    #[clap(long)]
    sampling_seed: Option<u64>,

    /// Print JSON documents instead of text charts
    #[clap(long, global = true)]
    json: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Histogram of every numeric element of a dataset
    Histogram {
        #[clap(long)]
        input: String,
        /// Field to use when values are mappings
        #[clap(long)]
        field: Option<String>,
        #[clap(long, default_value_t = 100)]
        bins: usize,
        #[clap(long, default_value_t = 10)]
        labels: usize,
    },

    /// Joins 2 or 3 datasets on key and samples the joined values
    Correlate {
        /// PATH[#FIELD[#year]], given 2 or 3 times
        #[clap(long = "input", required = true)]
        inputs: Vec<InputSpec>,
        #[clap(long, default_value_t = 500)]
        points: usize,
        /// Fit a least squares line over the first two dimensions
        #[clap(long)]
        fit_line: bool,
    },
}

fn make_config(args: &Cli) -> Result<AnalysisConfig> {
    let mut config = AnalysisConfig::from_env()?;
    if let Some(target_partitions) = args.target_partitions {
        if target_partitions == 0 {
            anyhow::bail!("--target-partitions should be greater than zero");
        }
        config = config.with_target_partitions(target_partitions);
    }
    if let Some(seed) = args.sampling_seed {
        config = config.with_sampling_seed(seed);
    }
    Ok(config)
}

async fn run(args: Cli, session: &AnalysisSession) -> Result<()> {
    let loader = JsonLinesLoader::default();
    let renderer = TextRenderer { json: args.json };
    match args.command {
        Commands::Histogram {
            input,
            field,
            bins,
            labels,
        } => {
            let dataset = loader.load(session, &input).await?;
            let selector = ValueSelector::from_field_name(field.as_deref());
            let histogram = histogram_of(&dataset, &selector, bins)
                .await
                .with_context(|| format!("histogram of {input}"))?;
            renderer.render_histogram(&histogram, labels)?;
        }
        Commands::Correlate {
            inputs,
            points,
            fit_line: with_fit,
        } => {
            let mut join_inputs = Vec::with_capacity(inputs.len());
            for spec in &inputs {
                let dataset = loader.load(session, &spec.path).await?;
                join_inputs.push(JoinInput {
                    dataset,
                    selector: spec.selector.clone(),
                    validity: spec.validity,
                });
            }
            let sample = correlate(session, &join_inputs, points)
                .await
                .with_context(|| "correlate")?;
            let trend = if with_fit {
                match fit_line(&sample.xy()) {
                    Ok(trend) => Some(trend),
                    Err(e @ AnalysisError::UnderdeterminedFit(_)) => {
                        warn!("no trend line: {e}");
                        None
                    }
                    Err(e) => return Err(e.into()),
                }
            } else {
                None
            };
            renderer.render_sample(&sample, trend.as_ref(), sample.dimensions == 3)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    let session = AnalysisSession::new(make_config(&args)?);
    let result = run(args, &session).await;
    session.close().with_context(|| "closing session")?;
    if result.is_ok() {
        info!("done");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("parse")
    }

    #[test]
    fn test_make_config_from_flags() {
        let args = parse(&[
            "lakestats",
            "--target-partitions",
            "3",
            "--sampling-seed",
            "7",
            "histogram",
            "--input",
            "songs.jsonl",
        ]);
        let config = make_config(&args).expect("config");
        assert_eq!(config.target_partitions, 3);
        assert_eq!(config.sampling_seed, Some(7));
    }

    #[test]
    fn test_make_config_rejects_zero_partitions() {
        let args = parse(&[
            "lakestats",
            "--target-partitions",
            "0",
            "histogram",
            "--input",
            "songs.jsonl",
        ]);
        assert!(make_config(&args).is_err());
    }
}
