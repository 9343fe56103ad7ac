//! lakestats analytics: histograms and correlation samples over partitioned keyed datasets.
//!
//! The datasets live in DataFusion in-memory tables; every global statistic is obtained through
//! an aggregate whose partial results merge in any order.

// crate-specific lint exceptions:
#![allow(clippy::missing_errors_doc)]

/// Usable-number test applied to every element
pub mod classifier;
/// Settings of an analysis session
pub mod config;
/// Inner join of datasets and Bernoulli sampling of the result
pub mod correlate;
/// Partitioned keyed datasets
pub mod dataset;
/// DataFusion extensions: aggregate and scalar functions over encoded record values
pub mod dfext;
/// Error taxonomy
pub mod errors;
/// Record values to element sequences
pub mod flatten;
/// Distributed fixed-width histogram
pub mod histogram;
/// Tick labels for histogram charts
pub mod labels;
/// Dataset sources
pub mod loader;
/// Keyed records and value shapes
pub mod record;
/// Sink of the computed artifacts
pub mod render;
/// Execution context of a pipeline run
pub mod session;
/// Least squares line fit
pub mod trend;

pub use correlate::{JoinInput, JoinedSample, SamplePoint, correlate};
pub use dfext::projection::FieldValidity;
pub use errors::{AnalysisError, Result};
pub use flatten::ValueSelector;
pub use histogram::{Histogram, histogram, histogram_of};
pub use record::{Element, Record, RecordValue};
pub use session::AnalysisSession;
pub use trend::{TrendLine, fit_line};
