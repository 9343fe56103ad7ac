/// Histogram aggregate function over encoded record values
pub mod histogram_udaf;

/// Histogram accumulation
pub mod accumulator;

/// Min, max & element counts in a single aggregate
pub mod range;
