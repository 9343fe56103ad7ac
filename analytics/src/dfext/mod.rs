/// Aggregate functions building histograms
pub mod histogram;
/// Scalar function projecting one numeric value out of a record
pub mod projection;
/// Scalar function deciding Bernoulli inclusion of a record
pub mod sampling;
/// Access to a RecordBatch's columns
pub mod typed_column;
