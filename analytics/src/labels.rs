//! Tick labels for histogram charts. Rendering only: nothing here influences binning.

use crate::histogram::Histogram;

/// Piecewise-linear interpolation of `values` (given at indices 0..n) at position `x`,
/// clamped to the first and last values outside of the index range.
pub fn interpolate_at_index(values: &[f64], x: f64) -> Option<f64> {
    let last = values.len().checked_sub(1)?;
    if x <= 0.0 {
        return Some(values[0]);
    }
    if x >= last as f64 {
        return Some(values[last]);
    }
    let lower = x.floor() as usize;
    let ratio = x - lower as f64;
    Some(values[lower] * (1.0 - ratio) + values[lower + 1] * ratio)
}

/// Scientific notation with two decimals and a signed, two-digit exponent: `1.75e+00`.
pub fn format_label(value: f64) -> String {
    let formatted = format!("{value:.2e}");
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => match exponent.parse::<i32>() {
            Ok(exponent) => {
                let sign = if exponent < 0 { '-' } else { '+' };
                format!("{mantissa}e{sign}{:02}", exponent.abs())
            }
            Err(_) => formatted,
        },
        None => formatted,
    }
}

/// `number_of_labels` labels spread over the bin edges of the histogram.
///
/// Label `i` sits at position `(n + 1) * i / number_of_labels` on the edge index, `n` being
/// the number of bins.
pub fn tick_labels(histogram: &Histogram, number_of_labels: usize) -> Vec<String> {
    let n = histogram.nb_bins();
    (0..number_of_labels)
        .filter_map(|i| {
            let position = (n + 1) as f64 * i as f64 / number_of_labels as f64;
            interpolate_at_index(&histogram.bin_boundaries, position)
        })
        .map(format_label)
        .collect()
}
