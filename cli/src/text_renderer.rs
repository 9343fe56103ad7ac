use anyhow::Result;
use lakestats_analytics::labels::tick_labels;
use lakestats_analytics::render::Renderer;
use lakestats_analytics::{Histogram, JoinedSample, TrendLine};
use std::io::Write;

const BAR_WIDTH: u64 = 50;

/// Prints artifacts on stdout, either as text charts or as JSON documents.
pub struct TextRenderer {
    pub json: bool,
}

fn bar(count: u64, max_count: u64) -> String {
    let width = if max_count == 0 {
        0
    } else {
        (count * BAR_WIDTH).div_ceil(max_count)
    };
    "#".repeat(width as usize)
}

impl Renderer for TextRenderer {
    fn render_histogram(&self, histogram: &Histogram, number_of_labels: usize) -> Result<()> {
        let mut out = std::io::stdout().lock();
        if self.json {
            let document = serde_json::json!({
                "histogram": histogram,
                "labels": tick_labels(histogram, number_of_labels),
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&document)?)?;
            return Ok(());
        }
        let max_count = histogram.bin_counts.iter().copied().max().unwrap_or(0);
        for (index, count) in histogram.bin_counts.iter().enumerate() {
            let begin = histogram.bin_boundaries[index];
            let end = histogram.bin_boundaries[index + 1];
            writeln!(
                out,
                "[{begin:>12.4e}, {end:>12.4e}] {count:>10} {}",
                bar(*count, max_count)
            )?;
        }
        writeln!(out, "ticks: {}", tick_labels(histogram, number_of_labels).join(" "))?;
        writeln!(
            out,
            "retained={} filtered={} (non_numeric={} unrecognized_shape={})",
            histogram.retained_count(),
            histogram.filtered_element_count,
            histogram.non_numeric_count,
            histogram.unrecognized_shape_count
        )?;
        Ok(())
    }

    fn render_sample(
        &self,
        sample: &JoinedSample,
        trend: Option<&TrendLine>,
        three_d: bool,
    ) -> Result<()> {
        let mut out = std::io::stdout().lock();
        if self.json {
            let document = serde_json::json!({ "sample": sample, "trend": trend });
            writeln!(out, "{}", serde_json::to_string_pretty(&document)?)?;
            return Ok(());
        }
        let mut points: Vec<_> = sample.points.iter().collect();
        points.sort_by(|a, b| a.values[0].total_cmp(&b.values[0]));
        let dimensions = (if three_d { 3 } else { 2 }).min(sample.dimensions);
        for point in points {
            let values: Vec<String> = point.values[..dimensions]
                .iter()
                .map(|v| format!("{v:.6}"))
                .collect();
            writeln!(out, "{}\t{}", point.key, values.join("\t"))?;
        }
        writeln!(
            out,
            "sampled {} of {} joined records (fraction {:.6})",
            sample.len(),
            sample.population,
            sample.fraction
        )?;
        if let Some(trend) = trend {
            writeln!(
                out,
                "trend: y = {:.6} * x + {:.6}",
                trend.slope, trend.intercept
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bars_scale_to_the_largest_bin() {
        assert_eq!(bar(0, 10), "");
        assert_eq!(bar(10, 10).len(), BAR_WIDTH as usize);
        assert_eq!(bar(1, 100).len(), 1);
        assert_eq!(bar(0, 0), "");
    }
}
