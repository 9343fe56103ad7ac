use crate::correlate::JoinedSample;
use crate::histogram::Histogram;
use crate::trend::TrendLine;

/// Sink of the computed artifacts. Nothing it returns is consumed by the analysis.
pub trait Renderer {
    fn render_histogram(&self, histogram: &Histogram, number_of_labels: usize)
    -> anyhow::Result<()>;

    /// `three_d` asks for the third dimension of the points to be drawn as well.
    fn render_sample(
        &self,
        sample: &JoinedSample,
        trend: Option<&TrendLine>,
        three_d: bool,
    ) -> anyhow::Result<()>;
}
