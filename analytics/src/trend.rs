use crate::errors::{AnalysisError, Result};
use serde::Serialize;

/// `y = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendLine {
    pub slope: f64,
    pub intercept: f64,
}

impl TrendLine {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Ordinary least squares fit of a line through `points`.
///
/// Solves the normal equations of the design matrix `[x, 1]` in closed form, on centered
/// values to limit cancellation.
pub fn fit_line(points: &[(f64, f64)]) -> Result<TrendLine> {
    if points.len() < 2 {
        return Err(AnalysisError::UnderdeterminedFit(format!(
            "at least 2 points are needed, got {}",
            points.len()
        )));
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;
    let (sxx, sxy) = points.iter().fold((0.0, 0.0), |(sxx, sxy), (x, y)| {
        let dx = x - mean_x;
        (sxx + dx * dx, sxy + dx * (y - mean_y))
    });
    if sxx == 0.0 {
        return Err(AnalysisError::UnderdeterminedFit(
            "all points share the same x".into(),
        ));
    }
    let slope = sxy / sxx;
    Ok(TrendLine {
        slope,
        intercept: mean_y - slope * mean_x,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_line() {
        let line = fit_line(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]).expect("fit");
        assert!((line.slope - 1.0).abs() < 1e-12);
        assert!(line.intercept.abs() < 1e-12);
    }

    #[test]
    fn noisy_points() {
        // y = 2x + 1 with symmetric residuals
        let points = [(0.0, 1.5), (1.0, 2.5), (2.0, 5.5), (3.0, 6.5)];
        let line = fit_line(&points).expect("fit");
        assert!((line.slope - 1.8).abs() < 1e-12, "{line:?}");
        assert!((line.intercept - 1.3).abs() < 1e-12, "{line:?}");
        assert!((line.predict(10.0) - 19.3).abs() < 1e-9);
    }

    #[test]
    fn underdetermined() {
        assert!(matches!(
            fit_line(&[(1.0, 2.0)]),
            Err(AnalysisError::UnderdeterminedFit(_))
        ));
        assert!(matches!(
            fit_line(&[]),
            Err(AnalysisError::UnderdeterminedFit(_))
        ));
        assert!(matches!(
            fit_line(&[(3.0, 1.0), (3.0, 2.0), (3.0, 5.0)]),
            Err(AnalysisError::UnderdeterminedFit(_))
        ));
    }
}
