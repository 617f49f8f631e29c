/// A volatility channel around a moving average.
///
/// Edges are `None` exactly where the underlying average is `None`, and
/// everywhere when the deviation could not be computed.
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    pub upper: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

/// Population-style residual standard deviation over the last `period`
/// samples of the series, measuring each sample against `ma[i]` rather than
/// a single global mean.
///
/// Indices where `ma[i]` is `None` contribute to neither the sum of squares
/// nor the count. With no valid point in the window the result is `NaN`;
/// [`band`] turns that into `None` edges instead of a numeric channel.
pub fn residual_std_dev(values: &[f64], ma: &[Option<f64>], period: usize) -> f64 {
    let start = values.len().saturating_sub(period);
    let mut sum_sq = 0.0;
    let mut count = 0usize;
    for i in start..values.len() {
        if let Some(mean) = ma[i] {
            let residual = values[i] - mean;
            sum_sq += residual * residual;
            count += 1;
        }
    }
    if count == 0 {
        f64::NAN
    } else {
        (sum_sq / count as f64).sqrt()
    }
}

/// Elementwise `ma[i] ± width · std_dev`.
pub fn band(ma: &[Option<f64>], std_dev: f64, width: f64) -> Band {
    let edge = |offset: f64| -> Vec<Option<f64>> {
        ma.iter()
            .map(|m| match m {
                Some(mean) if !std_dev.is_nan() => Some(mean + offset),
                _ => None,
            })
            .collect()
    };
    Band {
        upper: edge(width * std_dev),
        lower: edge(-width * std_dev),
    }
}
