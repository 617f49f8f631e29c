/// Simple moving average over a trailing window.
///
/// The output is index-parallel to the input: `None` until a full window of
/// history exists (`i < period - 1`), the arithmetic mean of
/// `values[i-period+1..=i]` after that. A `period` of zero or one longer
/// than the series yields all `None` rather than an error.
pub fn moving_average(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 || period > values.len() {
        return vec![None; values.len()];
    }

    let mut out = vec![None; values.len()];
    let mut window_sum: f64 = values[..period - 1].iter().sum();
    for i in period - 1..values.len() {
        window_sum += values[i];
        out[i] = Some(window_sum / period as f64);
        window_sum -= values[i + 1 - period];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_series_known_means() {
        let out = moving_average(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(out, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn warmup_prefix_is_none_and_length_matches() {
        let values: Vec<f64> = (0..50).map(|i| 100.0 + (i as f64).sin()).collect();
        let out = moving_average(&values, 20);
        assert_eq!(out.len(), values.len());
        assert!(out[..19].iter().all(Option::is_none));
        assert!(out[19..].iter().all(Option::is_some));
    }

    #[test]
    fn exact_mean_at_every_index() {
        let values = vec![3.5, 1.25, -2.0, 8.0, 0.5, 4.0];
        let period = 4;
        let out = moving_average(&values, period);
        for i in period - 1..values.len() {
            let mean: f64 =
                values[i + 1 - period..=i].iter().sum::<f64>() / period as f64;
            assert!((out[i].unwrap() - mean).abs() < 1e-12);
        }
    }

    #[test]
    fn empty_series_yields_empty() {
        assert!(moving_average(&[], 5).is_empty());
    }

    #[test]
    fn zero_period_yields_all_none() {
        assert_eq!(moving_average(&[1.0, 2.0], 0), vec![None, None]);
    }

    #[test]
    fn oversized_period_yields_all_none() {
        assert_eq!(moving_average(&[1.0, 2.0], 3), vec![None, None]);
    }

    #[test]
    fn period_one_echoes_the_series() {
        let out = moving_average(&[7.0, 8.0, 9.0], 1);
        assert_eq!(out, vec![Some(7.0), Some(8.0), Some(9.0)]);
    }
}
