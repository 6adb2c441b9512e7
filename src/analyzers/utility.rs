/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Computes the population standard deviation given a pre-computed mean.
/// Returns 0.0 for empty input.
pub fn stddev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;

    variance.sqrt()
}

/// Standard scores using the population standard deviation.
///
/// When every value is equal the deviation is zero and all scores are 0.0.
pub fn z_scores(values: &[f64]) -> Vec<f64> {
    let m = mean(values);
    let sd = stddev(values, m);
    values
        .iter()
        .map(|v| if sd == 0.0 { 0.0 } else { (v - m) / sd })
        .collect()
}

/// Keeps the items whose `value` has an absolute z-score below `threshold`.
pub fn retain_within_z<T>(items: Vec<T>, threshold: f64, value: impl Fn(&T) -> f64) -> Vec<T> {
    let values: Vec<f64> = items.iter().map(&value).collect();
    let scores = z_scores(&values);

    items
        .into_iter()
        .zip(scores)
        .filter(|(_, z)| z.abs() < threshold)
        .map(|(item, _)| item)
        .collect()
}

/// Pearson product-moment correlation of two equally long series.
///
/// Undefined (`None`) for fewer than two pairs or when either series is constant.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }

    let mx = mean(xs);
    let my = mean(ys);

    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mx;
        let dy = y - my;
        cov += dx * dy;
        vx += dx * dx;
        vy += dy * dy;
    }

    if vx == 0.0 || vy == 0.0 {
        return None;
    }

    Some((cov / (vx.sqrt() * vy.sqrt())).clamp(-1.0, 1.0))
}

/// Least-squares straight line through the points, as `(slope, intercept)`.
///
/// Undefined (`None`) for fewer than two points or when every x is equal.
pub fn linear_fit(xs: &[f64], ys: &[f64]) -> Option<(f64, f64)> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }

    let mx = mean(xs);
    let my = mean(ys);

    let sxx: f64 = xs.iter().map(|x| (x - mx).powi(2)).sum();
    if sxx == 0.0 {
        return None;
    }
    let sxy: f64 = xs.iter().zip(ys).map(|(x, y)| (x - mx) * (y - my)).sum();

    let slope = sxy / sxx;
    Some((slope, my - slope * mx))
}

/// Largest value, ignoring NaN. `None` for empty input.
pub fn max(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .reduce(f64::max)
}

/// Smallest value, ignoring NaN. `None` for empty input.
pub fn min(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .reduce(f64::min)
}

/// Percentile of already sorted values, interpolating linearly between the
/// two nearest ranks. `None` for empty input.
pub fn percentile(sorted: &[f64], pct: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (pct / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_mean_and_stddev() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[2.0, 4.0, 6.0]), 4.0);

        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(stddev(&values, mean(&values)), 2.0);
    }

    #[test]
    fn test_z_scores() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let z = z_scores(&values);
        assert!(close(z[0], -1.5));
        assert!(close(z[7], 2.0));
    }

    #[test]
    fn test_z_scores_of_constant_series_are_zero() {
        assert_eq!(z_scores(&[3.0, 3.0, 3.0]), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_retain_within_z_drops_outlier() {
        let mut values = vec![10.0; 20];
        values.push(1000.0);

        let kept = retain_within_z(values, 3.0, |v| *v);
        assert_eq!(kept.len(), 20);
        assert!(kept.iter().all(|v| *v == 10.0));
    }

    #[test]
    fn test_retain_within_z_boundary_is_excluded() {
        // Two values: both sit exactly one deviation from the mean.
        let kept = retain_within_z(vec![1.0, 3.0], 1.0, |v| *v);
        assert!(kept.is_empty());
    }

    #[test]
    fn test_pearson_perfect() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        assert!(close(pearson(&xs, &[2.0, 4.0, 6.0, 8.0]).unwrap(), 1.0));
        assert!(close(pearson(&xs, &[8.0, 6.0, 4.0, 2.0]).unwrap(), -1.0));
    }

    #[test]
    fn test_pearson_known_value() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let ys = [2.0, 4.0, 5.0, 4.0, 5.0];
        assert!(close(pearson(&xs, &ys).unwrap(), 0.7745966692414834));
    }

    #[test]
    fn test_pearson_undefined() {
        assert_eq!(pearson(&[1.0], &[2.0]), None);
        assert_eq!(pearson(&[1.0, 2.0], &[3.0, 3.0]), None);
        assert_eq!(pearson(&[1.0, 2.0], &[3.0]), None);
    }

    #[test]
    fn test_linear_fit() {
        let (slope, intercept) = linear_fit(&[0.0, 1.0, 2.0], &[1.0, 3.0, 5.0]).unwrap();
        assert!(close(slope, 2.0));
        assert!(close(intercept, 1.0));

        assert_eq!(linear_fit(&[1.0, 1.0], &[0.0, 5.0]), None);
    }

    #[test]
    fn test_min_max() {
        assert_eq!(max(&[1.0, f64::NAN, 3.0]), Some(3.0));
        assert_eq!(min(&[1.0, f64::NAN, 3.0]), Some(1.0));
        assert_eq!(max(&[]), None);
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [0.0, 10.0, 11.0, 12.0, 13.0, 14.0];
        assert_eq!(percentile(&sorted, 25.0), Some(10.25));
        assert_eq!(percentile(&sorted, 50.0), Some(11.5));
        assert_eq!(percentile(&sorted, 75.0), Some(12.75));
        assert_eq!(percentile(&sorted, 100.0), Some(14.0));
        assert_eq!(percentile(&[], 50.0), None);
    }
}
