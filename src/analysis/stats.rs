//! Descriptive statistics and the Mann–Whitney U test.
//!
//! Uses the normal distribution from `statrs` for the large-sample p-value.

use crate::error::StatsError;
use crate::models::BoxSummary;
use statrs::distribution::{ContinuousCDF, Normal};
use std::cmp::Ordering;

/// z-value of the two-sided 95% normal interval.
pub const Z_95: f64 = 1.96;

/// Largest `n1 * n2` for which the exact null distribution is tabulated.
const EXACT_MAX_CELLS: usize = 1_000_000;

/// Largest smaller-sample size that uses the exact distribution.
const EXACT_MAX_SMALL: usize = 8;

/// Arithmetic mean. Errors on an empty slice.
pub fn mean(values: &[f64]) -> Result<f64, StatsError> {
    if values.is_empty() {
        return Err(StatsError::NoValues);
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator); `None` below two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let m = values.iter().sum::<f64>() / n as f64;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n as f64 - 1.0);
    Some(variance.sqrt())
}

/// Half-width of the 95% confidence interval on the mean.
///
/// Zero when the standard deviation is undefined.
pub fn ci95(std: Option<f64>, count: usize) -> f64 {
    match std {
        Some(s) if count >= 2 => Z_95 * s / (count as f64).sqrt(),
        _ => 0.0,
    }
}

/// Linear-interpolated quantile of sorted data, `p` in [0, 1].
fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    let pos = p * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Box-plot summary with Tukey whiskers.
pub fn box_summary(values: &[f64]) -> Result<BoxSummary, StatsError> {
    if values.is_empty() {
        return Err(StatsError::NoValues);
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let q1 = quantile_sorted(&sorted, 0.25);
    let median = quantile_sorted(&sorted, 0.5);
    let q3 = quantile_sorted(&sorted, 0.75);
    let iqr = q3 - q1;
    let lower_fence = q1 - 1.5 * iqr;
    let upper_fence = q3 + 1.5 * iqr;

    let lower_whisker = sorted
        .iter()
        .copied()
        .find(|v| *v >= lower_fence)
        .unwrap_or(q1);
    let upper_whisker = sorted
        .iter()
        .rev()
        .copied()
        .find(|v| *v <= upper_fence)
        .unwrap_or(q3);

    Ok(BoxSummary {
        count: sorted.len(),
        min: sorted[0],
        q1,
        median,
        q3,
        max: sorted[sorted.len() - 1],
        lower_whisker,
        upper_whisker,
        mean: mean(&sorted)?,
        std: sample_std(&sorted),
    })
}

/// Average ranks (1-based) of `values` plus the size of every tie group.
fn rank_with_ties(values: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut tie_sizes = Vec::new();

    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len()
            && values[order[end + 1]].total_cmp(&values[order[start]]) == Ordering::Equal
        {
            end += 1;
        }

        let average = (start + end) as f64 / 2.0 + 1.0;
        for &idx in &order[start..=end] {
            ranks[idx] = average;
        }
        tie_sizes.push(end - start + 1);
        start = end + 1;
    }

    (ranks, tie_sizes)
}

/// Two-sided Mann–Whitney U test. Returns the p-value.
///
/// The exact null distribution is used when there are no ties and the
/// smaller sample has at most eight observations; otherwise the normal
/// approximation with tie and continuity correction. Swapping the samples
/// does not change the result.
pub fn rank_sum_test(a: &[f64], b: &[f64]) -> Result<f64, StatsError> {
    if a.is_empty() || b.is_empty() {
        return Err(StatsError::EmptySample);
    }

    let n1 = a.len();
    let n2 = b.len();

    let combined: Vec<f64> = a.iter().chain(b.iter()).copied().collect();
    let (ranks, tie_sizes) = rank_with_ties(&combined);

    let r1: f64 = ranks[..n1].iter().sum();
    let u1 = r1 - (n1 * (n1 + 1)) as f64 / 2.0;
    let u2 = (n1 * n2) as f64 - u1;
    let u = u1.max(u2);

    let has_ties = tie_sizes.iter().any(|&t| t > 1);
    let exact = !has_ties && n1.min(n2) <= EXACT_MAX_SMALL && n1 * n2 <= EXACT_MAX_CELLS;

    let p = match exact.then(|| exact_p_value(u, n1, n2)).flatten() {
        Some(p) => p,
        None => asymptotic_p_value(u, n1, n2, &tie_sizes),
    };

    Ok(p.clamp(0.0, 1.0))
}

/// Two-sided p-value from the exact distribution of U under the null.
///
/// The counts are the coefficients of the Gaussian binomial
/// `[n1 + n2 choose n1]`, built one factor at a time.
fn exact_p_value(u: f64, n1: usize, n2: usize) -> Option<f64> {
    let m = n1.min(n2);
    let n = n1.max(n2);
    let len = m * n + 1;

    let mut counts = vec![0i128; len];
    counts[0] = 1;

    for i in 1..=m {
        let shift = n + i;
        for k in (shift..len).rev() {
            counts[k] = counts[k].checked_sub(counts[k - shift])?;
        }
        for k in i..len {
            counts[k] = counts[k].checked_add(counts[k - i])?;
        }
    }

    let total: i128 = counts.iter().try_fold(0i128, |acc, c| acc.checked_add(*c))?;
    let k = u.round() as usize;
    let tail: i128 = counts.get(k..)?.iter().sum();

    Some(2.0 * tail as f64 / total as f64)
}

/// Two-sided p-value from the normal approximation.
fn asymptotic_p_value(u: f64, n1: usize, n2: usize, tie_sizes: &[usize]) -> f64 {
    let n = (n1 + n2) as f64;
    let n1n2 = (n1 * n2) as f64;
    let mu = n1n2 / 2.0;

    let tie_term: f64 = tie_sizes
        .iter()
        .map(|&t| {
            let t = t as f64;
            t * t * t - t
        })
        .sum();

    let variance = if n > 1.0 {
        n1n2 / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)))
    } else {
        0.0
    };

    if !(variance > 0.0) {
        // Every observation tied: no evidence either way.
        return 1.0;
    }

    let z = (u - mu - 0.5) / variance.sqrt();
    match Normal::new(0.0, 1.0) {
        Ok(normal) => 2.0 * normal.sf(z),
        Err(_) => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_mean_and_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!(close(mean(&values).unwrap(), 5.0));
        assert!(close(sample_std(&values).unwrap(), (32.0f64 / 7.0).sqrt()));
        assert_eq!(mean(&[]), Err(StatsError::NoValues));
        assert_eq!(sample_std(&[3.0]), None);
    }

    #[test]
    fn test_ci95_zero_below_two() {
        assert_eq!(ci95(None, 1), 0.0);
        assert_eq!(ci95(Some(2.0), 1), 0.0);
        assert!(close(ci95(Some(2.0), 4), 1.96));
    }

    #[test]
    fn test_rank_with_ties_averages() {
        let (ranks, ties) = rank_with_ties(&[10.0, 20.0, 10.0, 30.0]);
        assert_eq!(ranks, vec![1.5, 3.0, 1.5, 4.0]);
        assert_eq!(ties, vec![2, 1, 1]);
    }

    #[test]
    fn test_rank_sum_exact_small_samples() {
        // Reference value from the classic two-sided exact test.
        let males = [19.0, 22.0, 16.0, 29.0, 24.0];
        let females = [20.0, 11.0, 17.0, 12.0];
        let p = rank_sum_test(&males, &females).unwrap();
        assert!(close(p, 1.0 / 9.0), "p = {p}");
    }

    #[test]
    fn test_rank_sum_asymptotic_matches_reference() {
        let p = asymptotic_p_value(17.0, 5, 4, &[1; 9]);
        assert!((p - 0.111_346_886_533_140_4).abs() < 1e-6, "p = {p}");
    }

    #[test]
    fn test_rank_sum_with_ties_uses_tie_correction() {
        let a = [1.0, 2.0, 2.0, 3.0];
        let b = [2.0, 3.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        let p = rank_sum_test(&a, &b).unwrap();
        assert!((p - 0.023_672_810_989_792_5).abs() < 1e-6, "p = {p}");
    }

    #[test]
    fn test_rank_sum_is_symmetric() {
        let a = [95.0, 92.0, 90.0, 85.0, 99.0, 70.0, 91.0, 93.0, 97.0, 88.0];
        let b = [60.0, 72.0, 88.0, 65.0, 58.0, 80.0, 77.0, 90.0, 61.0];
        assert_eq!(
            rank_sum_test(&a, &b).unwrap(),
            rank_sum_test(&b, &a).unwrap()
        );

        let small_a = [1.0, 4.0, 9.0];
        let small_b = [2.0, 3.0, 5.0, 6.0];
        assert_eq!(
            rank_sum_test(&small_a, &small_b).unwrap(),
            rank_sum_test(&small_b, &small_a).unwrap()
        );
    }

    #[test]
    fn test_rank_sum_all_tied_is_one() {
        let p = rank_sum_test(&[5.0, 5.0, 5.0], &[5.0, 5.0]).unwrap();
        assert_eq!(p, 1.0);
    }

    #[test]
    fn test_rank_sum_empty_sample() {
        assert_eq!(rank_sum_test(&[], &[1.0]), Err(StatsError::EmptySample));
        assert_eq!(rank_sum_test(&[1.0], &[]), Err(StatsError::EmptySample));
    }

    #[test]
    fn test_rank_sum_p_value_in_unit_interval() {
        let p = rank_sum_test(&[1.0], &[2.0]).unwrap();
        assert!((0.0..=1.0).contains(&p));
        assert_eq!(p, 1.0);
    }

    #[test]
    fn test_box_summary() {
        let summary = box_summary(&[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();
        assert_eq!(summary.count, 5);
        assert!(close(summary.q1, 2.0));
        assert!(close(summary.median, 3.0));
        assert!(close(summary.q3, 4.0));
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 100.0);
        assert_eq!(summary.lower_whisker, 1.0);
        // 100 lies beyond q3 + 1.5 * IQR = 7.
        assert_eq!(summary.upper_whisker, 4.0);
        assert!(close(summary.mean, 22.0));
    }

    #[test]
    fn test_box_summary_single_value() {
        let summary = box_summary(&[42.0]).unwrap();
        assert_eq!(summary.median, 42.0);
        assert_eq!(summary.std, None);
        assert_eq!(box_summary(&[]), Err(StatsError::NoValues));
    }
}
