//! Rank correlation statistics.
//!
//! The general statistics take `f64` slices so they tolerate ties and return
//! NaN where the statistic is undefined (constant input, fewer than two
//! elements). `kendall_pivot` works on permutations only.

use std::cmp::Ordering;

fn sign(a: f64, b: f64) -> i8 {
    match a.partial_cmp(&b) {
        Some(Ordering::Greater) => 1,
        Some(Ordering::Less) => -1,
        _ => 0,
    }
}

pub fn as_f64(ranks: &[usize]) -> Vec<f64> {
    ranks.iter().map(|&r| r as f64).collect()
}

/// Kendall's tau between two permutations of `0..n`.
///
/// Walks the probe ranks in order and, for each, locates the paired gallery
/// rank inside the shrinking objective ranking; elements left of the pivot
/// count as discordant, elements right of it as concordant.
pub fn kendall_pivot(probe: &[usize], gallery: &[usize]) -> f64 {
    let n = probe.len();
    if n < 2 {
        return f64::NAN;
    }

    let mut position = vec![0; n];
    for (idx, &rank) in probe.iter().enumerate() {
        position[rank] = idx;
    }

    let mut objective: Vec<usize> = (0..n).collect();
    let mut sigma: i64 = 0;
    // the last rank always scores zero
    for &idx in position.iter().take(n - 1) {
        let pivot = gallery[idx];
        let pivot_index = objective.iter().position(|&r| r == pivot).unwrap_or(0);
        sigma += (objective.len() as i64 - 1) - 2 * pivot_index as i64;
        objective.remove(pivot_index);
    }

    (2 * sigma) as f64 / (n * (n - 1)) as f64
}

/// Kendall's tau-b with tie correction.
pub fn kendall_tau_b(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    let (mut concordant, mut discordant) = (0i64, 0i64);
    let (mut ties_x, mut ties_y) = (0i64, 0i64);

    for i in 0..n {
        for j in (i + 1)..n {
            let dx = sign(x[i], x[j]);
            let dy = sign(y[i], y[j]);
            if dx == 0 {
                ties_x += 1;
            }
            if dy == 0 {
                ties_y += 1;
            }
            if dx != 0 && dy != 0 {
                if dx == dy {
                    concordant += 1;
                } else {
                    discordant += 1;
                }
            }
        }
    }

    let pairs = (n * n.saturating_sub(1) / 2) as i64;
    let den = (((pairs - ties_x) * (pairs - ties_y)) as f64).sqrt();
    if den == 0.0 {
        return f64::NAN;
    }
    (concordant - discordant) as f64 / den
}

/// Weighted tau with hyperbolic weigher `1 / (r + 1)` and additive pair
/// weights. Elements are ranked by decreasing `(x, y)` and by decreasing
/// `(y, x)`; the result is the mean of both.
pub fn weighted_tau(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    let (x, y) = (&x[..n], &y[..n]);
    let by_x = decreasing_rank(x, y);
    let by_y = decreasing_rank(y, x);
    (weighted_tau_ranked(x, y, &by_x) + weighted_tau_ranked(x, y, &by_y)) / 2.0
}

fn decreasing_rank(primary: &[f64], secondary: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..primary.len()).collect();
    order.sort_by(|&a, &b| {
        primary[b]
            .total_cmp(&primary[a])
            .then_with(|| secondary[b].total_cmp(&secondary[a]))
    });
    let mut rank = vec![0; order.len()];
    for (r, &idx) in order.iter().enumerate() {
        rank[idx] = r;
    }
    rank
}

fn weighted_tau_ranked(x: &[f64], y: &[f64], rank: &[usize]) -> f64 {
    let weight = |i: usize| 1.0 / (rank[i] as f64 + 1.0);
    let n = x.len();
    let (mut total, mut ties_x, mut ties_y, mut num) = (0.0, 0.0, 0.0, 0.0);

    for i in 0..n {
        for j in (i + 1)..n {
            let w = weight(i) + weight(j);
            let dx = sign(x[i], x[j]);
            let dy = sign(y[i], y[j]);
            total += w;
            if dx == 0 {
                ties_x += w;
            }
            if dy == 0 {
                ties_y += w;
            }
            num += w * f64::from(dx * dy);
        }
    }

    if total == ties_x || total == ties_y {
        return f64::NAN;
    }
    num / ((total - ties_x).sqrt() * (total - ties_y).sqrt())
}

/// Spearman's rho: Pearson correlation of average-tie ranks.
pub fn spearman(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    pearson(&average_ranks(&x[..n]), &average_ranks(&y[..n]))
}

/// 1-based ranks; tied values share the mean of the ranks they span.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        let mean = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = mean;
        }
        start = end;
    }
    ranks
}

fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    if n < 2.0 {
        return f64::NAN;
    }
    let mx = x.iter().sum::<f64>() / n;
    let my = y.iter().sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx) * (a - mx);
        syy += (b - my) * (b - my);
    }
    let den = (sxx * syy).sqrt();
    if den == 0.0 {
        return f64::NAN;
    }
    (sxy / den).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_kendall_identity_and_reverse() {
        let a = [0, 1, 2, 3, 4];
        let r = [4, 3, 2, 1, 0];
        assert!(close(kendall_pivot(&a, &a), 1.0));
        assert!(close(kendall_pivot(&a, &r), -1.0));
        assert!(close(kendall_tau_b(&as_f64(&a), &as_f64(&a)), 1.0));
        assert!(close(kendall_tau_b(&as_f64(&a), &as_f64(&r)), -1.0));
    }

    #[test]
    fn test_kendall_single_swap() {
        // one discordant pair out of six
        let a = [0, 1, 2, 3];
        let b = [1, 0, 2, 3];
        assert!(close(kendall_pivot(&a, &b), 4.0 / 6.0));
        assert!(close(kendall_tau_b(&as_f64(&a), &as_f64(&b)), 4.0 / 6.0));
    }

    #[test]
    fn test_kendall_pivot_matches_tau_b_on_shuffled_lists() {
        let a = [3, 0, 4, 1, 2];
        let b = [2, 4, 0, 3, 1];
        assert!(close(
            kendall_pivot(&a, &b),
            kendall_tau_b(&as_f64(&a), &as_f64(&b))
        ));
    }

    #[test]
    fn test_kendall_degenerate() {
        assert!(kendall_tau_b(&[1.0, 1.0, 1.0], &[0.0, 1.0, 2.0]).is_nan());
        assert!(kendall_pivot(&[0], &[0]).is_nan());
    }

    #[test]
    fn test_kendall_tau_b_with_ties() {
        // pairs: (0,1) tie in x, (0,2) C, (1,2) C -> 2 / sqrt(2 * 3)
        let t = kendall_tau_b(&[1.0, 1.0, 2.0], &[1.0, 2.0, 3.0]);
        assert!(close(t, 2.0 / 6f64.sqrt()));
    }

    #[test]
    fn test_weighted_tau() {
        let a = [0.0, 1.0, 2.0, 3.0];
        let r = [3.0, 2.0, 1.0, 0.0];
        assert!(close(weighted_tau(&a, &a), 1.0));
        assert!(close(weighted_tau(&a, &r), -1.0));
        assert!(weighted_tau(&[1.0, 1.0], &[0.0, 1.0]).is_nan());
    }

    #[test]
    fn test_weighted_tau_favours_top_positions() {
        // swapping the two highest values costs more than swapping the two lowest
        let base = [0.0, 1.0, 2.0, 3.0, 4.0];
        let top_swap = [0.0, 1.0, 2.0, 4.0, 3.0];
        let bottom_swap = [1.0, 0.0, 2.0, 3.0, 4.0];
        assert!(weighted_tau(&base, &top_swap) < weighted_tau(&base, &bottom_swap));
    }

    #[test]
    fn test_average_ranks() {
        assert_eq!(average_ranks(&[10.0, 20.0, 10.0, 5.0]), vec![2.5, 4.0, 2.5, 1.0]);
    }

    #[test]
    fn test_spearman() {
        let a = [0.0, 1.0, 2.0, 3.0];
        assert!(close(spearman(&a, &a), 1.0));
        assert!(close(spearman(&a, &[3.0, 2.0, 1.0, 0.0]), -1.0));
        // d^2 sum = 2 -> 1 - 6*2 / (4*15)
        assert!(close(spearman(&a, &[1.0, 0.0, 2.0, 3.0]), 0.8));
        assert!(spearman(&a, &[1.0, 1.0, 1.0, 1.0]).is_nan());
    }
}
