//! Poisson probabilities in the log domain.
//!
//! Counts in rare-event searches range from zero to millions and expected
//! means from 1e-10 to 1e6, so every quantity here is carried as a natural
//! logarithm. Cumulative sums are built by walking away from the peak of the
//! distribution, where terms shrink monotonically, and stop once a term no
//! longer moves the running sum.
//!
//! # Degenerate inputs
//!
//! Negative and NaN means are treated as zero. A zero mean puts all mass on
//! `k = 0`.

use serde::Serialize;

use super::stable::{log1m_exp, log_add_exp, log_factorial, log_sub_exp};
use crate::error::ConvergenceError;

/// Log-ratio below which an added term no longer changes the running sum
/// (about 1e-15 relative).
pub const LOG_RELATIVE_PRECISION: f64 = -35.0;

/// Upper bound on terms visited by a single cumulative-sum walk.
pub const MAX_SERIES_TERMS: usize = 10_000_000;

/// Logarithms of the cumulative Poisson probabilities around a count `N`.
///
/// `lower = ln P(k <= N)` and `upper = ln P(k >= N)`. The `N`-th term is in
/// both sums, so `exp(lower) + exp(upper) = 1 + P(N)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LogPair {
    pub lower: f64,
    pub upper: f64,
}

impl LogPair {
    /// `P(k <= N)`.
    pub fn lower_prob(&self) -> f64 {
        self.lower.exp()
    }

    /// `P(k >= N)`.
    pub fn upper_prob(&self) -> f64 {
        self.upper.exp()
    }

    /// `ln(P(k <= N) + P(k >= N)) = ln(1 + P(N))`.
    pub fn log_total(&self) -> f64 {
        log_add_exp(self.lower, self.upper)
    }
}

fn clamp_mean(mean: f64) -> f64 {
    if mean > 0.0 {
        mean
    } else {
        0.0
    }
}

/// `ln P(k | mean)` for a Poisson distribution.
///
/// Closed form `-mean + k ln(mean) - ln(k!)`, with `k = 0` giving exactly
/// `-mean` and a zero mean giving `0` or `-inf`.
pub fn log_poisson_pmf(k: u64, mean: f64) -> f64 {
    let mean = clamp_mean(mean);
    if mean == 0.0 {
        return if k == 0 { 0.0 } else { f64::NEG_INFINITY };
    }
    if k == 0 {
        return -mean;
    }
    if mean.is_infinite() {
        return f64::NEG_INFINITY;
    }
    -mean + (k as f64) * mean.ln() - log_factorial(k)
}

/// Paired lower/upper cumulative sums `ln P(k <= n)` and `ln P(k >= n)`.
///
/// Only the tail that lies away from the peak is summed directly; the other
/// side follows from `lower + upper = 1 + P(n)`.
pub fn log_poisson_sums(n: u64, mean: f64) -> Result<LogPair, ConvergenceError> {
    let mean = clamp_mean(mean);
    if mean == 0.0 {
        let upper = if n == 0 { 0.0 } else { f64::NEG_INFINITY };
        return Ok(LogPair { lower: 0.0, upper });
    }
    if n == 0 {
        return Ok(LogPair {
            lower: -mean,
            upper: 0.0,
        });
    }
    if mean.is_infinite() {
        return Ok(LogPair {
            lower: f64::NEG_INFINITY,
            upper: 0.0,
        });
    }

    let log_pn = log_poisson_pmf(n, mean);
    if (n as f64) < mean {
        let lower = tail_sum(n, mean, log_pn, Walk::Down)?;
        Ok(LogPair {
            lower,
            upper: complement(lower, log_pn),
        })
    } else {
        let upper = tail_sum(n, mean, log_pn, Walk::Up)?;
        Ok(LogPair {
            lower: complement(upper, log_pn),
            upper,
        })
    }
}

#[derive(Clone, Copy)]
enum Walk {
    Down,
    Up,
}

/// Sums `P(k)` from `k = n` outward, starting at `ln P(n) = log_pn`.
fn tail_sum(n: u64, mean: f64, log_pn: f64, walk: Walk) -> Result<f64, ConvergenceError> {
    let ln_mean = mean.ln();
    let mut sum = log_pn;
    let mut term = log_pn;
    let mut k = n;

    for _ in 0..MAX_SERIES_TERMS {
        match walk {
            Walk::Down => {
                if k == 0 {
                    return Ok(sum);
                }
                // P(k-1) = P(k) * k / mean
                term += (k as f64).ln() - ln_mean;
                k -= 1;
            }
            Walk::Up => {
                // P(k+1) = P(k) * mean / (k+1)
                k += 1;
                term += ln_mean - (k as f64).ln();
            }
        }
        sum = log_add_exp(sum, term);
        if term - sum < LOG_RELATIVE_PRECISION {
            return Ok(sum);
        }
    }

    Err(ConvergenceError {
        routine: "poisson tail sum",
        iterations: MAX_SERIES_TERMS,
    })
}

/// `ln(1 + P(n) - S)` given `ln S` for a tail sum that includes `P(n)`.
fn complement(log_tail: f64, log_pn: f64) -> f64 {
    // ln of the tail beyond n; rounding can leave it slightly negative
    let beyond = log_sub_exp(log_tail, log_pn);
    if beyond.is_nan() || beyond == f64::NEG_INFINITY {
        return 0.0;
    }
    log1m_exp(beyond.min(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        if a.is_nan() || b.is_nan() {
            return false;
        }
        (a - b).abs() <= tol
    }

    fn direct_lower(n: u64, mean: f64) -> f64 {
        (0..=n).map(|k| log_poisson_pmf(k, mean).exp()).sum()
    }

    #[test]
    fn pmf_known_values() {
        // P(2 | 3) = 4.5 e^-3
        assert!(approx_eq(log_poisson_pmf(2, 3.0), 4.5f64.ln() - 3.0, 1e-12));
        assert_eq!(log_poisson_pmf(0, 2.5), -2.5);
        assert_eq!(log_poisson_pmf(0, 0.0), 0.0);
        assert_eq!(log_poisson_pmf(3, 0.0), f64::NEG_INFINITY);
    }

    #[test]
    fn pmf_negative_mean_is_clamped() {
        assert_eq!(log_poisson_pmf(0, -1.0), 0.0);
        assert_eq!(log_poisson_pmf(2, f64::NAN), f64::NEG_INFINITY);
    }

    #[test]
    fn sums_match_direct_summation() {
        for &(n, mean) in &[(1u64, 0.5), (3, 3.0), (5, 2.0), (2, 7.5), (20, 12.0)] {
            let pair = log_poisson_sums(n, mean).unwrap();
            let expected = direct_lower(n, mean);
            assert!(
                approx_eq(pair.lower_prob(), expected, 1e-13),
                "n={n} mean={mean}: {} vs {}",
                pair.lower_prob(),
                expected
            );
        }
    }

    #[test]
    fn sums_satisfy_overlap_identity() {
        for &(n, mean) in &[(1u64, 0.01), (4, 4.0), (10, 3.0), (3, 10.0), (500, 480.0)] {
            let pair = log_poisson_sums(n, mean).unwrap();
            let lhs = pair.lower_prob() + pair.upper_prob();
            let rhs = 1.0 + log_poisson_pmf(n, mean).exp();
            assert!(((lhs - rhs) / rhs).abs() < 1e-12, "n={n} mean={mean}");
            assert!(approx_eq(pair.log_total(), rhs.ln(), 1e-12));
        }
    }

    #[test]
    fn zero_mean_degenerate() {
        let pair = log_poisson_sums(0, 0.0).unwrap();
        assert_eq!(pair, LogPair { lower: 0.0, upper: 0.0 });
        let pair = log_poisson_sums(4, 0.0).unwrap();
        assert_eq!(pair.lower, 0.0);
        assert_eq!(pair.upper, f64::NEG_INFINITY);
    }

    #[test]
    fn zero_count_degenerate() {
        let pair = log_poisson_sums(0, 3.7).unwrap();
        assert_eq!(pair.lower, -3.7);
        assert_eq!(pair.upper, 0.0);
    }

    #[test]
    fn far_tails_stay_finite() {
        // P(k <= 2 | 2000) is around e^-1985, far below f64::MIN_POSITIVE
        let pair = log_poisson_sums(2, 2000.0).unwrap();
        assert!(pair.lower.is_finite());
        assert!(pair.lower < -1900.0);
        assert!(approx_eq(pair.upper, 0.0, 1e-12));

        let pair = log_poisson_sums(300, 1e-3).unwrap();
        assert!(pair.upper.is_finite());
        assert!(approx_eq(pair.lower, 0.0, 1e-12));
    }

    #[test]
    fn large_mean_near_peak() {
        let pair = log_poisson_sums(1_000_000, 1_000_000.0).unwrap();
        // Both sides hold roughly half the mass.
        assert!(approx_eq(pair.lower_prob(), 0.5, 0.01));
        assert!(approx_eq(pair.upper_prob(), 0.5, 0.01));
    }
}
