//! Feldman-Cousins confidence intervals for a Poisson signal over a known
//! background.
//!
//! For a hypothesized signal `s`, counts are ranked by the likelihood ratio
//!
//! ```text
//! R(k) = P(k | b + s) / P(k | b + max(0, k - b))
//! ```
//!
//! and the acceptance region is the highest-ranked set of counts holding at
//! least the requested confidence level. The interval is every `s` whose
//! acceptance region contains the observed count.
//!
//! The acceptance test works on a window of counts `[k1, k2]`. It starts from
//! the point beyond which `R` is decreasing and below `R(0)`, then repeatedly
//! drops the lower-ranked endpoint until either the observed count falls out
//! (rejected) or dropping more would exclude more than `p` (accepted).

use dd_math::{log1m_exp, log_add_exp, log_poisson_pmf, log_poisson_sums, log_sub_exp};
use serde::Serialize;
use tracing::debug;

use super::counting::clamp_mean;
use super::error::{Result, StatsError};
use super::root::RootFinder;
use crate::config::EngineConfig;
use crate::logging::{event_names, Stage};
use dd_math::MAX_SERIES_TERMS;

/// `ln(0.38)`: below this `p` the interval can never be `[0, 0]`.
const DEGENERATE_LNP_THRESHOLD: f64 = -0.967_584_026_261_705_6;

/// Counts within this distance of the total mean are always accepted.
const PEAK_HALF_WIDTH: f64 = 0.4;

/// Signal interval `[lower, upper]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceInterval {
    /// The measure-zero interval `[0, 0]`.
    pub const EMPTY: ConfidenceInterval = ConfidenceInterval {
        lower: 0.0,
        upper: 0.0,
    };

    pub fn contains(&self, s: f64) -> bool {
        self.lower <= s && s <= self.upper
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn is_empty(&self) -> bool {
        self.upper <= 0.0
    }
}

/// `ln R(k)` for background `b` and signal `s`.
pub fn log_ordering_term(k: u64, b: f64, s: f64) -> f64 {
    let kf = k as f64;
    if kf <= b {
        if k == 0 {
            return -s;
        }
        return -s + kf * (s / b).ln_1p();
    }
    let mu = b + s;
    kf - mu + kf * (mu / kf).ln()
}

/// Whether `n` lies in the acceptance region for signal `s` at `ln p = lnp`.
pub fn accepts(n: u64, b: f64, s: f64, lnp: f64) -> Result<bool> {
    if lnp >= 0.0 {
        return Ok(false);
    }
    let nf = n as f64;
    if s == 0.0 && nf <= b {
        return Ok(true);
    }
    let mu = b + s;
    if (nf - mu).abs() <= PEAK_HALF_WIDTH {
        return Ok(true);
    }
    if mu <= 0.0 {
        return Ok(n == 0);
    }

    // Beyond k_tail every count ranks below R(0) and below everything
    // inside the window.
    let r0 = -s;
    let mut k_tail = (mu.ceil() as u64).max(1);
    let mut steps = 0usize;
    while log_ordering_term(k_tail, b, s) >= r0 {
        k_tail += 1;
        steps += 1;
        if steps > MAX_SERIES_TERMS {
            return Err(StatsError::non_convergence("ordering tail search", steps));
        }
    }

    // The tail alone may already hold more than p; grow the window until it
    // does not.
    let mut excluded = log_poisson_sums(k_tail + 1, mu)?.upper;
    while excluded > lnp {
        k_tail += 1;
        steps += 1;
        if steps > MAX_SERIES_TERMS {
            return Err(StatsError::non_convergence("ordering tail search", steps));
        }
        excluded = log_poisson_sums(k_tail + 1, mu)?.upper;
    }
    if n > k_tail {
        return Ok(false);
    }

    let (mut k1, mut k2) = (0u64, k_tail);
    let mut r1 = log_ordering_term(k1, b, s);
    let mut r2 = log_ordering_term(k2, b, s);
    for _ in 0..MAX_SERIES_TERMS {
        if k1 > k2 {
            // unreachable while excluded stays below lnp < 0
            return Ok(true);
        }
        let (drop_low, drop_high) = if k1 == k2 {
            (true, false)
        } else if r1 < r2 {
            (true, false)
        } else if r2 < r1 {
            (false, true)
        } else {
            (true, true)
        };

        let mut removed = f64::NEG_INFINITY;
        if drop_low {
            removed = log_add_exp(removed, log_poisson_pmf(k1, mu));
        }
        if drop_high {
            removed = log_add_exp(removed, log_poisson_pmf(k2, mu));
        }
        let tentative = log_add_exp(excluded, removed);
        if tentative > lnp {
            return Ok(true);
        }
        if (drop_low && n == k1) || (drop_high && n == k2) {
            return Ok(false);
        }

        excluded = tentative;
        if drop_low {
            k1 += 1;
            r1 = log_ordering_term(k1, b, s);
        }
        if drop_high {
            if k2 == 0 {
                return Ok(true);
            }
            k2 -= 1;
            r2 = log_ordering_term(k2, b, s);
        }
    }

    Err(StatsError::non_convergence(
        "acceptance window",
        MAX_SERIES_TERMS,
    ))
}

/// Whether the ordering principle yields `[0, 0]`: the counts strictly above
/// `n` and up to `floor(b)` already hold the confidence level at `s = 0`.
///
/// Only possible when `p >= 0.38`.
pub fn is_degenerate(n: u64, b: f64, lnp: f64) -> Result<bool> {
    if lnp < DEGENERATE_LNP_THRESHOLD || lnp >= 0.0 {
        return Ok(false);
    }
    let floor_b = b.floor();
    if floor_b < (n as f64) + 1.0 {
        return Ok(false);
    }
    let upto_floor = log_poisson_sums(floor_b as u64, b)?.lower;
    let upto_n = log_poisson_sums(n, b)?.lower;
    let mass = log_sub_exp(upto_floor, upto_n);
    Ok(mass > log1m_exp(lnp))
}

/// Feldman-Cousins interval for `n` observed events over background `b`.
///
/// `lnp >= 0` gives `[0, 0]`; `lnp = -inf` (100% confidence) gives `[0, inf)`.
pub fn confidence_interval(
    lnp: f64,
    n: u64,
    b: f64,
    config: &EngineConfig,
) -> Result<ConfidenceInterval> {
    if lnp.is_nan() {
        return Err(StatsError::invalid("lnp", "must not be NaN"));
    }
    if lnp >= 0.0 {
        return Ok(ConfidenceInterval::EMPTY);
    }
    if lnp == f64::NEG_INFINITY {
        return Ok(ConfidenceInterval {
            lower: 0.0,
            upper: f64::INFINITY,
        });
    }
    let b = clamp_mean("background", b);

    if is_degenerate(n, b, lnp)? {
        debug!(
            event = event_names::INTERVAL_DEGENERATE,
            stage = %Stage::Interval,
            n, b, lnp,
            "interval collapses to [0, 0]"
        );
        return Ok(ConfidenceInterval::EMPTY);
    }

    let finder = RootFinder::new(&config.root);
    let precision = config.interval.relative_precision;
    let accept = |s: f64| accepts(n, b, s, lnp);
    let nf = n as f64;

    let lower = if accept(0.0)? {
        0.0
    } else {
        // s = n - b puts the mean on the count, which is always accepted
        let (held, failed) = finder.walk_while(nf - b, 0.5, accept)?;
        finder.bisect_predicate(held, failed, precision, accept)?
    };
    debug!(
        event = event_names::INTERVAL_BOUND,
        stage = %Stage::Interval,
        bound = "lower",
        value = lower,
        "interval bound found"
    );

    let seed = if nf > b {
        nf - b
    } else if accept(1.0)? {
        1.0
    } else {
        let (_, first_accepted) = finder.walk_while(1.0, 0.5, |s| Ok(!accept(s)?))?;
        first_accepted
    };
    let (held, failed) = finder.walk_while(seed, 2.0, accept)?;
    let upper = finder.bisect_predicate(held, failed, precision, accept)?;
    debug!(
        event = event_names::INTERVAL_BOUND,
        stage = %Stage::Interval,
        bound = "upper",
        value = upper,
        "interval bound found"
    );

    Ok(ConfidenceInterval {
        lower: lower.min(upper),
        upper,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LNP_90: f64 = -std::f64::consts::LN_10;

    fn interval(n: u64, b: f64, cl: f64) -> ConfidenceInterval {
        confidence_interval((-cl).ln_1p(), n, b, &EngineConfig::default()).unwrap()
    }

    #[test]
    fn ordering_term_is_zero_at_best_fit() {
        // R = 1 when s equals the best-fit signal
        assert!(log_ordering_term(5, 2.0, 3.0).abs() < 1e-12);
        assert!(log_ordering_term(1, 3.0, 0.0).abs() < 1e-12);
        assert_eq!(log_ordering_term(0, 2.0, 1.5), -1.5);
    }

    #[test]
    fn ordering_term_is_at_most_zero() {
        for k in 0..30 {
            for &(b, s) in &[(0.0, 2.0), (1.5, 0.7), (4.0, 10.0), (3.0, 0.0)] {
                let r = log_ordering_term(k, b, s);
                assert!(r <= 1e-12, "k={k} b={b} s={s}: {r}");
            }
        }
    }

    #[test]
    fn acceptance_fast_paths() {
        assert!(!accepts(3, 1.0, 2.0, 0.0).unwrap());
        assert!(accepts(2, 3.0, 0.0, LNP_90).unwrap());
        assert!(accepts(5, 2.0, 3.2, LNP_90).unwrap());
        assert!(accepts(0, 0.0, 0.0, LNP_90).unwrap());
        assert!(!accepts(4, 0.0, 0.0, LNP_90).unwrap());
    }

    #[test]
    fn acceptance_rejects_far_counts() {
        assert!(!accepts(0, 0.0, 5.0, LNP_90).unwrap());
        assert!(!accepts(20, 1.0, 2.0, LNP_90).unwrap());
        assert!(accepts(1, 0.0, 3.0, LNP_90).unwrap());
    }

    #[test]
    fn degenerate_check() {
        assert!(is_degenerate(0, 4.0, (0.4f64).ln()).unwrap());
        assert!(!is_degenerate(0, 4.0, LNP_90).unwrap());
        assert!(!is_degenerate(3, 4.0, (0.4f64).ln()).unwrap());
    }

    #[test]
    fn no_background_table() {
        // Feldman & Cousins (1998), Table II, 90% CL, b = 0
        let cases = [
            (0u64, 0.0, 2.44),
            (1, 0.11, 4.36),
            (2, 0.53, 5.91),
            (3, 1.10, 7.42),
            (4, 1.47, 8.60),
        ];
        for (n, lower, upper) in cases {
            let ci = interval(n, 0.0, 0.9);
            assert!((ci.lower - lower).abs() < 0.01, "n={n}: {ci:?}");
            assert!((ci.upper - upper).abs() < 0.01, "n={n}: {ci:?}");
        }
    }

    #[test]
    fn background_lowers_upper_limit() {
        let ci = interval(0, 1.0, 0.9);
        assert_eq!(ci.lower, 0.0);
        assert!((ci.upper - 1.61).abs() < 0.01, "{ci:?}");
        assert!(interval(0, 2.0, 0.9).upper < ci.upper);
    }

    #[test]
    fn degenerate_interval_is_empty() {
        let ci = interval(0, 4.0, 0.6);
        assert_eq!(ci, ConfidenceInterval::EMPTY);
        assert!(ci.is_empty());
    }

    #[test]
    fn limiting_confidence_levels() {
        let config = EngineConfig::default();
        assert_eq!(
            confidence_interval(0.0, 3, 1.0, &config).unwrap(),
            ConfidenceInterval::EMPTY
        );
        let all = confidence_interval(f64::NEG_INFINITY, 3, 1.0, &config).unwrap();
        assert_eq!(all.lower, 0.0);
        assert!(all.upper.is_infinite());
        assert!(confidence_interval(f64::NAN, 3, 1.0, &config).is_err());
    }

    #[test]
    fn interval_helpers() {
        let ci = ConfidenceInterval {
            lower: 1.0,
            upper: 4.0,
        };
        assert!(ci.contains(1.0));
        assert!(ci.contains(2.5));
        assert!(!ci.contains(4.5));
        assert_eq!(ci.width(), 3.0);
        assert!(!ci.is_empty());
    }
}
