//! Exclusion p-values for a counting experiment.
//!
//! Two methods:
//! - Poisson: the probability of seeing `N` or fewer events when the signal
//!   alone is expected. Background is not subtracted, so the result is
//!   conservative whenever background is present.
//! - Maximum gap (Yellin): for an unknown background, the probability that
//!   the signal alone would leave a gap between ordered observed energies at
//!   least as large as the largest one observed.
//!
//! Both return natural logarithms.

use dd_math::{log_add_exp, log_gamma, log_poisson_sums, log_sub_exp};
use tracing::trace;

use super::error::{Result, StatsError};
use crate::logging::{event_names, Stage};

/// Cap on `floor(mean / gap)` in the maximum-gap sum.
pub const MAX_GAP_TERMS: usize = 10_000;

/// `ln P(k <= n | mean)`.
pub fn poisson_log_p_value(n: u64, mean: f64) -> Result<f64> {
    Ok(log_poisson_sums(n, mean)?.lower)
}

/// Log p-value of the maximum-gap statistic.
///
/// `mean` is the total expected signal and `gap` the expected signal in the
/// largest gap (an absolute count, not a fraction). With `x = gap` and
/// `m = floor(mean / x)`:
///
/// ```text
/// p = sum_{k=1}^{m} (k x - mean)^(k-1) e^(-k x) (mean - k (x - 1)) / k!
/// ```
///
/// `m = 1` and `m = 2` use closed forms. For `m >= 3` the alternating sum is
/// evaluated term by term in the log domain; it loses precision to
/// cancellation once `m` grows past a few tens and is kept as an
/// approximation there.
pub fn maximum_gap_log_p_value(mean: f64, gap: f64) -> Result<f64> {
    if mean.is_nan() || mean <= 0.0 {
        return Ok(0.0);
    }
    if gap.is_nan() || gap <= 0.0 {
        return Ok(0.0);
    }
    if gap >= mean {
        // every expected event sits in the one gap
        return Ok(-mean);
    }

    let terms = (mean / gap).floor();
    if terms > MAX_GAP_TERMS as f64 {
        return Err(StatsError::non_convergence(
            "maximum gap sum",
            MAX_GAP_TERMS,
        ));
    }

    let x = gap;
    let lnp = match terms as usize {
        0 | 1 => -x + (mean - x).ln_1p(),
        2 => {
            let y = mean - 2.0 * x;
            let correction = -y * (y + 2.0) * (-x).exp() / (2.0 * (1.0 + mean - x));
            -x + (mean - x).ln_1p() + correction.ln_1p()
        }
        m => {
            let lnp = alternating_sum(mean, x, m);
            trace!(
                event = event_names::PVALUE_MAXIMUM_GAP_SERIES,
                stage = %Stage::PValue,
                mean, gap = x, terms = m, lnp,
                "maximum-gap series"
            );
            lnp
        }
    };

    if lnp.is_nan() {
        return Ok(f64::NEG_INFINITY);
    }
    Ok(lnp.min(0.0))
}

/// Log of the alternating series, with positive and negative terms summed
/// separately.
fn alternating_sum(mean: f64, x: f64, m: usize) -> f64 {
    let mut positive = f64::NEG_INFINITY;
    let mut negative = f64::NEG_INFINITY;

    for k in 1..=m {
        let kf = k as f64;
        let base = kf * x - mean;
        if base == 0.0 && k > 1 {
            continue;
        }
        let log_power = if k == 1 {
            0.0
        } else {
            (kf - 1.0) * base.abs().ln()
        };
        let log_term = log_power - kf * x + (mean - kf * x + kf).ln() - log_gamma(kf + 1.0);

        // base < 0 for every k <= m, so the sign alternates starting positive
        if k % 2 == 1 {
            positive = log_add_exp(positive, log_term);
        } else {
            negative = log_add_exp(negative, log_term);
        }
    }

    if positive <= negative {
        return f64::NEG_INFINITY;
    }
    log_sub_exp(positive, negative)
}
