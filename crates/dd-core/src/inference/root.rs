//! Bracket-then-bisect search on a positive scale.
//!
//! Scales span many orders of magnitude, so brackets grow and shrink by
//! factors of two and bisection splits at the geometric mean. Every loop is
//! bounded by the caps in [`RootConfig`]; hitting one is reported as
//! [`StatsError::NonConvergence`] rather than returning a partial estimate.

use tracing::{debug, trace};

use super::error::{Result, StatsError};
use crate::config::RootConfig;
use crate::logging::{event_names, Stage};

/// Root finder configured with tolerances and iteration caps.
#[derive(Debug, Clone, Copy)]
pub struct RootFinder {
    config: RootConfig,
}

impl Default for RootFinder {
    fn default() -> Self {
        Self::new(&RootConfig::default())
    }
}

impl RootFinder {
    pub fn new(config: &RootConfig) -> Self {
        Self { config: *config }
    }

    /// Find `x > 0` with `f(x) = target` for a decreasing `f`.
    ///
    /// Starts at `seed`, doubles or halves until the target is bracketed, then
    /// bisects until both the bracket width and the gap between the function
    /// values at its ends fall within the configured tolerances.
    pub fn solve_decreasing<F>(&self, mut f: F, target: f64, seed: f64) -> Result<f64>
    where
        F: FnMut(f64) -> Result<f64>,
    {
        if !(seed.is_finite() && seed > 0.0) {
            return Err(StatsError::invalid(
                "seed",
                format!("must be positive and finite, got {seed}"),
            ));
        }

        // Invariant after bracketing: f(x1) >= target > f(x2), x1 < x2.
        let (mut x1, mut x2) = if f(seed)? >= target {
            self.walk_while(seed, 2.0, |x| Ok(f(x)? >= target))?
        } else {
            let (held, failed) = self.walk_while(seed, 0.5, |x| Ok(f(x)? < target))?;
            (failed, held)
        };
        let mut f1 = f(x1)?;
        let mut f2 = f(x2)?;
        debug!(
            event = event_names::SCALE_BRACKETED,
            stage = %Stage::Scale,
            x1, x2, f1, f2,
            "bracketed target"
        );

        for step in 0..self.config.max_bisection_steps {
            let x = geometric_mean(x1, x2);
            if (x2 - x1).abs() <= self.config.x_tolerance
                && (f1 - f2).abs() <= self.config.f_tolerance
            {
                debug!(
                    event = event_names::SCALE_SOLVED,
                    stage = %Stage::Scale,
                    x,
                    steps = step,
                    "bisection converged"
                );
                return Ok(x);
            }
            if !(x > x1 && x < x2) {
                // bracket ends are adjacent floats; only a continuous crossing counts
                if (f1 - f2).abs() <= self.config.f_tolerance {
                    debug!(
                        event = event_names::SCALE_SOLVED,
                        stage = %Stage::Scale,
                        x,
                        steps = step,
                        "bisection reached float resolution"
                    );
                    return Ok(x);
                }
                return Err(StatsError::non_convergence("scale bisection", step));
            }

            let fx = f(x)?;
            trace!(x, fx, "bisection step");
            if fx >= target {
                x1 = x;
                f1 = fx;
            } else {
                x2 = x;
                f2 = fx;
            }
        }

        Err(StatsError::non_convergence(
            "scale bisection",
            self.config.max_bisection_steps,
        ))
    }

    /// Multiply `start` by `factor` while `pred` keeps holding.
    ///
    /// `pred(start)` is assumed true. Returns the last value where it held and
    /// the first where it failed.
    pub fn walk_while<P>(&self, start: f64, factor: f64, mut pred: P) -> Result<(f64, f64)>
    where
        P: FnMut(f64) -> Result<bool>,
    {
        let mut x = start;
        for _ in 0..self.config.max_bracket_steps {
            let next = x * factor;
            if !next.is_finite() {
                break;
            }
            if !pred(next)? {
                return Ok((x, next));
            }
            x = next;
        }

        Err(StatsError::non_convergence(
            "bracket search",
            self.config.max_bracket_steps,
        ))
    }

    /// Narrow the boundary between `held` (predicate true) and `failed`
    /// (predicate false) to a relative width of `rel_precision`.
    ///
    /// Both ends must be positive. Returns the geometric midpoint of the final
    /// bracket.
    pub fn bisect_predicate<P>(
        &self,
        mut held: f64,
        mut failed: f64,
        rel_precision: f64,
        mut pred: P,
    ) -> Result<f64>
    where
        P: FnMut(f64) -> Result<bool>,
    {
        for _ in 0..self.config.max_bisection_steps {
            let mid = geometric_mean(held, failed);
            if (failed - held).abs() <= rel_precision * held.abs().max(failed.abs()) {
                return Ok(mid);
            }
            let (lo, hi) = if held < failed {
                (held, failed)
            } else {
                (failed, held)
            };
            if !(mid > lo && mid < hi) {
                // a predicate boundary has no value gap to check
                return Ok(mid);
            }
            if pred(mid)? {
                held = mid;
            } else {
                failed = mid;
            }
        }

        Err(StatsError::non_convergence(
            "boundary bisection",
            self.config.max_bisection_steps,
        ))
    }
}

/// `sqrt(a * b)` without forming the product, which over- or underflows
/// for brackets near the ends of the f64 range.
fn geometric_mean(a: f64, b: f64) -> f64 {
    a.sqrt() * b.sqrt()
}
