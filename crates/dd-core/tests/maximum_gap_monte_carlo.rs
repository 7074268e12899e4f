//! Monte Carlo check of the maximum-gap p-value.
//!
//! Events are thrown uniformly in a unit interval of expected signal with a
//! Poisson number of events. The p-value is the probability that the largest
//! gap, measured in expected events, is at least the given one.

use dd_core::inference::maximum_gap_log_p_value;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const TRIALS: usize = 20_000;
const TOLERANCE: f64 = 0.02;

fn sample_poisson(rng: &mut StdRng, mean: f64) -> usize {
    let limit = (-mean).exp();
    let mut k = 0;
    let mut product = rng.random::<f64>();
    while product > limit {
        k += 1;
        product *= rng.random::<f64>();
    }
    k
}

fn largest_gap(rng: &mut StdRng, mean: f64) -> f64 {
    let n = sample_poisson(rng, mean);
    let mut points: Vec<f64> = (0..n).map(|_| rng.random::<f64>()).collect();
    points.sort_by(f64::total_cmp);

    let mut previous = 0.0;
    let mut largest = 0.0_f64;
    for &p in &points {
        largest = largest.max(p - previous);
        previous = p;
    }
    largest.max(1.0 - previous) * mean
}

fn simulated_p_value(seed: u64, mean: f64, gap: f64) -> f64 {
    let mut rng = StdRng::seed_from_u64(seed);
    let at_least = (0..TRIALS)
        .filter(|_| largest_gap(&mut rng, mean) >= gap)
        .count();
    at_least as f64 / TRIALS as f64
}

fn check(mean: f64, gap: f64, seed: u64) {
    let analytic = maximum_gap_log_p_value(mean, gap).unwrap().exp();
    let simulated = simulated_p_value(seed, mean, gap);
    assert!(
        (analytic - simulated).abs() < TOLERANCE,
        "mean={mean} gap={gap}: analytic {analytic:.4}, simulated {simulated:.4}"
    );
}

#[test]
fn one_term() {
    check(3.0, 2.0, 1);
}

#[test]
fn two_terms() {
    check(5.0, 2.0, 2);
}

#[test]
fn three_terms() {
    check(6.0, 1.8, 3);
    check(8.0, 2.5, 4);
}

#[test]
fn five_terms() {
    check(10.0, 2.0, 5);
}
