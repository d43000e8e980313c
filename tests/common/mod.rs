//! Common test utilities and data generators.

use faer::Col;
use rand::SeedableRng;
use rand_distr::{Distribution, Gamma, Normal};
use rand_xoshiro::Xoshiro256PlusPlus;

/// Independent Gamma(shape, 1) observations.
pub fn generate_gamma_series(n: usize, shape: f64, seed: u64) -> Col<f64> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let gamma = Gamma::new(shape, 1.0).unwrap();
    let mut y = Col::<f64>::zeros(n);
    for i in 0..n {
        y[i] = gamma.sample(&mut rng);
    }
    y
}

/// Piecewise linear trend with a kink at `n / 2`, plus Gaussian noise.
///
/// Returns (observations, true trend).
pub fn generate_kinked_series(n: usize, noise_std: f64, seed: u64) -> (Col<f64>, Col<f64>) {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let noise = Normal::new(0.0, noise_std).unwrap();
    let kink = (n / 2) as f64;

    let trend = Col::from_fn(n, |i| {
        let t = i as f64;
        if t < kink {
            0.2 * t
        } else {
            0.2 * kink - 0.1 * (t - kink)
        }
    });
    let mut y = Col::<f64>::zeros(n);
    for i in 0..n {
        y[i] = trend[i] + noise.sample(&mut rng);
    }
    (y, trend)
}
