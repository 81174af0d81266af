//! Uniform random initialization of weights and biases.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Error, Mlp, Result};

/// Default lower bound used by [`Mlp::randomize`].
pub const DEFAULT_LOWER: f64 = -0.1;
/// Default (exclusive) upper bound used by [`Mlp::randomize`].
pub const DEFAULT_UPPER: f64 = 0.1;

/// A generator seeded from the wall clock (nanosecond resolution).
///
/// Calls spaced by at least a microsecond get different seeds.
pub fn time_seeded_rng() -> StdRng {
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    log::trace!("seeding rng from clock: {seed}");
    StdRng::seed_from_u64(seed)
}

fn uniform(lower: f64, upper: f64) -> Result<Uniform<f64>> {
    if !(lower.is_finite() && upper.is_finite() && (upper - lower).is_finite()) {
        return Err(Error::Validation(format!(
            "random bounds must be finite, got [{lower}, {upper})"
        )));
    }
    if lower >= upper {
        return Err(Error::Validation(format!(
            "lower bound {lower} must be smaller than upper bound {upper}"
        )));
    }
    Ok(Uniform::new(lower, upper))
}

impl Mlp {
    /// Draws every weight and bias from `[-0.1, 0.1)` using a clock-seeded generator.
    pub fn randomize(&mut self) {
        self.randomize_with(&mut time_seeded_rng());
    }

    /// Draws every weight and bias from `[lower, upper)` using a clock-seeded generator.
    pub fn randomize_in(&mut self, lower: f64, upper: f64) -> Result<()> {
        let dist = uniform(lower, upper)?;
        self.fill_uniform(&mut time_seeded_rng(), &dist);
        Ok(())
    }

    /// Draws every weight and bias from `[-0.1, 0.1)` using `rng`.
    pub fn randomize_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let dist = Uniform::new(DEFAULT_LOWER, DEFAULT_UPPER);
        self.fill_uniform(rng, &dist);
    }

    /// Draws every weight and bias from `[lower, upper)` using `rng`.
    pub fn randomize_with_in<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        lower: f64,
        upper: f64,
    ) -> Result<()> {
        let dist = uniform(lower, upper)?;
        self.fill_uniform(rng, &dist);
        Ok(())
    }

    // Layer by layer: weights in row-major order, then biases.
    fn fill_uniform<R: Rng + ?Sized>(&mut self, rng: &mut R, dist: &Uniform<f64>) {
        for (w, b) in self.weights.iter_mut().zip(&mut self.biases) {
            for v in w.iter_mut() {
                *v = dist.sample(rng);
            }
            for v in b.iter_mut() {
                *v = dist.sample(rng);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_params(mlp: &Mlp) -> Vec<f64> {
        mlp.weights()
            .iter()
            .flat_map(|w| w.iter().copied())
            .chain(mlp.biases().iter().flat_map(|b| b.iter().copied()))
            .collect()
    }

    #[test]
    fn seeded_randomization_is_deterministic() {
        let mut a = Mlp::new(&[4, 3, 2]).unwrap();
        let mut b = a.clone();
        a.randomize_with(&mut StdRng::seed_from_u64(7));
        b.randomize_with(&mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
        assert!(all_params(&a).iter().all(|&v| (-0.1..0.1).contains(&v)));
        assert!(all_params(&a).iter().any(|&v| v != 0.0));
    }

    #[test]
    fn caller_rng_state_advances() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut a = Mlp::new(&[2, 2]).unwrap();
        a.randomize_with(&mut rng);
        let mut b = a.clone();
        b.randomize_with(&mut rng);
        assert_ne!(a, b);
    }

    #[test]
    fn custom_bounds_are_respected() {
        let mut mlp = Mlp::new(&[5, 6, 3]).unwrap();
        mlp.randomize_with_in(&mut StdRng::seed_from_u64(3), 2.0, 2.5)
            .unwrap();
        assert!(all_params(&mlp).iter().all(|&v| (2.0..2.5).contains(&v)));

        mlp.randomize_in(-3.0, -2.0).unwrap();
        assert!(all_params(&mlp).iter().all(|&v| (-3.0..-2.0).contains(&v)));
    }

    #[test]
    fn invalid_bounds_leave_the_machine_untouched() {
        let mut mlp = Mlp::new(&[2, 2]).unwrap();
        mlp.fill_weights(0.5);
        let before = mlp.clone();

        assert!(matches!(mlp.randomize_in(1.0, 1.0), Err(Error::Validation(_))));
        assert!(mlp.randomize_in(1.0, -1.0).is_err());
        assert!(
            mlp.randomize_with_in(&mut StdRng::seed_from_u64(0), f64::NEG_INFINITY, 0.0)
                .is_err()
        );
        assert_eq!(mlp, before);
    }

    #[test]
    fn clock_seeded_calls_differ() {
        let mut a = Mlp::new(&[3, 3]).unwrap();
        a.randomize();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let mut b = a.clone();
        b.randomize();
        assert_ne!(a, b);
    }
}
