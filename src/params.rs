//! Flattening of all weights and biases into a single parameter vector and back.
//!
//! The vector holds every weight matrix (row-major, layer order) followed by every
//! bias vector. Optimizers that work on one flat buffer use this layout.

use ndarray::{Array1, Array2, ArrayView1};

use crate::{Error, Mlp, Result};

/// Concatenates `weights` then `biases` into one vector.
pub fn unroll_parts(weights: &[Array2<f64>], biases: &[Array1<f64>]) -> Array1<f64> {
    let len = weights.iter().map(|w| w.len()).sum::<usize>()
        + biases.iter().map(|b| b.len()).sum::<usize>();
    let mut out = Vec::with_capacity(len);
    for w in weights {
        out.extend(w.iter().copied());
    }
    for b in biases {
        out.extend(b.iter().copied());
    }
    Array1::from(out)
}

/// Inverse of [`unroll_parts`]: overwrites `weights` and `biases` from `params`.
///
/// Nothing is written unless `params` has exactly the total parameter count.
pub fn roll_parts(
    weights: &mut [Array2<f64>],
    biases: &mut [Array1<f64>],
    params: ArrayView1<'_, f64>,
) -> Result<()> {
    let expected = weights.iter().map(|w| w.len()).sum::<usize>()
        + biases.iter().map(|b| b.len()).sum::<usize>();
    if params.len() != expected {
        return Err(Error::ShapeMismatch(format!(
            "parameter vector has length {}, expected {expected}",
            params.len()
        )));
    }

    let dst = weights
        .iter_mut()
        .flat_map(|w| w.iter_mut())
        .chain(biases.iter_mut().flat_map(|b| b.iter_mut()));
    for (d, s) in dst.zip(params.iter()) {
        *d = *s;
    }
    Ok(())
}

impl Mlp {
    /// Total number of weights and biases.
    pub fn num_parameters(&self) -> usize {
        self.weights.iter().map(|w| w.len()).sum::<usize>()
            + self.biases.iter().map(|b| b.len()).sum::<usize>()
    }

    /// All weights and biases as one vector (see the module docs for the layout).
    pub fn unroll(&self) -> Array1<f64> {
        unroll_parts(&self.weights, &self.biases)
    }

    /// Overwrites all weights and biases from a vector produced by [`Mlp::unroll`].
    pub fn roll(&mut self, params: ArrayView1<'_, f64>) -> Result<()> {
        roll_parts(&mut self.weights, &mut self.biases, params)
    }
}
