//! Elementwise application of a scalar function over 1 to 4 dimensional arrays.
//!
//! Every output element depends only on the input element at the same index, so
//! traversal order is free. With the `rayon` feature the loop runs in parallel.

use ndarray::{Array, ArrayBase, Data, DataMut, Dimension, Zip};

use crate::{Error, Result};

/// Highest array rank accepted by [`apply`] and [`apply_into`].
pub const MAX_RANK: usize = 4;

pub(crate) fn check_rank(what: &str, ndim: usize) -> Result<()> {
    if !(1..=MAX_RANK).contains(&ndim) {
        return Err(Error::ShapeMismatch(format!(
            "{what} must be 1, 2, 3 or 4-dimensional, got a {ndim}D array"
        )));
    }
    Ok(())
}

/// Applies `f` to every element of `input`, returning a new array of the same shape.
pub fn apply<F, S, D>(f: F, input: &ArrayBase<S, D>) -> Result<Array<f64, D>>
where
    F: Fn(f64) -> f64 + Send + Sync,
    S: Data<Elem = f64>,
    D: Dimension,
{
    check_rank("input", input.ndim())?;

    let mut output = Array::zeros(input.raw_dim());
    apply_unchecked(f, input, &mut output);
    Ok(output)
}

/// Applies `f` to every element of `input`, writing into `output`.
///
/// `output` must have the rank and extents of `input`; it is left untouched on error.
pub fn apply_into<F, S, SO, D>(
    f: F,
    input: &ArrayBase<S, D>,
    output: &mut ArrayBase<SO, D>,
) -> Result<()>
where
    F: Fn(f64) -> f64 + Send + Sync,
    S: Data<Elem = f64>,
    SO: DataMut<Elem = f64>,
    D: Dimension,
{
    check_rank("input", input.ndim())?;
    if output.ndim() != input.ndim() {
        return Err(Error::ShapeMismatch(format!(
            "output has {} dimensions, input has {}",
            output.ndim(),
            input.ndim()
        )));
    }
    if output.shape() != input.shape() {
        return Err(Error::ShapeMismatch(format!(
            "output shape {:?} does not match input shape {:?}",
            output.shape(),
            input.shape()
        )));
    }

    apply_unchecked(f, input, output);
    Ok(())
}

/// Core loop without validation.
///
/// # Panics
///
/// Panics if `input` and `output` shapes differ.
pub fn apply_unchecked<F, S, SO, D>(
    f: F,
    input: &ArrayBase<S, D>,
    output: &mut ArrayBase<SO, D>,
) where
    F: Fn(f64) -> f64 + Send + Sync,
    S: Data<Elem = f64>,
    SO: DataMut<Elem = f64>,
    D: Dimension,
{
    let zip = Zip::from(output).and(input);

    #[cfg(feature = "rayon")]
    zip.par_for_each(|y, &x| *y = f(x));

    #[cfg(not(feature = "rayon"))]
    zip.for_each(|y, &x| *y = f(x));
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2, Array3, Array4, ArrayD, IxDyn, array};

    fn square(x: f64) -> f64 {
        x * x
    }

    #[test]
    fn applies_over_every_supported_rank() {
        let x1 = Array1::linspace(-1.0, 1.0, 7);
        let y1 = apply(square, &x1).unwrap();
        assert_eq!(y1, x1.mapv(square));

        let x2 = Array2::from_shape_fn((3, 4), |(i, j)| i as f64 - j as f64);
        assert_eq!(apply(square, &x2).unwrap(), x2.mapv(square));

        let x3 = Array3::from_shape_fn((2, 3, 4), |(i, j, k)| (i * 12 + j * 4 + k) as f64);
        assert_eq!(apply(square, &x3).unwrap(), x3.mapv(square));

        let x4 = Array4::from_shape_fn((2, 2, 3, 2), |(i, j, k, l)| (i + j + k + l) as f64 * 0.5);
        assert_eq!(apply(square, &x4).unwrap(), x4.mapv(square));
    }

    #[test]
    fn apply_into_writes_the_caller_buffer() {
        let x = array![[1.0, -2.0], [3.0, -4.0]];
        let mut y = Array2::zeros((2, 2));
        apply_into(f64::abs, &x, &mut y).unwrap();
        assert_eq!(y, array![[1.0, 2.0], [3.0, 4.0]]);
    }

    #[test]
    fn apply_into_accepts_transposed_views() {
        let x = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let mut y = Array2::zeros((3, 2));
        apply_into(square, &x.t(), &mut y).unwrap();
        assert_eq!(y, array![[1.0, 16.0], [4.0, 25.0], [9.0, 36.0]]);
    }

    #[test]
    fn rejects_rank_zero_and_rank_five() {
        let scalar = ArrayD::<f64>::zeros(IxDyn(&[]));
        assert!(matches!(
            apply(square, &scalar),
            Err(Error::ShapeMismatch(_))
        ));

        let five = ArrayD::<f64>::zeros(IxDyn(&[1, 1, 1, 1, 2]));
        assert!(matches!(apply(square, &five), Err(Error::ShapeMismatch(_))));
    }

    #[test]
    fn rejects_mismatched_output_without_writing() {
        let x = array![1.0, 2.0, 3.0];
        let mut y = Array1::from_elem(4, 7.0);
        let err = apply_into(square, &x, &mut y).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch(_)));
        assert!(y.iter().all(|&v| v == 7.0));

        let x = ArrayD::<f64>::zeros(IxDyn(&[2, 2]));
        let mut y = ArrayD::<f64>::zeros(IxDyn(&[4]));
        assert!(apply_into(square, &x, &mut y).is_err());
    }
}
