use ndarray::{
    Array, Array1, Array2, ArrayBase, ArrayView1, ArrayViewMut1, Axis, Data, DataMut, Dimension,
    Zip,
};

use crate::{Activation, Error, Result};

/// Default relative tolerance for [`Mlp::is_similar_to`].
pub const DEFAULT_R_EPSILON: f64 = 1e-5;
/// Default absolute tolerance for [`Mlp::is_similar_to`].
pub const DEFAULT_A_EPSILON: f64 = 1e-8;

/// A fully-connected, strictly layered feed-forward network.
///
/// For a machine of shape `(n0, n1, ..., nk)`:
/// - `weights[i]` is a `(n_i, n_{i+1})` matrix, applied as `x W` to a row vector `x`
/// - `biases[i]` has length `n_{i+1}`
/// - inputs are normalized as `(x - input_subtract) / input_divide` before the first layer
/// - every layer but the last uses `hidden_activation`, the last uses `output_activation`
#[derive(Debug, Clone, PartialEq)]
pub struct Mlp {
    pub(crate) weights: Vec<Array2<f64>>,
    pub(crate) biases: Vec<Array1<f64>>,
    pub(crate) input_sub: Array1<f64>,
    pub(crate) input_div: Array1<f64>,
    pub(crate) hidden_activation: Activation,
    pub(crate) output_activation: Activation,
}

pub(crate) fn validate_shape(shape: &[usize]) -> std::result::Result<(), String> {
    if shape.len() < 2 {
        return Err(format!(
            "shape must include input and output sizes, got {shape:?}"
        ));
    }
    if shape.contains(&0) {
        return Err(format!("all layer sizes must be > 0, got {shape:?}"));
    }
    Ok(())
}

impl Mlp {
    /// Zero-initialized machine with `tanh` activations everywhere.
    ///
    /// `shape` lists the input size, the hidden layer widths and the output size.
    pub fn new(shape: &[usize]) -> Result<Self> {
        validate_shape(shape).map_err(Error::Construction)?;

        let (weights, biases) = zero_layers(shape);
        Ok(Self {
            weights,
            biases,
            input_sub: Array1::zeros(shape[0]),
            input_div: Array1::ones(shape[0]),
            hidden_activation: Activation::default(),
            output_activation: Activation::default(),
        })
    }

    /// `(input, hidden0, ..., hiddenN, output)`
    pub fn shape(&self) -> Vec<usize> {
        let mut shape = Vec::with_capacity(self.weights.len() + 1);
        shape.push(self.input_size());
        shape.extend(self.weights.iter().map(|w| w.ncols()));
        shape
    }

    #[inline]
    pub fn input_size(&self) -> usize {
        self.input_sub.len()
    }

    #[inline]
    pub fn output_size(&self) -> usize {
        self.biases.last().map_or(0, |b| b.len())
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.weights.len()
    }

    pub fn weights(&self) -> &[Array2<f64>] {
        &self.weights
    }

    pub fn biases(&self) -> &[Array1<f64>] {
        &self.biases
    }

    pub fn input_subtract(&self) -> &Array1<f64> {
        &self.input_sub
    }

    pub fn input_divide(&self) -> &Array1<f64> {
        &self.input_div
    }

    pub fn hidden_activation(&self) -> Activation {
        self.hidden_activation
    }

    pub fn output_activation(&self) -> Activation {
        self.output_activation
    }

    /// Resizes the network. All weights and biases are reset to zero.
    ///
    /// If the input size changes, the normalization vectors are reset to zeros / ones.
    /// Activations are kept.
    pub fn set_shape(&mut self, shape: &[usize]) -> Result<()> {
        validate_shape(shape).map_err(Error::Construction)?;

        let (weights, biases) = zero_layers(shape);
        self.weights = weights;
        self.biases = biases;
        if self.input_sub.len() != shape[0] {
            self.input_sub = Array1::zeros(shape[0]);
            self.input_div = Array1::ones(shape[0]);
        }
        log::debug!("resized mlp to {shape:?}");
        Ok(())
    }

    /// Replaces every weight matrix. Shapes must match the current ones.
    pub fn set_weights(&mut self, weights: Vec<Array2<f64>>) -> Result<()> {
        if weights.len() != self.weights.len() {
            return Err(Error::ShapeMismatch(format!(
                "got {} weight matrices, machine has {} layers",
                weights.len(),
                self.weights.len()
            )));
        }
        for (i, (new, old)) in weights.iter().zip(&self.weights).enumerate() {
            if new.dim() != old.dim() {
                return Err(Error::ShapeMismatch(format!(
                    "weight {i} has shape {:?}, expected {:?}",
                    new.dim(),
                    old.dim()
                )));
            }
        }
        self.weights = weights;
        Ok(())
    }

    /// Sets every weight to `value`.
    pub fn fill_weights(&mut self, value: f64) {
        for w in &mut self.weights {
            w.fill(value);
        }
    }

    /// Replaces every bias vector. Lengths must match the current ones.
    pub fn set_biases(&mut self, biases: Vec<Array1<f64>>) -> Result<()> {
        if biases.len() != self.biases.len() {
            return Err(Error::ShapeMismatch(format!(
                "got {} bias vectors, machine has {} layers",
                biases.len(),
                self.biases.len()
            )));
        }
        for (i, (new, old)) in biases.iter().zip(&self.biases).enumerate() {
            if new.len() != old.len() {
                return Err(Error::ShapeMismatch(format!(
                    "bias {i} has length {}, expected {}",
                    new.len(),
                    old.len()
                )));
            }
        }
        self.biases = biases;
        Ok(())
    }

    /// Sets every bias to `value`.
    pub fn fill_biases(&mut self, value: f64) {
        for b in &mut self.biases {
            b.fill(value);
        }
    }

    pub fn set_input_subtract(&mut self, input_subtract: Array1<f64>) -> Result<()> {
        self.check_input_vector("input subtraction", &input_subtract)?;
        self.input_sub = input_subtract;
        Ok(())
    }

    pub fn fill_input_subtract(&mut self, value: f64) {
        self.input_sub.fill(value);
    }

    pub fn set_input_divide(&mut self, input_divide: Array1<f64>) -> Result<()> {
        self.check_input_vector("input division", &input_divide)?;
        self.input_div = input_divide;
        Ok(())
    }

    pub fn fill_input_divide(&mut self, value: f64) {
        self.input_div.fill(value);
    }

    pub fn set_hidden_activation(&mut self, activation: Activation) {
        self.hidden_activation = activation;
    }

    pub fn set_output_activation(&mut self, activation: Activation) {
        self.output_activation = activation;
    }

    fn check_input_vector(&self, what: &str, v: &Array1<f64>) -> Result<()> {
        if v.len() != self.input_size() {
            return Err(Error::ShapeMismatch(format!(
                "{what} vector has length {}, machine input size is {}",
                v.len(),
                self.input_size()
            )));
        }
        Ok(())
    }

    /// Evaluates the network on a single sample (1D) or a batch of rows (2D).
    ///
    /// Returns an array of the input's rank whose last dimension is `output_size()`.
    pub fn forward<S, D>(&self, input: &ArrayBase<S, D>) -> Result<Array<f64, D>>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        self.check_input(input.shape())?;

        let mut dim = input.raw_dim();
        let last = dim.ndim() - 1;
        dim[last] = self.output_size();
        let mut output = Array::zeros(dim);
        self.forward_unchecked(input, &mut output);
        Ok(output)
    }

    /// Like [`Mlp::forward`], writing into a caller-supplied `output`.
    ///
    /// All shapes are validated before anything is written.
    pub fn forward_into<S, SO, D>(
        &self,
        input: &ArrayBase<S, D>,
        output: &mut ArrayBase<SO, D>,
    ) -> Result<()>
    where
        S: Data<Elem = f64>,
        SO: DataMut<Elem = f64>,
        D: Dimension,
    {
        self.check_input(input.shape())?;
        self.check_output(input.shape(), output.shape())?;
        self.forward_unchecked(input, output);
        Ok(())
    }

    /// Forward pass without shape validation.
    ///
    /// # Panics
    ///
    /// Panics if `input` is not 1D or 2D with `input_size()` columns, or if `output`
    /// does not have the matching output shape.
    pub fn forward_unchecked<S, SO, D>(
        &self,
        input: &ArrayBase<S, D>,
        output: &mut ArrayBase<SO, D>,
    ) where
        S: Data<Elem = f64>,
        SO: DataMut<Elem = f64>,
        D: Dimension,
    {
        let axis = Axis(input.ndim() - 1);
        let zip = Zip::from(input.lanes(axis)).and(output.lanes_mut(axis));

        #[cfg(feature = "rayon")]
        zip.par_for_each(|x, y| self.forward_sample(x, y));

        #[cfg(not(feature = "rayon"))]
        zip.for_each(|x, y| self.forward_sample(x, y));
    }

    fn forward_sample(&self, x: ArrayView1<'_, f64>, mut y: ArrayViewMut1<'_, f64>) {
        let mut a = (&x - &self.input_sub) / &self.input_div;

        let last = self.weights.len() - 1;
        for (idx, (w, b)) in self.weights.iter().zip(&self.biases).enumerate() {
            let act = if idx == last {
                self.output_activation
            } else {
                self.hidden_activation
            };
            let mut z = a.dot(w);
            z += b;
            z.mapv_inplace(|v| act.f(v));
            a = z;
        }

        y.assign(&a);
    }

    fn check_input(&self, shape: &[usize]) -> Result<()> {
        if !(1..=2).contains(&shape.len()) {
            return Err(Error::ShapeMismatch(format!(
                "cannot forward arrays of dimensionality {}; only 1D and 2D arrays are supported",
                shape.len()
            )));
        }
        let cols = shape[shape.len() - 1];
        if cols != self.input_size() {
            return Err(Error::ShapeMismatch(format!(
                "input has {cols} columns, machine input size is {}",
                self.input_size()
            )));
        }
        Ok(())
    }

    fn check_output(&self, input: &[usize], output: &[usize]) -> Result<()> {
        if output.len() != input.len() {
            return Err(Error::ShapeMismatch(format!(
                "output has {} dimensions, input has {}",
                output.len(),
                input.len()
            )));
        }
        let cols = output[output.len() - 1];
        if cols != self.output_size() {
            return Err(Error::ShapeMismatch(format!(
                "output has {cols} columns, machine output size is {}",
                self.output_size()
            )));
        }
        if input.len() == 2 && output[0] != input[0] {
            return Err(Error::ShapeMismatch(format!(
                "output has {} rows, input has {}",
                output[0], input[0]
            )));
        }
        Ok(())
    }

    /// Approximate equality: every weight, bias and normalization element must satisfy
    /// `|a - b| <= a_epsilon + r_epsilon * |b|` (with `b` taken from `other`), and the
    /// activations must be equal.
    pub fn is_similar_to(&self, other: &Mlp, r_epsilon: f64, a_epsilon: f64) -> bool {
        if self.shape() != other.shape() {
            return false;
        }
        if self.hidden_activation != other.hidden_activation
            || self.output_activation != other.output_activation
        {
            return false;
        }

        self.weights
            .iter()
            .zip(&other.weights)
            .all(|(x, y)| all_close(x, y, r_epsilon, a_epsilon))
            && self
                .biases
                .iter()
                .zip(&other.biases)
                .all(|(x, y)| all_close(x, y, r_epsilon, a_epsilon))
            && all_close(&self.input_sub, &other.input_sub, r_epsilon, a_epsilon)
            && all_close(&self.input_div, &other.input_div, r_epsilon, a_epsilon)
    }
}

fn all_close<S1, S2, D>(
    a: &ArrayBase<S1, D>,
    b: &ArrayBase<S2, D>,
    r_epsilon: f64,
    a_epsilon: f64,
) -> bool
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
    D: Dimension,
{
    a.shape() == b.shape()
        && Zip::from(a)
            .and(b)
            .all(|&x, &y| (x - y).abs() <= a_epsilon + r_epsilon * y.abs())
}

fn zero_layers(shape: &[usize]) -> (Vec<Array2<f64>>, Vec<Array1<f64>>) {
    let mut weights = Vec::with_capacity(shape.len() - 1);
    let mut biases = Vec::with_capacity(shape.len() - 1);
    for w in shape.windows(2) {
        weights.push(Array2::zeros((w[0], w[1])));
        biases.push(Array1::zeros(w[1]));
    }
    (weights, biases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array3, array};

    fn identity_231() -> Mlp {
        let mut mlp = Mlp::new(&[2, 3, 1]).unwrap();
        mlp.set_hidden_activation(Activation::Identity);
        mlp.set_output_activation(Activation::Identity);
        mlp.set_weights(vec![
            array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            array![[1.0], [1.0], [1.0]],
        ])
        .unwrap();
        mlp
    }

    #[test]
    fn new_allocates_zeroed_layers() {
        let mlp = Mlp::new(&[4, 5, 2]).unwrap();
        assert_eq!(mlp.shape(), vec![4, 5, 2]);
        assert_eq!(mlp.num_layers(), 2);
        assert_eq!(mlp.weights()[0].dim(), (4, 5));
        assert_eq!(mlp.weights()[1].dim(), (5, 2));
        assert_eq!(mlp.biases()[0].len(), 5);
        assert_eq!(mlp.biases()[1].len(), 2);
        assert_eq!(mlp.input_subtract(), &Array1::<f64>::zeros(4));
        assert_eq!(mlp.input_divide(), &Array1::<f64>::ones(4));
        assert_eq!(mlp.hidden_activation(), Activation::Tanh);
        assert_eq!(mlp.output_activation(), Activation::Tanh);
    }

    #[test]
    fn new_rejects_degenerate_shapes() {
        assert!(matches!(Mlp::new(&[3]), Err(Error::Construction(_))));
        assert!(matches!(Mlp::new(&[3, 0, 1]), Err(Error::Construction(_))));
        assert!(Mlp::new(&[3, 1]).is_ok());
    }

    #[test]
    fn identity_network_sums_selected_inputs() {
        let mlp = identity_231();
        let out = mlp.forward(&array![1.0, 2.0]).unwrap();
        assert_eq!(out, array![3.0]);
    }

    #[test]
    fn batch_rows_are_independent_samples() {
        let mut mlp = identity_231();
        mlp.set_hidden_activation(Activation::Tanh);
        mlp.fill_biases(0.25);

        let batch = array![[1.0, 2.0], [-0.5, 0.1], [0.0, 0.0]];
        let out = mlp.forward(&batch).unwrap();
        assert_eq!(out.dim(), (3, 1));
        for (row, y) in batch.rows().into_iter().zip(out.rows()) {
            assert_eq!(mlp.forward(&row).unwrap(), y);
        }
    }

    #[test]
    fn input_normalization_is_applied_first() {
        let mut mlp = identity_231();
        mlp.set_input_subtract(array![1.0, 1.0]).unwrap();
        mlp.set_input_divide(array![2.0, 0.5]).unwrap();
        // ((3 - 1) / 2) + ((2 - 1) / 0.5) = 1 + 2
        assert_eq!(mlp.forward(&array![3.0, 2.0]).unwrap(), array![3.0]);
    }

    #[test]
    fn output_layer_uses_output_activation() {
        let mut mlp = identity_231();
        mlp.set_output_activation(Activation::Linear { c: -2.0 });
        assert_eq!(mlp.forward(&array![1.0, 2.0]).unwrap(), array![-6.0]);
    }

    #[test]
    fn forward_is_repeatable() {
        let mut mlp = Mlp::new(&[3, 4, 2]).unwrap();
        mlp.fill_weights(0.3);
        mlp.fill_biases(-0.1);
        let x = array![[0.2, -0.4, 0.9], [1.0, 2.0, 3.0]];
        let a = mlp.forward(&x).unwrap();
        let b = mlp.forward(&x).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn forward_into_validates_before_writing() {
        let mlp = identity_231();
        let before = mlp.clone();

        let mut wrong_cols = Array2::from_elem((2, 2), 9.0);
        let err = mlp
            .forward_into(&array![[1.0, 2.0], [3.0, 4.0]], &mut wrong_cols)
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch(_)));
        assert!(wrong_cols.iter().all(|&v| v == 9.0));

        let mut wrong_rows = Array2::zeros((3, 1));
        assert!(
            mlp.forward_into(&array![[1.0, 2.0], [3.0, 4.0]], &mut wrong_rows)
                .is_err()
        );

        let mut out = Array2::zeros((2, 1));
        mlp.forward_into(&array![[1.0, 2.0], [3.0, 4.0]], &mut out)
            .unwrap();
        assert_eq!(out, array![[3.0], [7.0]]);
        assert_eq!(mlp, before);
    }

    #[test]
    fn forward_rejects_bad_inputs() {
        let mlp = identity_231();
        assert!(mlp.forward(&array![1.0, 2.0, 3.0]).is_err());
        assert!(mlp.forward(&Array3::<f64>::zeros((1, 1, 2))).is_err());
    }

    #[test]
    fn set_shape_resets_parameters() {
        let mut mlp = identity_231();
        mlp.fill_biases(1.0);
        mlp.set_input_subtract(array![0.5, 0.5]).unwrap();

        mlp.set_shape(&[2, 4, 3]).unwrap();
        assert_eq!(mlp.shape(), vec![2, 4, 3]);
        assert!(mlp.weights().iter().all(|w| w.iter().all(|&v| v == 0.0)));
        assert!(mlp.biases().iter().all(|b| b.iter().all(|&v| v == 0.0)));
        // Input size unchanged: normalization kept.
        assert_eq!(mlp.input_subtract(), &array![0.5, 0.5]);
        assert_eq!(mlp.hidden_activation(), Activation::Identity);

        mlp.set_shape(&[5, 1]).unwrap();
        assert_eq!(mlp.input_subtract(), &Array1::<f64>::zeros(5));
        assert_eq!(mlp.input_divide(), &Array1::<f64>::ones(5));

        assert!(mlp.set_shape(&[5]).is_err());
        assert_eq!(mlp.shape(), vec![5, 1]);
    }

    #[test]
    fn setters_reject_mismatched_shapes_without_mutation() {
        let mut mlp = identity_231();
        let before = mlp.clone();

        assert!(mlp.set_weights(vec![Array2::zeros((2, 3))]).is_err());
        assert!(
            mlp.set_weights(vec![Array2::zeros((2, 3)), Array2::zeros((2, 1))])
                .is_err()
        );
        assert!(mlp.set_biases(vec![Array1::zeros(3), Array1::zeros(2)]).is_err());
        assert!(mlp.set_input_subtract(Array1::zeros(3)).is_err());
        assert!(mlp.set_input_divide(Array1::ones(1)).is_err());
        assert_eq!(mlp, before);
    }

    #[test]
    fn similarity_uses_relative_and_absolute_tolerance() {
        let mut a = Mlp::new(&[2, 2, 1]).unwrap();
        a.fill_weights(1.0);
        let mut b = a.clone();
        assert!(a.is_similar_to(&b, DEFAULT_R_EPSILON, DEFAULT_A_EPSILON));

        b.fill_weights(1.0 + 1e-9);
        assert_ne!(a, b);
        assert!(a.is_similar_to(&b, 0.0, 1e-8));

        b.fill_weights(1.001);
        assert!(!a.is_similar_to(&b, 1e-5, 1e-8));
        assert!(a.is_similar_to(&b, 1e-2, 0.0));

        let mut c = a.clone();
        c.set_output_activation(Activation::Identity);
        assert!(!a.is_similar_to(&c, 1.0, 1.0));

        let d = Mlp::new(&[2, 3, 1]).unwrap();
        assert!(!a.is_similar_to(&d, 1.0, 1.0));
    }
}
