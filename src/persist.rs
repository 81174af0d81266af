//! Saving and loading machines through a [`Storage`] handle.
//!
//! Layout (relative to the handle's group):
//!
//! - `version`: format version (float)
//! - `shape`: layer sizes
//! - `weight_<i>`, `bias_<i>`: per-layer parameters
//! - `input_sub`, `input_div`: input normalization
//! - `hidden_activation/`, `output_activation/`: activation groups

use ndarray::{Array1, Array2, Ix1, Ix2};

use crate::mlp::validate_shape;
use crate::storage::{Scope, Storage, StorageMut, Value};
use crate::{Activation, Error, Mlp, Result};

pub const MLP_FORMAT_VERSION: f64 = 1.0;

fn load_error<S: Storage + ?Sized>(store: &S, msg: impl std::fmt::Display) -> Error {
    Error::Load(format!("{} (at group {}): {msg}", store.name(), store.group()))
}

impl Mlp {
    /// Writes the complete machine to `store`.
    pub fn save<S: StorageMut + ?Sized>(&self, store: &mut S) -> Result<()> {
        store.write("version", Value::Float(MLP_FORMAT_VERSION))?;
        store.write("shape", Value::Sizes(self.shape()))?;
        for (i, (w, b)) in self.weights.iter().zip(&self.biases).enumerate() {
            store.write(&format!("weight_{i}"), Value::Array(w.clone().into_dyn()))?;
            store.write(&format!("bias_{i}"), Value::Array(b.clone().into_dyn()))?;
        }
        store.write("input_sub", Value::Array(self.input_sub.clone().into_dyn()))?;
        store.write("input_div", Value::Array(self.input_div.clone().into_dyn()))?;

        self.hidden_activation
            .save(&mut Scope::new(&mut *store, "hidden_activation"))?;
        self.output_activation
            .save(&mut Scope::new(&mut *store, "output_activation"))?;

        log::debug!(
            "saved mlp {:?} to {} (at group {})",
            self.shape(),
            store.name(),
            store.group()
        );
        Ok(())
    }

    /// Reads a machine written by [`Mlp::save`], re-validating every dimension.
    pub fn load<S: Storage + ?Sized>(store: &S) -> Result<Self> {
        let version = store.read_float("version")?;
        if version != MLP_FORMAT_VERSION {
            return Err(load_error(
                store,
                format!("unsupported mlp format version {version}; expected {MLP_FORMAT_VERSION}"),
            ));
        }

        let shape = store.read_sizes("shape")?;
        validate_shape(&shape).map_err(|e| load_error(store, e))?;

        let mut weights = Vec::with_capacity(shape.len() - 1);
        let mut biases = Vec::with_capacity(shape.len() - 1);
        for (i, dims) in shape.windows(2).enumerate() {
            let w: Array2<f64> = store
                .read_array(&format!("weight_{i}"))?
                .into_dimensionality::<Ix2>()
                .map_err(|e| load_error(store, format!("weight_{i}: {e}")))?;
            if w.dim() != (dims[0], dims[1]) {
                return Err(load_error(
                    store,
                    format!(
                        "weight_{i} has shape {:?}, expected {:?}",
                        w.dim(),
                        (dims[0], dims[1])
                    ),
                ));
            }

            let b = read_vector(store, &format!("bias_{i}"), dims[1])?;
            weights.push(w);
            biases.push(b);
        }

        let input_sub = read_vector(store, "input_sub", shape[0])?;
        let input_div = read_vector(store, "input_div", shape[0])?;

        let hidden_activation = Activation::load(&Scope::new(store, "hidden_activation"))?;
        let output_activation = Activation::load(&Scope::new(store, "output_activation"))?;

        log::debug!("loaded mlp {shape:?} from {}", store.name());
        Ok(Self {
            weights,
            biases,
            input_sub,
            input_div,
            hidden_activation,
            output_activation,
        })
    }

    /// Replaces `self` with the machine stored in `store`.
    ///
    /// On error `self` is left unchanged.
    pub fn reload<S: Storage + ?Sized>(&mut self, store: &S) -> Result<()> {
        *self = Self::load(store)?;
        Ok(())
    }
}

fn read_vector<S: Storage + ?Sized>(store: &S, key: &str, len: usize) -> Result<Array1<f64>> {
    let v: Array1<f64> = store
        .read_array(key)?
        .into_dimensionality::<Ix1>()
        .map_err(|e| load_error(store, format!("{key}: {e}")))?;
    if v.len() != len {
        return Err(load_error(
            store,
            format!("{key} has length {}, expected {len}", v.len()),
        ));
    }
    Ok(v)
}
