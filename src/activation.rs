//! Activation functors.
//!
//! Each layer computes an affine value `z = x W + b` and then applies an activation
//! element-wise: `y = f(z)`.
//!
//! Besides `f` and its derivative `f'`, every activation can express the derivative
//! in terms of its own output: `f'_from_f(f(z)) == f'(z)`. Training code caches the
//! post-activation outputs and uses this form, so `z` never has to be kept around.

use std::fmt;

use ndarray::{Array, ArrayBase, Data, DataMut, Dimension};

use crate::storage::{Storage, StorageMut, Value};
use crate::{Error, Result, apply};

/// Element-wise activation function.
#[derive(Debug, Clone, Copy, Default)]
pub enum Activation {
    /// `f(z) = z`
    Identity,
    /// `f(z) = c * z`
    Linear { c: f64 },
    /// `f(z) = tanh(z)`
    #[default]
    Tanh,
    /// `f(z) = c * tanh(m * z)`
    MultipliedTanh { c: f64, m: f64 },
    /// Logistic function `f(z) = 1 / (1 + e^-z)`.
    Sigmoid,
    ReLU,
    LeakyReLU { alpha: f64 },
}

/// Selects which of the three activation functions to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// `f(z)`
    F,
    /// `f'(z)`
    FPrime,
    /// `f'` expressed through the output `a = f(z)`.
    FPrimeFromF,
}

impl Activation {
    /// `Linear { c }` with a checked constant.
    pub fn linear(c: f64) -> Result<Self> {
        let act = Activation::Linear { c };
        act.validate()?;
        Ok(act)
    }

    /// `MultipliedTanh { c, m }` with checked constants.
    pub fn multiplied_tanh(c: f64, m: f64) -> Result<Self> {
        let act = Activation::MultipliedTanh { c, m };
        act.validate()?;
        Ok(act)
    }

    /// `LeakyReLU { alpha }` with a checked slope.
    pub fn leaky_relu(alpha: f64) -> Result<Self> {
        let act = Activation::LeakyReLU { alpha };
        act.validate()?;
        Ok(act)
    }

    /// Validate activation parameters.
    pub fn validate(self) -> Result<()> {
        match self {
            Activation::Linear { c } => {
                if !c.is_finite() {
                    return Err(Error::Construction(format!(
                        "linear activation constant must be finite, got {c}"
                    )));
                }
            }
            Activation::MultipliedTanh { c, m } => {
                if !(c.is_finite() && m.is_finite()) || c == 0.0 {
                    return Err(Error::Construction(format!(
                        "multiplied tanh constants must be finite with C != 0, got C={c} M={m}"
                    )));
                }
            }
            Activation::LeakyReLU { alpha } => {
                if !(alpha.is_finite() && alpha >= 0.0) {
                    return Err(Error::Construction(format!(
                        "leaky ReLU alpha must be finite and >= 0, got {alpha}"
                    )));
                }
            }
            Activation::Identity | Activation::Tanh | Activation::Sigmoid | Activation::ReLU => {}
        }

        Ok(())
    }

    /// Stable token naming the variant, used for persistence.
    pub fn unique_identifier(self) -> &'static str {
        match self {
            Activation::Identity => "activation.identity",
            Activation::Linear { .. } => "activation.linear",
            Activation::Tanh => "activation.tanh",
            Activation::MultipliedTanh { .. } => "activation.multiplied_tanh",
            Activation::Sigmoid => "activation.sigmoid",
            Activation::ReLU => "activation.relu",
            Activation::LeakyReLU { .. } => "activation.leaky_relu",
        }
    }

    #[inline]
    pub fn f(self, z: f64) -> f64 {
        match self {
            Activation::Identity => z,
            Activation::Linear { c } => c * z,
            Activation::Tanh => z.tanh(),
            Activation::MultipliedTanh { c, m } => c * (m * z).tanh(),
            Activation::Sigmoid => sigmoid(z),
            Activation::ReLU => z.max(0.0),
            Activation::LeakyReLU { alpha } => {
                if z > 0.0 {
                    z
                } else {
                    alpha * z
                }
            }
        }
    }

    #[inline]
    pub fn f_prime(self, z: f64) -> f64 {
        match self {
            Activation::Identity => 1.0,
            Activation::Linear { c } => c,
            Activation::Tanh | Activation::Sigmoid => self.f_prime_from_f(self.f(z)),
            Activation::MultipliedTanh { c, m } => {
                let t = (m * z).tanh();
                c * m * (1.0 - t * t)
            }
            Activation::ReLU => {
                if z > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::LeakyReLU { alpha } => {
                if z > 0.0 {
                    1.0
                } else {
                    alpha
                }
            }
        }
    }

    /// Derivative of the activation expressed in terms of its output `a = f(z)`.
    #[inline]
    pub fn f_prime_from_f(self, a: f64) -> f64 {
        match self {
            Activation::Identity => 1.0,
            Activation::Linear { c } => c,
            Activation::Tanh => 1.0 - a * a,
            Activation::MultipliedTanh { c, m } => m * (c - a * a / c),
            Activation::Sigmoid => a * (1.0 - a),
            Activation::ReLU => {
                if a > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::LeakyReLU { alpha } => {
                if a > 0.0 {
                    1.0
                } else {
                    alpha
                }
            }
        }
    }

    /// Scalar evaluation of the selected function.
    #[inline]
    pub fn evaluate(self, which: Evaluation, z: f64) -> f64 {
        match which {
            Evaluation::F => self.f(z),
            Evaluation::FPrime => self.f_prime(z),
            Evaluation::FPrimeFromF => self.f_prime_from_f(z),
        }
    }

    /// Evaluates `which` on every element of a 1 to 4 dimensional array.
    pub fn apply<S, D>(self, which: Evaluation, input: &ArrayBase<S, D>) -> Result<Array<f64, D>>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        apply::apply(move |z| self.evaluate(which, z), input)
    }

    /// Evaluates `which` on every element of `input`, writing into `output`.
    pub fn apply_into<S, SO, D>(
        self,
        which: Evaluation,
        input: &ArrayBase<S, D>,
        output: &mut ArrayBase<SO, D>,
    ) -> Result<()>
    where
        S: Data<Elem = f64>,
        SO: DataMut<Elem = f64>,
        D: Dimension,
    {
        apply::apply_into(move |z| self.evaluate(which, z), input, output)
    }

    /// Writes the identifier and parameters to `store`.
    pub fn save<S: StorageMut + ?Sized>(self, store: &mut S) -> Result<()> {
        store.write("id", Value::from(self.unique_identifier()))?;
        match self {
            Activation::Linear { c } => store.write("C", Value::Float(c))?,
            Activation::MultipliedTanh { c, m } => {
                store.write("C", Value::Float(c))?;
                store.write("M", Value::Float(m))?;
            }
            Activation::LeakyReLU { alpha } => store.write("alpha", Value::Float(alpha))?,
            Activation::Identity | Activation::Tanh | Activation::Sigmoid | Activation::ReLU => {}
        }
        Ok(())
    }

    /// Reads an activation previously written by [`Activation::save`].
    pub fn load<S: Storage + ?Sized>(store: &S) -> Result<Self> {
        let id = store.read_text("id")?;
        let act = match id.as_str() {
            "activation.identity" => Activation::Identity,
            "activation.linear" => Activation::Linear {
                c: store.read_float("C")?,
            },
            "activation.tanh" => Activation::Tanh,
            "activation.multiplied_tanh" => Activation::MultipliedTanh {
                c: store.read_float("C")?,
                m: store.read_float("M")?,
            },
            "activation.sigmoid" => Activation::Sigmoid,
            "activation.relu" => Activation::ReLU,
            "activation.leaky_relu" => Activation::LeakyReLU {
                alpha: store.read_float("alpha")?,
            },
            other => {
                return Err(Error::Load(format!(
                    "{}: unknown activation `{other}` at group {}",
                    store.name(),
                    store.group()
                )));
            }
        };

        act.validate().map_err(|e| {
            Error::Load(format!(
                "{}: invalid activation at group {}: {e}",
                store.name(),
                store.group()
            ))
        })?;
        Ok(act)
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.unique_identifier();
        match *self {
            Activation::Linear { c } => write!(f, "{id}(C={c})"),
            Activation::MultipliedTanh { c, m } => write!(f, "{id}(C={c}, M={m})"),
            Activation::LeakyReLU { alpha } => write!(f, "{id}(alpha={alpha})"),
            Activation::Identity | Activation::Tanh | Activation::Sigmoid | Activation::ReLU => {
                f.write_str(id)
            }
        }
    }
}

/// Two activations are equal when their descriptions (identifier and parameters) match.
impl PartialEq for Activation {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

#[inline]
fn sigmoid(x: f64) -> f64 {
    // Numerically stable sigmoid.
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}
