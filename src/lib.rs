//! A feed-forward MLP machine with pluggable activation functors.
//!
//! `mlp-machine` holds the parameters of a fully-connected, strictly layered network
//! (weights, biases, input normalization and two activation choices) and evaluates it
//! on single samples or batches of rows.
//!
//! # Design goals
//!
//! - Clear contracts: shapes are validated at the API boundary, before anything is mutated.
//! - Exact persistence: `save` then `load` reproduces a machine that compares `==`.
//! - Training-friendly activations: every activation exposes `f`, `f'` and `f'` computed
//!   from `f`'s output.
//!
//! # Panics vs `Result`
//!
//! - Checked APIs return [`Result`]: [`Mlp::forward`], [`Mlp::forward_into`],
//!   [`apply::apply`], the setters and `load`.
//! - Unchecked hot paths panic on misuse: [`Mlp::forward_unchecked`],
//!   [`apply::apply_unchecked`].
//!
//! # Data layout and shapes
//!
//! - Scalars are `f64`; arrays are `ndarray` arrays.
//! - `weights[i]` has shape `(shape[i], shape[i + 1])`, and a layer computes `x W + b`.
//! - Batched inputs are 2D arrays of shape `(n_samples, input_size)`.
//!
//! # Quick start
//!
//! ```rust
//! use mlp_machine::{Activation, Mlp};
//! use ndarray::array;
//!
//! # fn main() -> mlp_machine::Result<()> {
//! let mut mlp = Mlp::new(&[2, 3, 1])?;
//! mlp.set_hidden_activation(Activation::Identity);
//! mlp.set_output_activation(Activation::Identity);
//! mlp.set_weights(vec![
//!     array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
//!     array![[1.0], [1.0], [1.0]],
//! ])?;
//!
//! let y = mlp.forward(&array![1.0, 2.0])?;
//! assert_eq!(y, array![3.0]);
//! # Ok(())
//! # }
//! ```
//!
//! # Persistence
//!
//! ```rust
//! use mlp_machine::{MemoryStore, Mlp};
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! # fn main() -> mlp_machine::Result<()> {
//! let mut mlp = Mlp::new(&[4, 8, 2])?;
//! mlp.randomize_with(&mut StdRng::seed_from_u64(0));
//!
//! let mut store = MemoryStore::new("model");
//! mlp.save(&mut store)?;
//! assert_eq!(Mlp::load(&store)?, mlp);
//! # Ok(())
//! # }
//! ```

pub mod activation;
pub mod apply;
pub mod error;
pub mod mlp;
pub mod params;
pub mod persist;
pub mod random;
pub mod storage;

pub use activation::{Activation, Evaluation};
pub use error::{Error, Result};
pub use mlp::{DEFAULT_A_EPSILON, DEFAULT_R_EPSILON, Mlp};
pub use params::{roll_parts, unroll_parts};
pub use random::time_seeded_rng;
pub use storage::{MemoryStore, Scope, Storage, StorageMut, Value};
