//! # diffscm
//!
//! A small generative model that learns to turn noise into approximations of flattened images
//! (e.g. 28×28 handwritten digits), trained end-to-end with burn autodiff.
//!
//! The crate implements:
//!
//! - a **one-shot denoising step** (`step`): noise the state by \(\sqrt{1-t}\,\xi\), then add a
//!   bounded learned correction weighted by \(1-t\),
//! - a **generative model** (`model`) that samples by applying that step once per sample over an
//!   evenly spaced progress grid, and reconstructs inputs through a Gaussian mean/scale head,
//! - a **training driver** (`train`) minimizing reconstruction MSE with an external optimizer.
//!
//! It does not download datasets, plot, or track experiments.
//!
//! ## Public invariants (must not change)
//!
//! - **Determinism knobs are explicit**: every random draw comes from a caller-supplied
//!   `rand::Rng`; `train::fit` seeds a `ChaCha8Rng` from `TrainConfig::seed`.
//! - **Sampling is one step per sample**: sample `i` of `n` gets progress `i/(n-1)` and exactly one
//!   step application. This is the defined contract, not a truncated diffusion chain.
//! - **The scale head is strictly positive** for every input.
//! - **`ndarray` at the edges**: batches enter as `ndarray` arrays; burn tensors stay inside the
//!   model and training loop.
//!
//! ## Module map
//!
//! - `step`: the denoising step
//! - `model`: sampling, training forward pass, `ndarray` inference helpers
//! - `train`: epoch loop, multi-epoch `fit`, Adam construction
//! - `data`: `Batch`, the `BatchSource` seam, an in-memory batcher
//! - `checkpoint`: save/load all parameters
//! - `schedule`: progress grids and training-time progress sampling
//! - `noise`, `convert`: seeded draws and `ndarray` ⇄ tensor plumbing
//! - `metrics`: reconstruction error

pub mod checkpoint;
pub mod convert;
pub mod data;
pub mod metrics;
pub mod model;
pub mod noise;
pub mod schedule;
pub mod step;
pub mod train;

use burn_autodiff::Autodiff;
use burn_ndarray::NdArray;

/// Default training backend: ndarray + autodiff (CPU).
pub type TrainBackend = Autodiff<NdArray<f32>>;

/// diffscm error variants.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("shape mismatch: {0}")]
    Shape(&'static str),
    #[error("dimension mismatch: expected width {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("domain error: {0}")]
    Domain(&'static str),
    #[error("tensor data error: {0}")]
    Tensor(String),
    #[error("checkpoint error: {0}")]
    Checkpoint(String),
}

pub type Result<T> = std::result::Result<T, Error>;
