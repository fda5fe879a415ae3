//! The learned one-shot denoising step.
//!
//! For a state `x_t`, progress `t ∈ [0,1]` and injected noise `ξ`:
//!
//! \[
//! x_t' = x_t + \sqrt{1-t}\,\xi, \qquad
//! f_t = \tanh(W_2\,\mathrm{relu}(W_1 [x_t'; t] + b_1) + b_2), \qquad
//! x_{\text{next}} = x_t' + (1-t)\, f_t .
//! \]
//!
//! At `t = 1` both the noise and the correction vanish and the state passes through unchanged;
//! at `t = 0` the full noise is injected and the correction has unit weight.

use burn_core as burn;

use burn::module::Module;
use burn::tensor::activation;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use burn_nn::{Linear, LinearConfig, Relu};

/// Weight of the learned correction for a `[batch, 1]` progress column: \(1-t\).
pub fn correction_weight<B: Backend>(t: Tensor<B, 2>) -> Tensor<B, 2> {
    Tensor::<B, 2>::ones([t.dims()[0], 1], &t.device()) - t
}

/// Noise scale for a `[batch, 1]` progress column: \(\sqrt{1-t}\).
pub fn noise_scale<B: Backend>(t: Tensor<B, 2>) -> Tensor<B, 2> {
    correction_weight(t).sqrt()
}

/// Two-layer correction network plus the noise/blend arithmetic around it.
///
/// Input features are `[x_t', t]` (width `dims + 1`); the correction has width `dims`.
#[derive(Module, Debug)]
pub struct DiffusionStep<B: Backend> {
    l1: Linear<B>,
    l2: Linear<B>,
    dims: usize,
}

impl<B: Backend> DiffusionStep<B> {
    pub fn new(device: &B::Device, dims: usize) -> Self {
        let l1 = LinearConfig::new(dims + 1, dims).init(device);
        let l2 = LinearConfig::new(dims, dims).init(device);
        Self { l1, l2, dims }
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Advance every row one step. Rows are independent.
    ///
    /// Shapes:
    /// - `xt`: `[batch, dims]`
    /// - `t`: `[batch, 1]`, values in `[0, 1]`
    /// - `noise`: `[batch, dims]`
    /// Returns: `[batch, dims]`.
    pub fn forward(&self, xt: Tensor<B, 2>, t: Tensor<B, 2>, noise: Tensor<B, 2>) -> Tensor<B, 2> {
        let xt_prime = xt + noise * noise_scale(t.clone());
        let ft = self.correction(xt_prime.clone(), t.clone());
        xt_prime + ft * correction_weight(t)
    }

    /// The bounded correction `f_t ∈ [-1, 1]` for an already-noised state.
    pub fn correction(&self, xt_prime: Tensor<B, 2>, t: Tensor<B, 2>) -> Tensor<B, 2> {
        let feats = Tensor::cat(vec![xt_prime, t], 1);
        let h = Relu.forward(self.l1.forward(feats));
        activation::tanh(self.l2.forward(h))
    }

    pub(crate) fn layers(&self) -> [&Linear<B>; 2] {
        [&self.l1, &self.l2]
    }
}
