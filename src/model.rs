//! The generative model: a one-shot denoising step followed by a Gaussian output head.
//!
//! Sampling draws `x0 ~ N(0, I)` and noise `ξ ~ N(0, I)`, gives row `i` of `n` the progress value
//! `t_i = i / (n-1)` and applies [`DiffusionStep`] **once** to each row. There is no multi-step
//! refinement chain: the sample index, not an iteration counter, walks the progress grid.
//!
//! The training forward pass maps a fresh sample batch through a mean head `μ(·)` and a
//! strictly positive scale head `σ(·) = softplus(·)`, draws \(x' = μ + σ ⊙ ε\), and blends it
//! with the input per row: \((1-t)\,x + t\,x'\) with `t ~ U[0,1)` drawn per row.

use burn_core as burn;

use burn::module::Module;
use burn::tensor::activation;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use burn_nn::{Linear, LinearConfig};
use ndarray::{Array2, ArrayView2};

use crate::convert::{array2_to_tensor, column_to_tensor, tensor_to_array2, tensor_to_vec};
use crate::noise::standard_normal;
use crate::schedule::{linspace_progress, uniform_progress};
use crate::step::DiffusionStep;
use crate::{Error, Result};

/// Lower bound on the scale head output.
///
/// Softplus is positive in exact arithmetic but underflows to `0.0` in `f32` for very negative
/// inputs; the floor keeps `σ > 0` unconditionally.
pub const SCALE_FLOOR: f32 = f32::MIN_POSITIVE;

/// Model configuration.
#[derive(Debug, Clone)]
pub struct DiffScmConfig {
    /// Flattened sample width (784 for 28×28 digits).
    pub dims: usize,
}

impl Default for DiffScmConfig {
    fn default() -> Self {
        Self { dims: 784 }
    }
}

impl DiffScmConfig {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }

    pub fn validate(&self) -> Result<()> {
        if self.dims == 0 {
            return Err(Error::Domain("dims must be >= 1"));
        }
        Ok(())
    }

    /// Allocate a freshly initialized model on `device`.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<DiffScm<B>> {
        self.validate()?;
        let d = self.dims;
        Ok(DiffScm {
            diffusion: DiffusionStep::new(device, d),
            mean: LinearConfig::new(d, d).init(device),
            var: LinearConfig::new(d, d).init(device),
            dims: d,
        })
    }
}

#[derive(Module, Debug)]
pub struct DiffScm<B: Backend> {
    diffusion: DiffusionStep<B>,
    mean: Linear<B>,
    var: Linear<B>,
    dims: usize,
}

impl<B: Backend> DiffScm<B> {
    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn step(&self) -> &DiffusionStep<B> {
        &self.diffusion
    }

    /// Mean head `μ(x)`.
    pub fn mean(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        self.mean.forward(x)
    }

    /// Scale head `σ(x) = max(softplus(Wx + b), SCALE_FLOOR)`; strictly positive.
    pub fn scale(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        activation::softplus(self.var.forward(x), 1.0).clamp_min(SCALE_FLOOR)
    }

    /// Generate `n` samples, one denoising step each.
    ///
    /// Row `i` uses progress `linspace(0, 1, n)[i]` together with its own initial state and noise.
    /// Returns `[n, dims]`.
    pub fn sample(
        &self,
        n: usize,
        device: &B::Device,
        rng: &mut impl rand::Rng,
    ) -> Result<Tensor<B, 2>> {
        if n == 0 {
            return Err(Error::Domain("sample count must be >= 1"));
        }
        let d = self.dims;
        let noise = standard_normal(n, d, rng);
        let x0 = standard_normal(n, d, rng);
        let t = linspace_progress(n);

        Ok(self.diffusion.forward(
            array2_to_tensor::<B>(device, &x0),
            column_to_tensor::<B>(device, &t),
            array2_to_tensor::<B>(device, &noise),
        ))
    }

    /// Training forward pass: stochastic reconstruction of `x` (`[batch, dims]`), same shape as `x`.
    ///
    /// The generated batch is independent of `x`; `x` only enters through the final blend.
    pub fn forward(&self, x: Tensor<B, 2>, rng: &mut impl rand::Rng) -> Result<Tensor<B, 2>> {
        let [n, d] = x.dims();
        if d != self.dims {
            return Err(Error::DimensionMismatch {
                expected: self.dims,
                found: d,
            });
        }
        if n == 0 {
            return Err(Error::Shape("input batch must have at least one row"));
        }
        let device = x.device();

        let t = column_to_tensor::<B>(&device, &uniform_progress(n, rng));
        let xt = self.sample(n, &device, rng)?;

        let mu = self.mean(xt.clone());
        let sigma = self.scale(xt);
        let eps = array2_to_tensor::<B>(&device, &standard_normal(n, d, rng));
        let x_prime = mu + sigma * eps;

        let keep = Tensor::<B, 2>::ones([n, 1], &device) - t.clone();
        Ok(x * keep + x_prime * t)
    }

    /// `ndarray` front door for [`Self::sample`].
    pub fn generate(
        &self,
        n: usize,
        device: &B::Device,
        rng: &mut impl rand::Rng,
    ) -> Result<Array2<f32>> {
        tensor_to_array2(self.sample(n, device, rng)?)
    }

    /// `ndarray` front door for [`Self::forward`]: reconstruct already-flattened rows.
    pub fn reconstruct(
        &self,
        x: &ArrayView2<f32>,
        device: &B::Device,
        rng: &mut impl rand::Rng,
    ) -> Result<Array2<f32>> {
        let x = array2_to_tensor::<B>(device, &x.to_owned());
        tensor_to_array2(self.forward(x, rng)?)
    }

    /// All learnable values, flattened in a fixed order (step, mean head, scale head).
    ///
    /// Meant for inspection and tests; training never reads it.
    pub fn flat_parameters(&self) -> Result<Vec<f32>> {
        let [l1, l2] = self.diffusion.layers();
        let mut out = Vec::with_capacity(self.num_params());
        for layer in [l1, l2, &self.mean, &self.var] {
            out.extend(tensor_to_vec(layer.weight.val())?);
            if let Some(bias) = &layer.bias {
                out.extend(tensor_to_vec(bias.val())?);
            }
        }
        Ok(out)
    }

    /// Shapes of the parameter tensors that depend on `dims`, for checkpoint validation.
    pub(crate) fn weight_shapes(&self) -> [[usize; 2]; 4] {
        let [l1, l2] = self.diffusion.layers();
        [
            l1.weight.dims(),
            l2.weight.dims(),
            self.mean.weight.dims(),
            self.var.weight.dims(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    type B = NdArray<f32>;

    fn model(dims: usize) -> DiffScm<B> {
        DiffScmConfig::new(dims).init::<B>(&Default::default()).unwrap()
    }

    #[test]
    fn zero_dims_is_rejected() {
        let err = DiffScmConfig::new(0).init::<B>(&Default::default());
        assert!(matches!(err, Err(Error::Domain(_))));
    }

    #[test]
    fn sample_count_zero_is_rejected() {
        let m = model(3);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(matches!(
            m.sample(0, &Default::default(), &mut rng),
            Err(Error::Domain(_))
        ));
    }

    #[test]
    fn forward_rejects_wrong_width() {
        let m = model(4);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let x = Tensor::<B, 2>::zeros([2, 5], &Default::default());
        match m.forward(x, &mut rng) {
            Err(Error::DimensionMismatch { expected, found }) => {
                assert_eq!(expected, 4);
                assert_eq!(found, 5);
            }
            other => panic!("expected dimension mismatch, got {other:?}"),
        }
    }

    #[test]
    fn last_sample_is_its_initial_state() {
        // The last row gets t = 1, so the step returns x0 unchanged. Replaying the RNG recovers x0.
        let m = model(6);
        let n = 4;
        let out = m
            .generate(n, &Default::default(), &mut ChaCha8Rng::seed_from_u64(42))
            .unwrap();

        let mut replay = ChaCha8Rng::seed_from_u64(42);
        let _noise = standard_normal(n, 6, &mut replay);
        let x0 = standard_normal(n, 6, &mut replay);
        for k in 0..6 {
            assert!((out[[n - 1, k]] - x0[[n - 1, k]]).abs() < 1e-6);
        }
    }

    #[test]
    fn same_seed_reproduces_samples() {
        let m = model(5);
        let device = Default::default();
        let a = m.generate(3, &device, &mut ChaCha8Rng::seed_from_u64(1)).unwrap();
        let b = m.generate(3, &device, &mut ChaCha8Rng::seed_from_u64(1)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn reconstruct_keeps_shape() {
        let m = model(4);
        let x = Array2::<f32>::ones((7, 4));
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let out = m.reconstruct(&x.view(), &Default::default(), &mut rng).unwrap();
        assert_eq!(out.dim(), (7, 4));
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn flat_parameters_cover_every_parameter() {
        let m = model(3);
        // l1: 4*3+3, l2: 3*3+3, mean: 3*3+3, var: 3*3+3
        assert_eq!(m.flat_parameters().unwrap().len(), 15 + 12 * 3);
        assert_eq!(m.num_params(), 15 + 12 * 3);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 32,
            .. ProptestConfig::default()
        })]
        #[test]
        fn prop_scale_head_is_strictly_positive(
            n in 1usize..16,
            d in 1usize..16,
            amp in 0.1f32..200.0f32,
            seed in any::<u64>(),
        ) {
            let m = model(d);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let x = standard_normal(n, d, &mut rng).mapv(|v| v * amp);
            let sigma = m.scale(array2_to_tensor::<B>(&Default::default(), &x));
            let sigma = tensor_to_vec(sigma).unwrap();
            prop_assert_eq!(sigma.len(), n * d);
            prop_assert!(sigma.iter().all(|&s| s > 0.0), "non-positive scale in {:?}", sigma);
        }

        #[test]
        fn prop_sample_shape_is_n_by_dims(n in 1usize..40, d in 1usize..20, seed in any::<u64>()) {
            let m = model(d);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let out = m.sample(n, &Default::default(), &mut rng).unwrap();
            prop_assert_eq!(out.dims(), [n, d]);
        }

        #[test]
        fn prop_forward_preserves_shape(n in 1usize..24, d in 1usize..16, seed in any::<u64>()) {
            let m = model(d);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let x = array2_to_tensor::<B>(&Default::default(), &standard_normal(n, d, &mut rng));
            let out = m.forward(x, &mut rng).unwrap();
            prop_assert_eq!(out.dims(), [n, d]);
        }
    }
}
