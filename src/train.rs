//! Training driver: reconstruction MSE through burn autodiff and an external optimizer.
//!
//! The contract is deliberately plain:
//! - batches are processed strictly in order, one optimizer step per batch,
//! - an epoch reports the arithmetic mean of its per-batch losses,
//! - non-finite losses are logged but not acted upon.

use std::path::PathBuf;

use burn_core as burn;

use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{ElementConversion, Tensor};
use ndarray::ArrayD;
use burn_optim::{AdamConfig, GradientsParams, LearningRate, Optimizer};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::checkpoint;
use crate::convert::array2_to_tensor;
use crate::data::{Batch, BatchSource, InMemoryBatches};
use crate::model::DiffScm;
use crate::{Error, Result};

/// Training configuration.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    /// Number of passes over the batch source.
    pub epochs: usize,
    /// Rows per batch for sources built with [`TrainConfig::batches`].
    pub batch_size: usize,
    /// Adam learning rate.
    pub lr: LearningRate,
    /// Adam first-moment decay.
    pub adam_beta_1: f32,
    /// Adam second-moment decay.
    pub adam_beta_2: f32,
    /// Adam denominator epsilon.
    pub adam_epsilon: f32,
    /// Seed for every random draw made during training, including the batch shuffle.
    pub seed: u64,
    /// Where to write the final parameters (recorder adds the file extension).
    pub checkpoint: Option<PathBuf>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 10,
            batch_size: 128,
            lr: 1e-3,
            adam_beta_1: 0.9,
            adam_beta_2: 0.999,
            adam_epsilon: 1e-8,
            seed: 123,
            checkpoint: None,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 || self.batch_size == 0 {
            return Err(Error::Domain("epochs and batch_size must be >= 1"));
        }
        if !(self.lr > 0.0) || !self.lr.is_finite() {
            return Err(Error::Domain("lr must be positive and finite"));
        }
        let beta_ok = |b: f32| (0.0..1.0).contains(&b);
        if !beta_ok(self.adam_beta_1) || !beta_ok(self.adam_beta_2) {
            return Err(Error::Domain("adam betas must lie in [0, 1)"));
        }
        if !(self.adam_epsilon > 0.0) || !self.adam_epsilon.is_finite() {
            return Err(Error::Domain("adam epsilon must be positive and finite"));
        }
        Ok(())
    }

    /// Adam settings from this config.
    pub fn adam_config(&self) -> AdamConfig {
        AdamConfig::new()
            .with_beta_1(self.adam_beta_1)
            .with_beta_2(self.adam_beta_2)
            .with_epsilon(self.adam_epsilon)
    }

    /// The optimizer [`fit`] steps with.
    pub fn adam<B: AutodiffBackend>(&self) -> impl Optimizer<DiffScm<B>, B> {
        self.adam_config().init::<B, DiffScm<B>>()
    }

    /// Batch `images` (first axis = rows) into chunks of `batch_size`, reshuffled every epoch
    /// from `seed`.
    pub fn batches(&self, images: ArrayD<f32>, labels: Vec<usize>) -> Result<InMemoryBatches> {
        self.validate()?;
        Ok(InMemoryBatches::new(images, labels, self.batch_size)?.with_shuffle(self.seed))
    }
}

/// Mean squared error over every element, as a 1-element tensor.
pub fn mse_loss<B: Backend>(pred: Tensor<B, 2>, target: Tensor<B, 2>) -> Tensor<B, 1> {
    (pred - target).powf_scalar(2.0).mean()
}

/// One pass over `batches`. Returns the updated model and the mean per-batch loss.
///
/// Each batch is flattened to `[n, dims]`; a width mismatch aborts the epoch with
/// [`Error::DimensionMismatch`]. An empty batch list is a [`Error::Domain`] error.
pub fn train_epoch<B, O>(
    mut model: DiffScm<B>,
    optim: &mut O,
    batches: impl IntoIterator<Item = Batch>,
    config: &TrainConfig,
    device: &B::Device,
    rng: &mut impl rand::Rng,
) -> Result<(DiffScm<B>, f32)>
where
    B: AutodiffBackend,
    O: Optimizer<DiffScm<B>, B>,
{
    let mut losses: Vec<f32> = Vec::new();

    for (batch_idx, batch) in batches.into_iter().enumerate() {
        let x = batch.flatten(model.dims())?;
        let x = array2_to_tensor::<B>(device, &x);

        let recon = model.forward(x.clone(), rng)?;
        let loss = mse_loss(recon, x);
        let value = loss.clone().into_scalar().elem::<f32>();
        losses.push(value);
        log::debug!("batch {batch_idx}: loss {value:.6}");

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &model);
        model = optim.step(config.lr, model, grads);
    }

    if losses.is_empty() {
        return Err(Error::Domain("batch source yielded no batches"));
    }
    let mean = (losses.iter().map(|&l| l as f64).sum::<f64>() / losses.len() as f64) as f32;
    Ok((model, mean))
}

/// Result of [`fit`].
#[derive(Debug)]
pub struct Trained<B: Backend> {
    pub model: DiffScm<B>,
    /// Mean loss of each epoch, in order.
    pub epoch_losses: Vec<f32>,
}

/// Train for `config.epochs` epochs with Adam, then optionally write a checkpoint.
pub fn fit<B, S>(
    model: DiffScm<B>,
    source: &mut S,
    config: &TrainConfig,
    device: &B::Device,
) -> Result<Trained<B>>
where
    B: AutodiffBackend,
    S: BatchSource + ?Sized,
{
    config.validate()?;

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut optim = config.adam::<B>();
    let mut model = model;
    let mut epoch_losses = Vec::with_capacity(config.epochs);

    for epoch in 0..config.epochs {
        let (next, loss) = train_epoch(
            model,
            &mut optim,
            source.batches(),
            config,
            device,
            &mut rng,
        )?;
        model = next;
        if !loss.is_finite() {
            log::warn!("epoch {}/{}: mean loss is not finite ({loss})", epoch + 1, config.epochs);
        }
        log::info!("epoch {}/{} loss {loss:.4}", epoch + 1, config.epochs);
        epoch_losses.push(loss);
    }

    if let Some(path) = &config.checkpoint {
        checkpoint::save(&model, path)?;
    }

    Ok(Trained {
        model,
        epoch_losses,
    })
}
