//! Batches and the seam to whatever produces them.
//!
//! Dataset formats and downloading live outside this crate. The training driver only needs
//! something that hands out a list of [`Batch`]es once per epoch.

use ndarray::{Array2, ArrayD, ArrayViewD, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::{Error, Result};

/// One minibatch: images with the batch on axis 0, plus their labels.
///
/// Images may have any trailing shape (e.g. `[n, 1, 28, 28]`) as long as it flattens to the
/// model's `dims`. Labels are carried along but never read by the model.
#[derive(Debug, Clone)]
pub struct Batch {
    pub images: ArrayD<f32>,
    pub labels: Vec<usize>,
}

impl Batch {
    pub fn new(images: ArrayD<f32>, labels: Vec<usize>) -> Self {
        Self { images, labels }
    }

    /// Unlabeled batch.
    pub fn unlabeled(images: ArrayD<f32>) -> Self {
        Self {
            images,
            labels: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.images.shape().first().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Images reshaped to `[n, dims]`.
    pub fn flatten(&self, dims: usize) -> Result<Array2<f32>> {
        flatten_batch(&self.images.view(), dims)
    }
}

/// Reshape `[n, ...]` to `[n, prod(...)]` and check the width against `dims`.
///
/// A rank-1 input is treated as a batch of scalars (width 1).
pub fn flatten_batch(images: &ArrayViewD<f32>, dims: usize) -> Result<Array2<f32>> {
    let shape = images.shape();
    let Some((&n, rest)) = shape.split_first() else {
        return Err(Error::Shape("batch must have a leading batch axis"));
    };
    let width: usize = rest.iter().product();
    if width != dims {
        return Err(Error::DimensionMismatch {
            expected: dims,
            found: width,
        });
    }
    let flat = images
        .to_shape((n, width))
        .map_err(|e| Error::Tensor(e.to_string()))?;
    Ok(flat.into_owned())
}

/// Source of training batches, asked once per epoch.
pub trait BatchSource {
    fn batches(&mut self) -> Vec<Batch>;
}

impl BatchSource for Vec<Batch> {
    fn batches(&mut self) -> Vec<Batch> {
        self.clone()
    }
}

/// Chunks an in-memory `[N, ...]` array into batches of `batch_size` rows.
///
/// The last batch is short when `N` is not a multiple of `batch_size`. With shuffling enabled the
/// row order is re-drawn every epoch from a seeded RNG.
#[derive(Debug, Clone)]
pub struct InMemoryBatches {
    images: ArrayD<f32>,
    labels: Vec<usize>,
    batch_size: usize,
    shuffle: bool,
    rng: ChaCha8Rng,
}

impl InMemoryBatches {
    /// `labels` must be empty or have one entry per row.
    pub fn new(images: ArrayD<f32>, labels: Vec<usize>, batch_size: usize) -> Result<Self> {
        if images.ndim() == 0 {
            return Err(Error::Shape("images must have a leading batch axis"));
        }
        if batch_size == 0 {
            return Err(Error::Domain("batch_size must be >= 1"));
        }
        if !labels.is_empty() && labels.len() != images.shape()[0] {
            return Err(Error::Shape("labels length must match images.shape()[0]"));
        }
        Ok(Self {
            images,
            labels,
            batch_size,
            shuffle: false,
            rng: ChaCha8Rng::seed_from_u64(0),
        })
    }

    /// Shuffle rows every epoch using `seed`.
    pub fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle = true;
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    pub fn rows(&self) -> usize {
        self.images.shape()[0]
    }
}

impl BatchSource for InMemoryBatches {
    fn batches(&mut self) -> Vec<Batch> {
        let mut order: Vec<usize> = (0..self.rows()).collect();
        if self.shuffle {
            order.shuffle(&mut self.rng);
        }

        order
            .chunks(self.batch_size)
            .map(|idx| {
                let images = self.images.select(Axis(0), idx);
                let labels = if self.labels.is_empty() {
                    Vec::new()
                } else {
                    idx.iter().map(|&i| self.labels[i]).collect()
                };
                Batch { images, labels }
            })
            .collect()
    }
}

/// Wrap a flat `(N, dims)` matrix as an unlabeled in-memory source.
pub fn from_rows(rows: Array2<f32>, batch_size: usize) -> Result<InMemoryBatches> {
    InMemoryBatches::new(rows.into_dyn(), Vec::new(), batch_size)
}
