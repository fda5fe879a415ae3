//! Persist and restore model parameters.
//!
//! Uses burn's named MessagePack file recorder at full precision, so a reload reproduces the
//! saved values exactly. The recorder appends its own `.mpk` extension to the given path.

use std::path::Path;

use burn_core as burn;

use burn::module::Module;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder};
use burn::tensor::backend::Backend;

use crate::model::{DiffScm, DiffScmConfig};
use crate::{Error, Result};

pub type CheckpointRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

/// Write every parameter of `model` to `path`.
pub fn save<B: Backend>(model: &DiffScm<B>, path: &Path) -> Result<()> {
    let recorder = CheckpointRecorder::new();
    recorder
        .record(model.clone().into_record(), path.to_path_buf())
        .map_err(|e| Error::Checkpoint(format!("{e:?}")))?;
    log::debug!("checkpoint written to {}", path.display());
    Ok(())
}

/// Rebuild a model of width `dims` on `device` from a checkpoint written by [`save`].
///
/// Fails with [`Error::DimensionMismatch`] when the stored parameters belong to another width.
pub fn load<B: Backend>(path: &Path, dims: usize, device: &B::Device) -> Result<DiffScm<B>> {
    let recorder = CheckpointRecorder::new();
    let record = recorder
        .load(path.to_path_buf(), device)
        .map_err(|e| Error::Checkpoint(format!("{e:?}")))?;

    let fresh = DiffScmConfig::new(dims).init::<B>(device)?;
    let expected = fresh.weight_shapes();
    let model = fresh.load_record(record);

    for (want, got) in expected.iter().zip(model.weight_shapes().iter()) {
        if want != got {
            // Weight shapes are `[dims(+1), dims]`; the output side carries the stored width.
            return Err(Error::DimensionMismatch {
                expected: dims,
                found: got[1],
            });
        }
    }
    Ok(model)
}
