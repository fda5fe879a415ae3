//! `ndarray` ⇄ burn tensor conversion.
//!
//! The public data surface of this crate is `ndarray`; tensors only exist inside the model.

use burn_core as burn;

use burn::tensor::{backend::Backend, Tensor, TensorData};
use ndarray::{Array1, Array2};

use crate::{Error, Result};

/// `(n, d)` array to a `[n, d]` tensor on `device`.
pub fn array2_to_tensor<B: Backend>(device: &B::Device, x: &Array2<f32>) -> Tensor<B, 2> {
    let (n, d) = x.dim();
    // `iter()` walks in logical order, so non-standard layouts convert correctly too.
    let data = TensorData::new(x.iter().copied().collect::<Vec<f32>>(), [n, d]);
    Tensor::from_data(data, device)
}

/// Length-`n` vector to a `[n, 1]` column tensor.
pub fn column_to_tensor<B: Backend>(device: &B::Device, x: &Array1<f32>) -> Tensor<B, 2> {
    let n = x.len();
    let data = TensorData::new(x.iter().copied().collect::<Vec<f32>>(), [n, 1]);
    Tensor::from_data(data, device)
}

/// `[n, d]` tensor back to an `(n, d)` array.
pub fn tensor_to_array2<B: Backend>(x: Tensor<B, 2>) -> Result<Array2<f32>> {
    let [n, d] = x.dims();
    let flat = tensor_to_vec(x)?;
    Array2::from_shape_vec((n, d), flat).map_err(|e| Error::Tensor(e.to_string()))
}

/// Row-major contents of any tensor as `f32`.
pub fn tensor_to_vec<B: Backend, const D: usize>(x: Tensor<B, D>) -> Result<Vec<f32>> {
    x.into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| Error::Tensor(format!("{e:?}")))
}
