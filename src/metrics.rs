//! Reconstruction error metrics over `ndarray` batches.
//!
//! Both metrics average over every element (rows × columns), accumulating in `f64`.

use crate::{Error, Result};
use ndarray::ArrayView2;

fn check_pair(a: &ArrayView2<f32>, b: &ArrayView2<f32>) -> Result<()> {
    if a.is_empty() {
        return Err(Error::Domain("inputs must be non-empty"));
    }
    if a.dim() != b.dim() {
        return Err(Error::Shape("inputs must have the same shape"));
    }
    Ok(())
}

/// Mean squared error \(\frac{1}{nd}\sum (a - b)^2\).
pub fn mse(a: &ArrayView2<f32>, b: &ArrayView2<f32>) -> Result<f32> {
    check_pair(a, b)?;
    let s: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let r = (x - y) as f64;
            r * r
        })
        .sum();
    Ok((s / a.len() as f64) as f32)
}

/// Mean absolute error \(\frac{1}{nd}\sum |a - b|\).
pub fn mean_abs_error(a: &ArrayView2<f32>, b: &ArrayView2<f32>) -> Result<f32> {
    check_pair(a, b)?;
    let s: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| ((x - y) as f64).abs())
        .sum();
    Ok((s / a.len() as f64) as f32)
}
