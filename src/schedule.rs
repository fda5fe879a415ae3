//! Progress values `t ∈ [0,1]`.
//!
//! Two independent uses:
//! - sampling assigns each sample one value from an evenly spaced grid ([`linspace_progress`]),
//! - the training forward pass draws one value per row ([`uniform_progress`]).

use ndarray::Array1;

/// One `t ~ U[0,1)` per row, as a length-`n` vector.
pub fn uniform_progress(n: usize, rng: &mut impl rand::Rng) -> Array1<f32> {
    Array1::from_shape_simple_fn(n, || rng.random::<f32>())
}

/// `n` evenly spaced progress values over `[0,1]`: first is `0`, last is `1`.
///
/// `n == 1` yields `[0]`; `n == 0` yields an empty vector.
pub fn linspace_progress(n: usize) -> Array1<f32> {
    match n {
        0 => Array1::zeros(0),
        1 => Array1::zeros(1),
        _ => {
            let last = (n - 1) as f32;
            Array1::from_iter((0..n).map(|i| i as f32 / last))
        }
    }
}
