//! Seeded random draws.
//!
//! All randomness in this crate is drawn here from a caller-supplied `rand::Rng` and only then
//! moved onto a tensor device, so a fixed seed reproduces a run on any backend.

use ndarray::Array2;
use rand_distr::{Distribution, StandardNormal};

/// `(n, d)` matrix with i.i.d. `N(0, 1)` entries, filled row-major.
pub fn standard_normal(n: usize, d: usize, rng: &mut impl rand::Rng) -> Array2<f32> {
    let mut out = Array2::<f32>::zeros((n, d));
    for i in 0..n {
        for k in 0..d {
            out[[i, k]] = StandardNormal.sample(rng);
        }
    }
    out
}
