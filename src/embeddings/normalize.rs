//! L2 normalization shared by every provider.

/// Euclidean length of a vector.
pub fn l2_norm(vector: &[f32]) -> f32 {
    l2_norm_f64(vector) as f32
}

/// Sum of squares is taken in f64 so components near the f32 limits neither
/// overflow to `inf` nor underflow to zero.
fn l2_norm_f64(vector: &[f32]) -> f64 {
    vector
        .iter()
        .map(|&x| f64::from(x) * f64::from(x))
        .sum::<f64>()
        .sqrt()
}

/// Rescale `vector` to unit Euclidean length in place.
///
/// An all-zero vector cannot be rescaled, so it is replaced by the first basis
/// vector `[1, 0, 0, ...]`. Empty slices are left untouched.
pub fn normalize_in_place(vector: &mut [f32]) {
    let norm = l2_norm_f64(vector);
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x = (f64::from(*x) / norm) as f32;
        }
    } else if let Some(first) = vector.first_mut() {
        *first = 1.0;
    }
}
