//! Small numeric helpers shared by the fitting and integration stages.

pub mod linear_solver;

/// Median of the values, reordering the buffer in place.
///
/// Returns NaN for an empty buffer. Even lengths average the two middle values.
pub fn median_f64_mut(data: &mut [f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }

    let len = data.len();
    let mid = len / 2;
    let (left, median, _) = data.select_nth_unstable_by(mid, f64::total_cmp);
    let right = *median;
    if len % 2 == 1 {
        right
    } else {
        let left = left.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        (left + right) * 0.5
    }
}

/// Arithmetic mean, NaN for an empty slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Coefficient of determination `1 - SSR / SST`.
///
/// NaN when the observations have no variance.
pub fn r_squared(observed: &[f64], residual_sum_sq: f64) -> f64 {
    let mean = mean(observed);
    let total: f64 = observed.iter().map(|&z| (z - mean) * (z - mean)).sum();
    if total <= 0.0 {
        return f64::NAN;
    }
    1.0 - residual_sum_sq / total
}
