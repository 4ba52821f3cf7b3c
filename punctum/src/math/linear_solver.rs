//! Gauss–Jordan elimination for the small dense systems of the LM fit.
//!
//! Systems are stored in fixed `N×N` arrays; only the leading `n×n` block is
//! used so that fixed (non-varying) parameters can simply be left out.

/// Relative pivot size below which the matrix is treated as singular.
const SINGULAR_TOLERANCE: f64 = 1e-14;

/// Solve `A x = b` in place with partial pivoting, using the leading `n×n` block.
///
/// On success `b` holds the solution and `a` holds `A⁻¹`. Returns `false`
/// for a singular or non-finite system, leaving both in an unspecified state.
#[allow(clippy::needless_range_loop)]
pub fn gauss_jordan<const N: usize>(a: &mut [[f64; N]; N], b: &mut [f64; N], n: usize) -> bool {
    debug_assert!(n <= N);
    if n == 0 {
        return true;
    }

    let scale = (0..n)
        .flat_map(|i| a[i][..n].iter())
        .fold(0.0f64, |m, v| m.max(v.abs()));
    if !(scale.is_finite() && scale > 0.0) {
        return false;
    }

    let mut inverse = [[0.0f64; N]; N];
    for i in 0..n {
        inverse[i][i] = 1.0;
    }

    for col in 0..n {
        let mut pivot_row = col;
        let mut pivot_abs = a[col][col].abs();
        for row in (col + 1)..n {
            if a[row][col].abs() > pivot_abs {
                pivot_abs = a[row][col].abs();
                pivot_row = row;
            }
        }

        if !pivot_abs.is_finite() || pivot_abs <= SINGULAR_TOLERANCE * scale {
            return false;
        }

        if pivot_row != col {
            a.swap(col, pivot_row);
            inverse.swap(col, pivot_row);
            b.swap(col, pivot_row);
        }

        let inv_pivot = 1.0 / a[col][col];
        for j in 0..n {
            a[col][j] *= inv_pivot;
            inverse[col][j] *= inv_pivot;
        }
        b[col] *= inv_pivot;

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                a[row][j] -= factor * a[col][j];
                inverse[row][j] -= factor * inverse[col][j];
            }
            b[row] -= factor * b[col];
        }
    }

    *a = inverse;
    true
}
