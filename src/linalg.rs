//! Dense linear solves for small square systems

use crate::error::{WarpError, WarpResult};

/// Smallest pivot magnitude accepted during elimination
pub const PIVOT_EPSILON: f64 = 1e-8;

/// Solve `a * x = b` using Gaussian elimination with partial pivoting.
///
/// For every column the remaining row with the largest absolute entry is
/// swapped into the pivot position before eliminating below it. Near-collinear
/// point sets produce tiny leading entries, so the pivot choice is not
/// optional here.
///
/// Inputs are taken by value: row swaps never leak back to the caller.
pub fn solve_linear_system<const N: usize>(
    mut a: [[f64; N]; N],
    mut b: [f64; N],
) -> WarpResult<[f64; N]> {
    // Forward elimination with partial pivoting
    for col in 0..N {
        let mut max_row = col;
        let mut max_val = a[col][col].abs();
        for row in (col + 1)..N {
            if a[row][col].abs() > max_val {
                max_val = a[row][col].abs();
                max_row = row;
            }
        }

        if max_val.is_nan() || max_val <= PIVOT_EPSILON {
            return Err(WarpError::SingularSystem { column: col });
        }

        if max_row != col {
            a.swap(col, max_row);
            b.swap(col, max_row);
        }

        let pivot = a[col][col];
        for row in (col + 1)..N {
            let factor = a[row][col] / pivot;
            if factor == 0.0 {
                continue;
            }
            for j in col..N {
                a[row][j] -= factor * a[col][j];
            }
            b[row] -= factor * b[col];
        }
    }

    // Back substitution
    let mut x = [0.0f64; N];
    for i in (0..N).rev() {
        let mut sum = b[i];
        for j in (i + 1)..N {
            sum -= a[i][j] * x[j];
        }
        x[i] = sum / a[i][i];
    }

    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_pivot_swap() {
        // Leading zero: a naive elimination divides by zero here
        let x = solve_linear_system([[0.0, 1.0], [1.0, 1.0]], [1.0, 3.0]).unwrap();
        assert!((x[0] - 2.0).abs() < 1e-9);
        assert!((x[1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_identity_system() {
        let x = solve_linear_system(
            [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            [4.0, -5.0, 6.5],
        )
        .unwrap();
        assert_eq!(x, [4.0, -5.0, 6.5]);
    }

    #[test]
    fn test_singular_system() {
        let err = solve_linear_system([[1.0, 2.0], [2.0, 4.0]], [3.0, 6.0]).unwrap_err();
        assert_eq!(err, WarpError::SingularSystem { column: 1 });
    }

    #[test]
    fn test_zero_column_is_singular() {
        let err = solve_linear_system([[0.0, 1.0], [0.0, 2.0]], [1.0, 2.0]).unwrap_err();
        assert_eq!(err, WarpError::SingularSystem { column: 0 });
    }

    #[test]
    fn test_nan_input_is_rejected() {
        let result = solve_linear_system([[f64::NAN, 1.0], [1.0, 1.0]], [1.0, 1.0]);
        assert_eq!(result, Err(WarpError::SingularSystem { column: 0 }));
    }

    #[test]
    fn test_matches_lu_reference() {
        let a = [
            [4.0, -2.0, 1.0, 0.5],
            [3.0, 6.0, -4.0, 2.0],
            [2.0, 1.0, 8.0, -1.0],
            [0.1, 0.2, 0.3, 5.0],
        ];
        let b = [1.0, 2.0, 3.0, 4.0];

        let x = solve_linear_system(a, b).unwrap();

        let m = nalgebra::Matrix4::from_fn(|r, c| a[r][c]);
        let v = nalgebra::Vector4::from_column_slice(&b);
        let reference = m.lu().solve(&v).unwrap();
        for i in 0..4 {
            assert!((x[i] - reference[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_residual_small_for_ill_scaled_rows() {
        let a = [[1e-6, 1.0, 0.0], [1.0, 1.0, 1.0], [2.0, -1.0, 3.0]];
        let b = [1.0, 2.0, 3.0];
        let x = solve_linear_system(a, b).unwrap();
        for r in 0..3 {
            let lhs: f64 = (0..3).map(|c| a[r][c] * x[c]).sum();
            assert!((lhs - b[r]).abs() < 1e-9);
        }
    }
}
