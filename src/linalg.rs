//! Dense symmetric-positive-definite kernels used by the Newton-Raphson
//! solver: upper Cholesky factorization, in-place triangular inversion, and
//! the triangular self-product that assembles the full inverse.

use crate::error::MlogitError;
use ndarray::Array2;

/// Factor a symmetric positive definite matrix in place: on success the
/// upper triangle of `a` holds U with U'U = A. The lower triangle is left
/// untouched. The positivity test is strict (no tolerance): the running
/// square sum reaching the diagonal fails the factorization.
pub fn cholesky(a: &mut Array2<f64>) -> Result<(), MlogitError> {
    let m = a.nrows();
    for i in 0..m {
        let mut s = 0.0;
        for j in 0..i {
            s += a[[j, i]] * a[[j, i]];
        }
        if s >= a[[i, i]] {
            return Err(MlogitError::NotPositiveDefinite);
        }
        a[[i, i]] = (a[[i, i]] - s).sqrt();
        for j in i + 1..m {
            let mut s = 0.0;
            for k in 0..i {
                s += a[[k, i]] * a[[k, j]];
            }
            a[[i, j]] = (a[[i, j]] - s) / a[[i, i]];
        }
    }
    Ok(())
}

/// Replace the upper-triangular factor U by its inverse, in place.
pub fn invert_upper(u: &mut Array2<f64>) -> Result<(), MlogitError> {
    let m = u.nrows();
    if m == 0 {
        return Ok(());
    }
    u[[0, 0]] = 1.0 / u[[0, 0]];
    for i in 1..m {
        if u[[i, i]] == 0.0 {
            return Err(MlogitError::SingularFactor);
        }
        u[[i, i]] = 1.0 / u[[i, i]];
        for j in 0..i {
            let mut s = 0.0;
            for k in j..i {
                s += u[[j, k]] * u[[k, i]];
            }
            u[[j, i]] = -u[[i, i]] * s;
        }
    }
    Ok(())
}

/// Given an inverted upper-triangular factor, accumulate the full inverse
/// A^-1 = U^-1 U^-T into `out`.
pub fn upper_self_product(u: &Array2<f64>, out: &mut Array2<f64>) -> Result<(), MlogitError> {
    let m = u.nrows();
    if u.ncols() != m || out.nrows() != m || out.ncols() != m {
        return Err(MlogitError::ProductShape(format!(
            "factor is {}x{}, output is {}x{}",
            u.nrows(),
            u.ncols(),
            out.nrows(),
            out.ncols()
        )));
    }
    for i in 0..m {
        for j in 0..m {
            let mut s = 0.0;
            for k in i.max(j)..m {
                s += u[[i, k]] * u[[j, k]];
            }
            out[[i, j]] = s;
        }
    }
    Ok(())
}

/// Invert a symmetric positive definite matrix through the three-step
/// kernel. `a` is consumed as scratch; the inverse lands in `inv`.
pub fn invert_symmetric(a: &mut Array2<f64>, inv: &mut Array2<f64>) -> Result<(), MlogitError> {
    cholesky(a)?;
    invert_upper(a)?;
    upper_self_product(a, inv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-12, "{} vs {}", a, b);
    }

    #[test]
    fn test_cholesky_factor() {
        let mut a = arr2(&[[4.0, 2.0], [2.0, 5.0]]);
        cholesky(&mut a).unwrap();
        assert_close(a[[0, 0]], 2.0);
        assert_close(a[[0, 1]], 1.0);
        assert_close(a[[1, 1]], 2.0);
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        let mut a = arr2(&[[1.0, 2.0], [2.0, 1.0]]);
        let err = cholesky(&mut a).unwrap_err();
        assert_eq!(err.stage_code(), 11);

        let mut z = arr2(&[[0.0, 0.0], [0.0, 1.0]]);
        assert!(cholesky(&mut z).is_err());
    }

    #[test]
    fn test_invert_symmetric_2x2() {
        let mut a = arr2(&[[2.0, 1.0], [1.0, 2.0]]);
        let mut inv = Array2::<f64>::zeros((2, 2));
        invert_symmetric(&mut a, &mut inv).unwrap();
        assert_close(inv[[0, 0]], 2.0 / 3.0);
        assert_close(inv[[0, 1]], -1.0 / 3.0);
        assert_close(inv[[1, 0]], -1.0 / 3.0);
        assert_close(inv[[1, 1]], 2.0 / 3.0);
    }

    #[test]
    fn test_invert_symmetric_3x3_roundtrip() {
        let a0 = arr2(&[[4.0, 2.0, 1.0], [2.0, 5.0, 3.0], [1.0, 3.0, 6.0]]);
        let mut a = a0.clone();
        let mut inv = Array2::<f64>::zeros((3, 3));
        invert_symmetric(&mut a, &mut inv).unwrap();

        let id = a0.dot(&inv);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((id[[i, j]] - expected).abs() < 1e-12);
            }
        }
        // the inverse of a symmetric matrix is symmetric
        for i in 0..3 {
            for j in 0..3 {
                assert_close(inv[[i, j]], inv[[j, i]]);
            }
        }
    }

    #[test]
    fn test_product_shape_checked() {
        let u = Array2::<f64>::zeros((2, 2));
        let mut out = Array2::<f64>::zeros((3, 3));
        let err = upper_self_product(&u, &mut out).unwrap_err();
        assert_eq!(err.stage_code(), 13);
    }
}
