use crate::design::Design;
use crate::error::MlogitError;
use crate::linalg::invert_symmetric;
use ndarray::{Array1, Array2};
use statrs::function::gamma::ln_gamma;

/// Output of one Newton-Raphson iteration.
#[derive(Debug)]
pub struct NewtonStep {
    /// The updated parameter vector.
    pub beta: Array1<f64>,
    /// (X'WX)^-1, the inverse information matrix at the input beta.
    pub xtwx: Array2<f64>,
    /// Multinomial log-likelihood at the input beta.
    pub log_likelihood: f64,
    /// Deviance at the input beta.
    pub deviance: f64,
}

/// Run one Newton-Raphson update from `beta0`.
///
/// Parameters are laid out column-major by response equation: index
/// `j * K + k` holds the coefficient of design column k in the equation for
/// response category j, j in [0, J-1). The largest response category is the
/// omitted reference.
///
/// Fails only when the information matrix cannot be inverted; the caller
/// treats that as non-convergence.
pub fn newton_step(design: &Design, beta0: &Array1<f64>) -> Result<NewtonStep, MlogitError> {
    let n_pops = design.n_pops();
    let j_cats = design.n_cats();
    let k_cols = design.n_cols();
    let n_params = k_cols * (j_cats - 1);
    if beta0.len() != n_params {
        return Err(MlogitError::ShapeMismatch(format!(
            "beta has {} entries, expected {}",
            beta0.len(),
            n_params
        )));
    }

    let x = &design.x;
    let y = &design.y;

    // Predicted probabilities at beta0, reference category last.
    let mut pi = Array2::<f64>::zeros((n_pops, j_cats));
    for i in 0..n_pops {
        let mut denom = 1.0;
        for j in 0..j_cats - 1 {
            let mut eta = 0.0;
            for k in 0..k_cols {
                eta += x[[i, k]] * beta0[j * k_cols + k];
            }
            let num = eta.exp();
            pi[[i, j]] = num;
            denom += num;
        }
        for j in 0..j_cats - 1 {
            pi[[i, j]] /= denom;
        }
        pi[[i, j_cats - 1]] = 1.0 / denom;
    }

    // Log-likelihood and deviance.
    let mut log_likelihood = 0.0;
    let mut deviance = 0.0;
    for i in 0..n_pops {
        log_likelihood += ln_gamma(design.n[i] + 1.0);
        for j in 0..j_cats {
            log_likelihood -= ln_gamma(y[[i, j]] + 1.0);
            log_likelihood += y[[i, j]] * pi[[i, j]].ln();
            if y[[i, j]] > 0.0 {
                deviance += y[[i, j]] * (y[[i, j]] / (design.n[i] * pi[[i, j]])).ln();
            }
        }
    }
    deviance *= 2.0;

    // Gradient and information matrix. The diagonal blocks carry weight
    // n*pi_j*(1 - pi_j), the off-diagonal blocks -n*pi_j*pi_j'.
    let mut g = Array1::<f64>::zeros(n_params);
    let mut h = Array2::<f64>::zeros((n_params, n_params));
    for i in 0..n_pops {
        let n_i = design.n[i];
        for j in 0..j_cats - 1 {
            let resid = y[[i, j]] - n_i * pi[[i, j]];
            for k in 0..k_cols {
                g[j * k_cols + k] += resid * x[[i, k]];
            }
            let w1 = n_i * pi[[i, j]] * (1.0 - pi[[i, j]]);
            for k in 0..k_cols {
                for k2 in k..k_cols {
                    let v = w1 * x[[i, k]] * x[[i, k2]];
                    h[[j * k_cols + k, j * k_cols + k2]] += v;
                    if k2 > k {
                        h[[j * k_cols + k2, j * k_cols + k]] += v;
                    }
                }
            }
            for j2 in j + 1..j_cats - 1 {
                let w2 = -n_i * pi[[i, j]] * pi[[i, j2]];
                for k in 0..k_cols {
                    for k2 in 0..k_cols {
                        let v = w2 * x[[i, k]] * x[[i, k2]];
                        h[[j * k_cols + k, j2 * k_cols + k2]] += v;
                        h[[j2 * k_cols + k2, j * k_cols + k]] += v;
                    }
                }
            }
        }
    }

    // Right-hand side X'WX beta0 + X'(Y - mu), then beta1 = (X'WX)^-1 rhs.
    let g = g + h.dot(beta0);
    let mut xtwx = Array2::<f64>::zeros((n_params, n_params));
    invert_symmetric(&mut h, &mut xtwx)?;
    let beta = xtwx.dot(&g);

    Ok(NewtonStep {
        beta,
        xtwx,
        log_likelihood,
        deviance,
    })
}
