use crate::dataset::{Dataset, SYSMIS};
use crate::design::Design;
use crate::error::MlogitError;
use crate::formula::Formula;
use crate::freq::{tabulate, Tabulation};
use crate::model::ModelSpec;
use crate::newton::newton_step;
use crate::session::{Options, Session};
use ndarray::{Array1, Array2};
use statrs::distribution::{ChiSquared, ContinuousCDF};
use std::fmt;

/// Hard cap on Newton-Raphson iterations.
pub const MAX_ITER: usize = 30;
/// Relative per-parameter change below which the fit is converged.
pub const EPSILON: f64 = 1e-8;

/// A chi-square goodness-of-fit test. The degrees of freedom can be
/// non-positive for small models; the p-value is NaN in that case.
#[derive(Debug, Clone, Copy)]
pub struct FitTest {
    pub statistic: f64,
    pub df: i64,
    pub p_value: f64,
}

/// Multinomial logistic regression estimated by maximum likelihood.
pub struct Mlogit;

impl Mlogit {
    /// Fit a model described by a parsed formula against the session's
    /// dataset registry and options.
    pub fn from_formula(
        formula: &Formula,
        session: &Session,
    ) -> Result<MlogitResult, MlogitError> {
        let data = session.dataset(&formula.dataset)?;
        let model = ModelSpec::from_formula(formula, data)?;
        Self::fit(data, &model, session.options())
    }

    /// Tabulate, assemble the design, and iterate Newton-Raphson to
    /// convergence. Numeric failures inside an iteration (stages 11-13)
    /// produce a non-converged result rather than an error; the report
    /// then shows `Convergence: NO`.
    pub fn fit(
        data: &Dataset,
        model: &ModelSpec,
        options: &Options,
    ) -> Result<MlogitResult, MlogitError> {
        let tab = tabulate(data, model);
        let design = Design::build(&tab, model, data, options.parameterization())?;
        let n_params = design.n_cols() * (design.n_cats() - 1);

        let mut beta = Array1::<f64>::zeros(n_params);
        let mut xtwx = Array2::<f64>::zeros((n_params, n_params));
        let mut log_likelihood = 0.0;
        let mut log_likelihood_null = 0.0;
        let mut deviance = 0.0;
        let mut converged = false;
        let mut iterations = 0usize;
        let mut failure_stage = None;

        while iterations < MAX_ITER && !converged {
            let beta_prev = beta.clone();
            match newton_step(&design, &beta_prev) {
                Ok(step) => {
                    beta = step.beta;
                    xtwx = step.xtwx;
                    log_likelihood = step.log_likelihood;
                    deviance = step.deviance;
                    converged = beta
                        .iter()
                        .zip(beta_prev.iter())
                        .all(|(b, p)| (b - p).abs() <= EPSILON * p.abs());
                    if iterations == 0 {
                        log_likelihood_null = log_likelihood;
                    }
                    iterations += 1;
                }
                Err(e) if e.stage_code() != 0 => {
                    failure_stage = Some(e.stage_code());
                    converged = false;
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        let mut std_errors = Array1::<f64>::zeros(n_params);
        let mut wald = Array1::<f64>::zeros(n_params);
        let mut p_values = Array1::<f64>::from_elem(n_params, -1.0);
        let mut model_test = None;
        let mut fit_test = None;

        if converged {
            let n_pops = design.n_pops();
            let j_cats = design.n_cats();
            let k_cols = design.n_cols();

            let chi1 = 2.0 * (log_likelihood - log_likelihood_null);
            let df1 = (k_cols * (j_cats - 1)) as i64 - j_cats as i64 - 1;
            model_test = Some(FitTest {
                statistic: chi1,
                df: df1,
                p_value: chi_squared_p(chi1, df1),
            });

            let df2 = (n_pops * (j_cats - 1)) as i64 - (k_cols * (j_cats - 1)) as i64;
            fit_test = Some(FitTest {
                statistic: deviance,
                df: df2,
                p_value: chi_squared_p(deviance, df2),
            });

            for i in 0..n_params {
                let var = xtwx[[i, i]];
                if var > 0.0 {
                    std_errors[i] = var.sqrt();
                    wald[i] = (beta[i] / std_errors[i]).powi(2);
                    p_values[i] = chi_squared_p(wald[i], 1);
                }
            }
        }

        let covariate_names = model
            .main_effects
            .iter()
            .map(|m| data.var_name(m.var).to_string())
            .collect();

        Ok(MlogitResult {
            dv_name: data.var_name(model.dv).to_string(),
            covariate_names,
            params: beta,
            std_errors,
            wald,
            p_values,
            iterations,
            converged,
            failure_stage,
            log_likelihood,
            log_likelihood_null,
            deviance,
            model_test,
            fit_test,
            xtwx,
            design,
            tabulation: tab,
        })
    }
}

/// Everything a fit produces: estimates, their dispersion, the two
/// goodness-of-fit tests, and the tabulation and design artifacts the
/// report prints. All of it is owned here and released when the result is
/// dropped.
#[derive(Debug)]
pub struct MlogitResult {
    pub dv_name: String,
    /// Covariate names in crosstab key order.
    pub covariate_names: Vec<String>,
    /// Estimates laid out `j * K + k` (equation-major).
    pub params: Array1<f64>,
    pub std_errors: Array1<f64>,
    pub wald: Array1<f64>,
    /// Wald p-values; -1 marks an undefined entry.
    pub p_values: Array1<f64>,
    pub iterations: usize,
    pub converged: bool,
    /// Stage code of the inversion failure that stopped iteration, if any.
    pub failure_stage: Option<u8>,
    pub log_likelihood: f64,
    /// Log-likelihood recorded on the first iteration, at beta = 0.
    pub log_likelihood_null: f64,
    pub deviance: f64,
    /// Likelihood-ratio test against the intercept-only baseline.
    pub model_test: Option<FitTest>,
    /// Deviance test against the saturated model.
    pub fit_test: Option<FitTest>,
    /// Inverse information matrix at the final iteration.
    pub xtwx: Array2<f64>,
    pub design: Design,
    pub tabulation: Tabulation,
}

impl MlogitResult {
    /// Predicted probabilities (N x J) at the final estimates.
    pub fn fitted(&self) -> Array2<f64> {
        let n_pops = self.design.n_pops();
        let j_cats = self.design.n_cats();
        let k_cols = self.design.n_cols();
        let mut pi = Array2::<f64>::zeros((n_pops, j_cats));
        for i in 0..n_pops {
            let mut denom = 1.0;
            for j in 0..j_cats - 1 {
                let mut eta = 0.0;
                for k in 0..k_cols {
                    eta += self.design.x[[i, k]] * self.params[j * k_cols + k];
                }
                pi[[i, j]] = eta.exp();
                denom += pi[[i, j]];
            }
            for j in 0..j_cats - 1 {
                pi[[i, j]] /= denom;
            }
            pi[[i, j_cats - 1]] = 1.0 / denom;
        }
        pi
    }
}

fn chi_squared_p(statistic: f64, df: i64) -> f64 {
    if df <= 0 {
        return f64::NAN;
    }
    match ChiSquared::new(df as f64) {
        Ok(dist) => 1.0 - dist.cdf(statistic),
        Err(_) => f64::NAN,
    }
}

fn fmt_value(v: f64) -> String {
    if v.to_bits() == SYSMIS.to_bits() {
        "SYSMIS".to_string()
    } else {
        format!("{:.4}", v)
    }
}

fn fmt_p(p: f64) -> String {
    if p.is_nan() || p < 0.0 {
        ".".to_string()
    } else {
        format!("{:.4}", p)
    }
}

impl fmt::Display for MlogitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n_pops = self.design.n_pops();
        let j_cats = self.design.n_cats();
        let k_cols = self.design.n_cols();

        writeln!(f, "\n{:=^78}", " Multinomial Logistic Regression (MLE) ")?;
        writeln!(
            f,
            "{:<20} {:>15} || {:<20} {:>15}",
            "Dep. Variable:", self.dv_name, "Populations:", n_pops
        )?;
        writeln!(
            f,
            "{:<20} {:>15} || {:<20} {:>15}",
            "Response categories:",
            j_cats,
            "Design columns:",
            k_cols
        )?;
        writeln!(
            f,
            "{:<20} {:>15} || {:<20} {:>15.4}",
            "Parameters:",
            k_cols * (j_cats - 1),
            "Total weight:",
            self.design.total_weight
        )?;

        writeln!(f, "\n{:-^78}", format!(" frequencies: {} ", self.dv_name))?;
        writeln!(f, "{:>12} | {:>12}", "value", "weight")?;
        for (value, weight) in self.tabulation.dv_table.iter() {
            writeln!(f, "{:>12} | {:>12.4}", fmt_value(*value), weight)?;
        }

        writeln!(f, "\n{:-^78}", " crosstab ")?;
        let mut header = String::new();
        for name in &self.covariate_names {
            header.push_str(&format!("{:>12} ", name));
        }
        header.push_str(&format!("{:>12} | {:>12}", self.dv_name, "weight"));
        writeln!(f, "{}", header)?;
        let n_cov = self.tabulation.crosstab.n_covariates();
        for row in self.tabulation.crosstab.rows() {
            let mut line = String::new();
            for v in &row.key[..n_cov] {
                line.push_str(&format!("{:>12} ", fmt_value(*v)));
            }
            line.push_str(&format!("{:>12}", fmt_value(row.key[n_cov])));
            writeln!(f, "{} | {:>12.4}", line, row.weight)?;
        }

        writeln!(f, "\n{:-^78}", " design matrix ")?;
        for p in 0..n_pops {
            let mut line = format!("{:>4} | n={:>10.2} |", p, self.design.n[p]);
            for k in 0..k_cols {
                line.push_str(&format!(" {:>8.2}", self.design.x[[p, k]]));
            }
            writeln!(f, "{}", line)?;
        }

        writeln!(
            f,
            "\n{:<20} {:>15} || {:<20} {:>15}",
            "Iterations:",
            self.iterations,
            "Convergence:",
            if self.converged { "YES" } else { "NO" }
        )?;
        writeln!(
            f,
            "{:<20} {:>15.4} || {:<20} {:>15.4}",
            "Log-Likelihood:", self.log_likelihood, "Deviance:", self.deviance
        )?;
        if let Some(stage) = self.failure_stage {
            writeln!(f, "{:<20} {:>15}", "Failure stage:", stage)?;
        }

        if let (Some(model_test), Some(fit_test)) = (&self.model_test, &self.fit_test) {
            writeln!(f, "\n{:-^78}", " goodness of fit ")?;
            writeln!(
                f,
                "{:<24} chi2 = {:>12.4}  df = {:>6}  p = {}",
                "vs intercept-only:",
                model_test.statistic,
                model_test.df,
                fmt_p(model_test.p_value)
            )?;
            writeln!(
                f,
                "{:<24} chi2 = {:>12.4}  df = {:>6}  p = {}",
                "vs saturated:",
                fit_test.statistic,
                fit_test.df,
                fmt_p(fit_test.p_value)
            )?;

            writeln!(f, "\n{:-^78}", "")?;
            writeln!(
                f,
                "{:<16} | {:>3} | {:>10} | {:>10} | {:>10} | {:>8}",
                "Variable", "cat", "coef", "std err", "Wald", "P>chi2"
            )?;
            writeln!(f, "{:-^78}", "")?;
            for j in 0..j_cats - 1 {
                for k in 0..k_cols {
                    let i = j * k_cols + k;
                    writeln!(
                        f,
                        "{:<16} | {:>3} | {:>10.4} | {:>10.4} | {:>10.3} | {:>8}",
                        self.design.labels[k],
                        j,
                        self.params[i],
                        self.std_errors[i],
                        self.wald[i],
                        fmt_p(self.p_values[i])
                    )?;
                }
            }
        }
        writeln!(f, "{:=^78}", "")
    }
}
