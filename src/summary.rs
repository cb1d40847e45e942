//! Fit summaries and prediction
//!
//! Standard errors come from the inverse Fisher information (X'WX)⁻¹ at β̂.
//! The null deviance is that of the intercept-only model, whose MLE is
//! logit(ȳ) in closed form.

use std::fmt;

use ndarray::{Array1, Array2};
use serde::Serialize;
use statrs::function::erf::erfc;

use crate::family::{Binomial, Family};
use crate::irls::FitResult;
use crate::linalg::{compute_xtwx, spd_inverse};
use crate::{IrlsError, Precondition, Result};

/// Wald statistics for one coefficient
#[derive(Debug, Clone, Serialize)]
pub struct CoefficientSummary {
    pub estimate: f64,
    pub std_error: f64,
    pub z_value: f64,
    /// Two-sided p-value under the standard normal
    pub p_value: f64,
}

/// Summary statistics for a fitted logistic regression
#[derive(Debug, Clone, Serialize)]
pub struct LogisticSummary {
    pub coefficients: Vec<CoefficientSummary>,
    pub log_likelihood: f64,
    pub deviance: f64,
    pub null_deviance: f64,
    pub aic: f64,
    pub bic: f64,
    pub n_obs: usize,
    pub n_params: usize,
    pub iterations: usize,
    pub converged: bool,
}

/// Deviance of the intercept-only binomial model
fn null_deviance(y: &Array1<f64>) -> f64 {
    let n = y.len() as f64;
    let ybar = y.sum() / n;
    let mu = Array1::from_elem(y.len(), ybar);
    Binomial.deviance(y, &mu)
}

impl FitResult {
    /// Wald table, information criteria and deviances for this fit on (x, y)
    pub fn summarize(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<LogisticSummary> {
        let (n, p) = x.dim();
        if p != self.coefficients.len() {
            return Err(Precondition::ColumnMismatch {
                expected: self.coefficients.len(),
                actual: p,
            }
            .into());
        }
        if n != self.weights.len() || y.len() != n {
            return Err(Precondition::DimensionMismatch {
                rows: n,
                responses: y.len(),
            }
            .into());
        }

        let information = compute_xtwx(x, &self.weights);
        let covariance = spd_inverse(&information).map_err(|_| IrlsError::SingularDesign {
            iteration: self.iterations,
        })?;

        let coefficients = self
            .coefficients
            .iter()
            .zip(covariance.diag().iter())
            .map(|(&estimate, &var)| {
                let std_error = var.sqrt();
                let z_value = estimate / std_error;
                CoefficientSummary {
                    estimate,
                    std_error,
                    z_value,
                    p_value: erfc(z_value.abs() / std::f64::consts::SQRT_2),
                }
            })
            .collect();

        let k = p as f64;
        Ok(LogisticSummary {
            coefficients,
            log_likelihood: self.log_likelihood,
            deviance: self.deviance,
            null_deviance: null_deviance(y),
            aic: -2.0 * self.log_likelihood + 2.0 * k,
            bic: -2.0 * self.log_likelihood + k * (n as f64).ln(),
            n_obs: n,
            n_params: p,
            iterations: self.iterations,
            converged: self.converged,
        })
    }

    /// Fitted probabilities g⁻¹(x_new β̂) for a new design
    pub fn predict(&self, x_new: &Array2<f64>) -> Result<Array1<f64>> {
        if x_new.ncols() != self.coefficients.len() {
            return Err(Precondition::ColumnMismatch {
                expected: self.coefficients.len(),
                actual: x_new.ncols(),
            }
            .into());
        }
        Ok(x_new.dot(&self.coefficients).mapv(|eta| Binomial.inverse_link(eta)))
    }
}

impl fmt::Display for LogisticSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Coefficients:")?;
        writeln!(
            f,
            "{:>6} {:>12} {:>12} {:>9} {:>10}",
            "", "Estimate", "Std. Error", "z value", "Pr(>|z|)"
        )?;
        for (j, c) in self.coefficients.iter().enumerate() {
            writeln!(
                f,
                "{:>6} {:>12.6} {:>12.6} {:>9.3} {:>10.3e}",
                format!("b{}", j),
                c.estimate,
                c.std_error,
                c.z_value,
                c.p_value
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "    Null deviance: {:.4} on {} degrees of freedom",
            self.null_deviance,
            self.n_obs.saturating_sub(1)
        )?;
        writeln!(
            f,
            "Residual deviance: {:.4} on {} degrees of freedom",
            self.deviance,
            self.n_obs.saturating_sub(self.n_params)
        )?;
        writeln!(f, "AIC: {:.4}  BIC: {:.4}", self.aic, self.bic)?;
        write!(
            f,
            "IRLS iterations: {} ({})",
            self.iterations,
            if self.converged { "converged" } else { "not converged" }
        )
    }
}
