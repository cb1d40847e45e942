//! IRLS (Iteratively Reweighted Least Squares) fitting for binomial GLMs
//!
//! Each iteration linearizes the link around the current estimate and solves
//! the weighted normal equations
//!
//! ```text
//! β⁽ᵐ⁾ = (X'WX)⁻¹ X'Wz,   w_i = (dμ/dη)² / V(μ_i),   z_i = η_i + (y_i - μ_i) / (dμ/dη)
//! ```
//!
//! which for the canonical logit link reduces to w_i = μ_i(1 - μ_i) and
//! z_i = η_i + (y_i - μ_i)/w_i.

use log::{debug, warn};
use ndarray::{Array1, Array2};
use rayon::prelude::*;

use crate::family::{Binomial, Family};
use crate::linalg::{compute_xtwx, compute_xtwz, solve_spd};
use crate::{Divergence, IrlsError, Precondition, Result};

/// Smallest/largest weight ratio below which a failed solve is blamed on
/// saturating probabilities rather than on the design.
const WEIGHT_COLLAPSE_RATIO: f64 = 1e-12;

/// Norm used to measure the change in β between iterations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConvergenceNorm {
    /// max_j |β_j - β_j'|
    #[default]
    MaxAbs,
    /// sqrt(Σ_j (β_j - β_j')²)
    Euclidean,
}

impl ConvergenceNorm {
    pub fn distance(&self, a: &Array1<f64>, b: &Array1<f64>) -> f64 {
        let diffs = a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs());
        match self {
            ConvergenceNorm::MaxAbs => diffs.fold(0.0f64, f64::max),
            ConvergenceNorm::Euclidean => diffs.map(|d| d * d).sum::<f64>().sqrt(),
        }
    }
}

/// Why the iteration stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// ‖β⁽ᵐ⁾ - β⁽ᵐ⁻¹⁾‖ fell below the tolerance
    Converged,
    /// The iteration budget ran out first
    IterationLimit,
}

/// Options controlling an IRLS fit
#[derive(Debug, Clone)]
pub struct IrlsOptions {
    /// Convergence tolerance on the change in β
    pub tolerance: f64,
    /// Maximum number of IRLS iterations
    pub max_iterations: usize,
    /// Starting β. Zeros when not provided.
    pub initial_coefficients: Option<Array1<f64>>,
    /// Norm for the convergence check
    pub norm: ConvergenceNorm,
    /// Compute the per-observation working quantities with rayon
    pub parallel: bool,
}

impl Default for IrlsOptions {
    fn default() -> Self {
        IrlsOptions {
            tolerance: 1e-8,
            max_iterations: 100,
            initial_coefficients: None,
            norm: ConvergenceNorm::MaxAbs,
            parallel: false,
        }
    }
}

impl IrlsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn initial_coefficients(mut self, beta: impl Into<Array1<f64>>) -> Self {
        self.initial_coefficients = Some(beta.into());
        self
    }

    pub fn norm(mut self, norm: ConvergenceNorm) -> Self {
        self.norm = norm;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Reject option values the solver cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(Precondition::InvalidTolerance(self.tolerance).into());
        }
        if self.max_iterations == 0 {
            return Err(Precondition::ZeroIterationBudget.into());
        }
        Ok(())
    }
}

/// IRLS fitting result
#[derive(Debug, Clone)]
pub struct FitResult {
    /// Final estimate β̂
    pub coefficients: Array1<f64>,
    /// Number of IRLS updates performed
    pub iterations: usize,
    /// True when the tolerance was met within the budget
    pub converged: bool,
    pub stop_reason: StopReason,
    /// η = Xβ̂
    pub linear_predictor: Array1<f64>,
    /// μ = g⁻¹(η)
    pub fitted_values: Array1<f64>,
    /// Working weights at β̂
    pub weights: Array1<f64>,
    /// Log-likelihood at β̂
    pub log_likelihood: f64,
    /// Residual deviance at β̂
    pub deviance: f64,
    /// Log-likelihood at β⁽⁰⁾, β⁽¹⁾, ..., β̂
    pub log_likelihood_trace: Vec<f64>,
}

/// Per-iteration linearization of the model around the current β
struct WorkingSet {
    eta: Array1<f64>,
    mu: Array1<f64>,
    w: Array1<f64>,
    z: Array1<f64>,
    log_likelihood: f64,
}

/// Working quantities (μ_i, w_i, z_i) for observation `i`
fn working_observation<F: Family>(
    family: &F,
    i: usize,
    eta: f64,
    y: f64,
) -> std::result::Result<(f64, f64, f64), Divergence> {
    let mu = family.inverse_link(eta);
    if family.is_saturated(mu) {
        return Err(Divergence::SaturatedProbability { observation: i });
    }
    let dmu_deta = family.d_inverse_link(eta);
    let w = dmu_deta * dmu_deta / family.variance(mu);
    let z = eta + (y - mu) / dmu_deta;
    if !(z.is_finite() && w.is_finite() && w > 0.0) {
        return Err(Divergence::NonFiniteWorkingResponse { observation: i });
    }
    Ok((mu, w, z))
}

impl WorkingSet {
    fn evaluate<F: Family>(
        family: &F,
        x: &Array2<f64>,
        y: &Array1<f64>,
        beta: &Array1<f64>,
        iteration: usize,
        parallel: bool,
    ) -> Result<Self> {
        let eta = x.dot(beta);
        let n = eta.len();

        let per_obs: Vec<_> = if parallel {
            (0..n)
                .into_par_iter()
                .map(|i| working_observation(family, i, eta[i], y[i]))
                .collect()
        } else {
            (0..n)
                .map(|i| working_observation(family, i, eta[i], y[i]))
                .collect()
        };

        let mut mu = Array1::zeros(n);
        let mut w = Array1::zeros(n);
        let mut z = Array1::zeros(n);
        for (i, obs) in per_obs.into_iter().enumerate() {
            let (mu_i, w_i, z_i) =
                obs.map_err(|cause| IrlsError::NumericalDivergence { iteration, cause })?;
            mu[i] = mu_i;
            w[i] = w_i;
            z[i] = z_i;
        }

        let log_likelihood = family.total_log_likelihood(y, &mu);

        Ok(WorkingSet {
            eta,
            mu,
            w,
            z,
            log_likelihood,
        })
    }

    /// Solve the weighted normal equations for the next β
    fn solve(&self, x: &Array2<f64>, iteration: usize) -> Result<Array1<f64>> {
        let xtwx = compute_xtwx(x, &self.w);
        let xtwz = compute_xtwz(x, &self.w, &self.z);

        let beta = solve_spd(&xtwx, &xtwz).map_err(|_| {
            let (w_min, w_max) = self
                .w
                .iter()
                .fold((f64::INFINITY, 0.0f64), |(lo, hi), &w| (lo.min(w), hi.max(w)));
            if w_min < w_max * WEIGHT_COLLAPSE_RATIO {
                IrlsError::NumericalDivergence {
                    iteration,
                    cause: Divergence::CollapsedWeights,
                }
            } else {
                IrlsError::SingularDesign { iteration }
            }
        })?;

        if beta.iter().any(|b| !b.is_finite()) {
            return Err(IrlsError::NumericalDivergence {
                iteration,
                cause: Divergence::NonFiniteCoefficients,
            });
        }
        Ok(beta)
    }
}

/// Check the shapes and values of X, y and β⁰ before any arithmetic
fn validate_inputs<F: Family>(
    family: &F,
    x: &Array2<f64>,
    y: &Array1<f64>,
    beta0: Option<&Array1<f64>>,
) -> Result<()> {
    let (n, p) = x.dim();
    if n == 0 || p == 0 {
        return Err(Precondition::EmptyDesign.into());
    }
    if y.len() != n {
        return Err(Precondition::DimensionMismatch {
            rows: n,
            responses: y.len(),
        }
        .into());
    }
    if n < p {
        return Err(Precondition::Underdetermined { n, p }.into());
    }
    if let Some(((row, col), _)) = x.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(Precondition::NonFiniteDesign { row, col }.into());
    }
    if let Some((index, &value)) = y
        .iter()
        .enumerate()
        .find(|&(_, &v)| !family.is_valid_response(v))
    {
        return Err(Precondition::InvalidResponse { index, value }.into());
    }
    if let Some(beta0) = beta0 {
        if beta0.len() != p {
            return Err(Precondition::InitialCoefficientLength {
                expected: p,
                actual: beta0.len(),
            }
            .into());
        }
        if beta0.iter().any(|b| !b.is_finite()) {
            return Err(Precondition::NonFiniteInitialCoefficients.into());
        }
    }
    Ok(())
}

/// Fit a logistic regression of `y` on the design `x`
///
/// # Arguments
/// * `x` - Design matrix (n × p), conventionally with a leading column of ones
/// * `y` - Binary response (n,), entries 0 or 1
/// * `options` - Tolerance, iteration budget and starting β
///
/// Hitting the iteration budget is not an error: check `converged`.
pub fn fit_logistic_irls(
    x: &Array2<f64>,
    y: &Array1<f64>,
    options: &IrlsOptions,
) -> Result<FitResult> {
    fit_irls(&Binomial, x, y, options)
}

/// Fit a GLM of the given family by IRLS
pub fn fit_irls<F: Family>(
    family: &F,
    x: &Array2<f64>,
    y: &Array1<f64>,
    options: &IrlsOptions,
) -> Result<FitResult> {
    options.validate()?;
    validate_inputs(family, x, y, options.initial_coefficients.as_ref())?;

    let p = x.ncols();
    let mut beta = options
        .initial_coefficients
        .clone()
        .unwrap_or_else(|| Array1::zeros(p));

    let mut trace = Vec::new();
    let mut converged = false;
    let mut iterations = 0;

    for iteration in 1..=options.max_iterations {
        iterations = iteration;

        let working = WorkingSet::evaluate(family, x, y, &beta, iteration, options.parallel)?;
        trace.push(working.log_likelihood);

        let beta_new = working.solve(x, iteration)?;
        let change = options.norm.distance(&beta_new, &beta);
        beta = beta_new;

        debug!(
            "IRLS {} iteration {}: log-likelihood {:.6}, change {:.3e}",
            family.name(),
            iteration,
            working.log_likelihood,
            change
        );

        if change < options.tolerance {
            converged = true;
            break;
        }
    }

    // Final state at β̂; a saturated fit is still a failure here.
    let last = WorkingSet::evaluate(family, x, y, &beta, iterations, options.parallel)?;
    trace.push(last.log_likelihood);

    let stop_reason = if converged {
        StopReason::Converged
    } else {
        warn!(
            "IRLS did not converge within {} iterations (tolerance {:.1e})",
            options.max_iterations, options.tolerance
        );
        StopReason::IterationLimit
    };

    let deviance = family.deviance(y, &last.mu);

    Ok(FitResult {
        coefficients: beta,
        iterations,
        converged,
        stop_reason,
        linear_predictor: last.eta,
        fitted_values: last.mu,
        weights: last.w,
        log_likelihood: last.log_likelihood,
        deviance,
        log_likelihood_trace: trace,
    })
}

/// One application of the IRLS update map β ↦ (X'WX)⁻¹X'Wz
pub fn irls_update<F: Family>(
    family: &F,
    x: &Array2<f64>,
    y: &Array1<f64>,
    beta: &Array1<f64>,
) -> Result<Array1<f64>> {
    validate_inputs(family, x, y, Some(beta))?;
    let working = WorkingSet::evaluate(family, x, y, beta, 1, false)?;
    working.solve(x, 1)
}
