//! Response families for IRLS fitting
//!
//! The solver only needs a handful of scalar functions from a family:
//! the link and its inverse, dμ/dη, the variance function and a
//! log-likelihood. `Binomial` with the logit link is the only family shipped.

/// Probabilities closer than this to 0 or 1 are treated as saturated.
pub const SATURATION_EPS: f64 = 10.0 * f64::EPSILON;

/// Exponential family distribution with a fixed link
pub trait Family: Sync {
    /// Short name used in logs and summaries
    fn name(&self) -> &'static str;

    /// Link function: η = g(μ)
    fn link(&self, mu: f64) -> f64;

    /// Inverse link function: μ = g⁻¹(η)
    fn inverse_link(&self, eta: f64) -> f64;

    /// Derivative of inverse link: dμ/dη
    fn d_inverse_link(&self, eta: f64) -> f64;

    /// Variance function V(μ)
    fn variance(&self, mu: f64) -> f64;

    /// Whether `y` lies in the support of the response
    fn is_valid_response(&self, y: f64) -> bool;

    /// Whether `mu` sits on the boundary of the mean space, where the
    /// working weight vanishes
    fn is_saturated(&self, mu: f64) -> bool;

    /// Log-likelihood contribution of one observation
    fn log_likelihood(&self, y: f64, mu: f64) -> f64;

    /// Unit deviance 2(ℓ_saturated - ℓ) for one observation
    fn unit_deviance(&self, y: f64, mu: f64) -> f64;

    /// Total log-likelihood
    fn total_log_likelihood<'a>(&self, y: impl IntoIterator<Item = &'a f64>, mu: impl IntoIterator<Item = &'a f64>) -> f64
    where
        Self: Sized,
    {
        y.into_iter()
            .zip(mu)
            .map(|(&yi, &mui)| self.log_likelihood(yi, mui))
            .sum()
    }

    /// Total deviance
    fn deviance<'a>(&self, y: impl IntoIterator<Item = &'a f64>, mu: impl IntoIterator<Item = &'a f64>) -> f64
    where
        Self: Sized,
    {
        y.into_iter()
            .zip(mu)
            .map(|(&yi, &mui)| self.unit_deviance(yi, mui))
            .sum()
    }
}

/// Bernoulli response with the canonical logit link
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Binomial;

/// Logistic function 1 / (1 + e^(-η)), evaluated without overflow on either tail.
pub fn sigmoid(eta: f64) -> f64 {
    if eta >= 0.0 {
        1.0 / (1.0 + (-eta).exp())
    } else {
        let e = eta.exp();
        e / (1.0 + e)
    }
}

/// Log-odds log(μ / (1 - μ))
pub fn logit(mu: f64) -> f64 {
    (mu / (1.0 - mu)).ln()
}

impl Family for Binomial {
    fn name(&self) -> &'static str {
        "binomial(logit)"
    }

    fn link(&self, mu: f64) -> f64 {
        logit(mu)
    }

    fn inverse_link(&self, eta: f64) -> f64 {
        sigmoid(eta)
    }

    fn d_inverse_link(&self, eta: f64) -> f64 {
        let mu = sigmoid(eta);
        mu * (1.0 - mu)
    }

    fn variance(&self, mu: f64) -> f64 {
        mu * (1.0 - mu)
    }

    fn is_valid_response(&self, y: f64) -> bool {
        y == 0.0 || y == 1.0
    }

    fn is_saturated(&self, mu: f64) -> bool {
        !(mu > SATURATION_EPS && mu < 1.0 - SATURATION_EPS)
    }

    fn log_likelihood(&self, y: f64, mu: f64) -> f64 {
        // 0 * ln(0) = 0
        let hit = if y > 0.0 { y * mu.ln() } else { 0.0 };
        let miss = if y < 1.0 { (1.0 - y) * (1.0 - mu).ln() } else { 0.0 };
        hit + miss
    }

    fn unit_deviance(&self, y: f64, mu: f64) -> f64 {
        let d1 = if y > 0.0 { y * (y / mu).ln() } else { 0.0 };
        let d2 = if y < 1.0 { (1.0 - y) * ((1.0 - y) / (1.0 - mu)).ln() } else { 0.0 };
        2.0 * (d1 + d2)
    }
}
