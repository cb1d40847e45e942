//! Seeded data simulation
//!
//! Every routine takes the random generator explicitly, so a fit on
//! simulated data is reproducible from the seed alone.

use ndarray::{Array1, Array2};
use rand::distributions::{Distribution, Uniform};
use rand::Rng;

use crate::design::polynomial_design;
use crate::family::sigmoid;

/// Simulated binary-response data set
#[derive(Debug, Clone)]
pub struct SimulatedData {
    /// Covariate, sorted ascending
    pub x: Array1<f64>,
    /// Design matrix built from `x`
    pub design: Array2<f64>,
    /// Binary response
    pub y: Array1<f64>,
    /// Success probabilities the response was drawn from
    pub probabilities: Array1<f64>,
}

fn sorted_uniform<R: Rng + ?Sized>(rng: &mut R, n: usize) -> Array1<f64> {
    let uniform = Uniform::new(0.0, 1.0);
    let mut x: Vec<f64> = (0..n).map(|_| uniform.sample(rng)).collect();
    x.sort_by(f64::total_cmp);
    Array1::from_vec(x)
}

/// Draw `n` points from a logistic model whose linear predictor is a
/// polynomial in x ~ U(0, 1).
///
/// `coefficients` are in increasing powers of x, so `[-8.0, 16.0]` gives
/// logit P(y = 1) = -8 + 16x. Empty `coefficients` are treated as `[0.0]`.
pub fn simulate_logistic<R: Rng + ?Sized>(
    rng: &mut R,
    n: usize,
    coefficients: &[f64],
) -> SimulatedData {
    let beta = if coefficients.is_empty() {
        Array1::zeros(1)
    } else {
        Array1::from_vec(coefficients.to_vec())
    };

    let x = sorted_uniform(rng, n);
    let design = polynomial_design(x.view(), beta.len() - 1);
    let probabilities = design.dot(&beta).mapv(sigmoid);

    let uniform = Uniform::new(0.0, 1.0);
    let y = probabilities.mapv(|p| if uniform.sample(rng) < p { 1.0 } else { 0.0 });

    SimulatedData {
        x,
        design,
        y,
        probabilities,
    }
}

/// Draw `n` sorted points from U(0, 1) with y = 1 exactly when x > threshold.
/// The design is `[1, x]`.
pub fn simulate_separable<R: Rng + ?Sized>(rng: &mut R, n: usize, threshold: f64) -> SimulatedData {
    let x = sorted_uniform(rng, n);
    let design = polynomial_design(x.view(), 1);
    let y = x.mapv(|xi| if xi > threshold { 1.0 } else { 0.0 });
    let probabilities = y.clone();

    SimulatedData {
        x,
        design,
        y,
        probabilities,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_same_seed_same_data() {
        let a = simulate_logistic(&mut ChaCha8Rng::seed_from_u64(7), 50, &[-1.0, 2.0]);
        let b = simulate_logistic(&mut ChaCha8Rng::seed_from_u64(7), 50, &[-1.0, 2.0]);
        assert_eq!(a.x, b.x);
        assert_eq!(a.y, b.y);
    }

    #[test]
    fn test_shapes_and_ordering() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let data = simulate_logistic(&mut rng, 120, &[0.5, -1.0, 2.0]);

        assert_eq!(data.design.dim(), (120, 3));
        assert!(data.x.windows(2).into_iter().all(|w| w[0] <= w[1]));
        assert!(data.x.iter().all(|&v| (0.0..1.0).contains(&v)));
        assert!(data.y.iter().all(|&v| v == 0.0 || v == 1.0));
        assert!(data.probabilities.iter().all(|&p| p > 0.0 && p < 1.0));
    }

    #[test]
    fn test_separable_labels() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let data = simulate_separable(&mut rng, 40, 0.5);
        for (&xi, &yi) in data.x.iter().zip(data.y.iter()) {
            assert_eq!(yi, if xi > 0.5 { 1.0 } else { 0.0 });
        }
    }
}
