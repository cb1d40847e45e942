//! logit_irls: logistic regression by Iteratively Reweighted Least Squares
//!
//! This library fits a binomial GLM with the canonical logit link using
//! Fisher scoring, written as repeated weighted least-squares solves of the
//! normal equations (X'WX)β = X'Wz. The solver stops on a fixed-point
//! tolerance or an iteration cap and reports which one ended the fit.
//!
//! ```rust,no_run
//! use logit_irls::{fit_logistic_irls, IrlsOptions, simulate::simulate_logistic};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//! let data = simulate_logistic(&mut rng, 300, &[-8.0, 16.0]);
//!
//! let options = IrlsOptions::default().initial_coefficients(vec![-5.0, 10.0]);
//! let fit = fit_logistic_irls(&data.design, &data.y, &options).unwrap();
//! assert!(fit.converged);
//! println!("{}", fit.summarize(&data.design, &data.y).unwrap());
//! ```

pub mod design;
pub mod family;
pub mod irls;
pub mod linalg;
pub mod simulate;
pub mod summary;

pub use family::{Binomial, Family};
pub use irls::{fit_irls, fit_logistic_irls, irls_update, ConvergenceNorm, FitResult, IrlsOptions, StopReason};
pub use summary::{CoefficientSummary, LogisticSummary};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IrlsError {
    #[error("Invalid input: {0}")]
    Precondition(#[from] Precondition),

    #[error("Numerical divergence at iteration {iteration}: {cause}")]
    NumericalDivergence { iteration: usize, cause: Divergence },

    #[error("Singular design: X'WX is not invertible at iteration {iteration}")]
    SingularDesign { iteration: usize },
}

impl IrlsError {
    /// True when the inputs were rejected before any iteration ran.
    pub fn is_precondition(&self) -> bool {
        matches!(self, IrlsError::Precondition(_))
    }

    /// Iteration at which the fit was aborted, if it got that far.
    pub fn iteration(&self) -> Option<usize> {
        match self {
            IrlsError::Precondition(_) => None,
            IrlsError::NumericalDivergence { iteration, .. }
            | IrlsError::SingularDesign { iteration } => Some(*iteration),
        }
    }
}

/// Input constraints checked before fitting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Precondition {
    #[error("design matrix is empty")]
    EmptyDesign,

    #[error("design matrix has {rows} rows but response has {responses} entries")]
    DimensionMismatch { rows: usize, responses: usize },

    #[error("{n} observations cannot identify {p} coefficients (need n >= p)")]
    Underdetermined { n: usize, p: usize },

    #[error("design matrix entry ({row}, {col}) is not finite")]
    NonFiniteDesign { row: usize, col: usize },

    #[error("response entry {index} is {value}, expected 0 or 1")]
    InvalidResponse { index: usize, value: f64 },

    #[error("initial coefficients have length {actual}, expected {expected}")]
    InitialCoefficientLength { expected: usize, actual: usize },

    #[error("design matrix has {actual} columns but the fit has {expected} coefficients")]
    ColumnMismatch { expected: usize, actual: usize },

    #[error("initial coefficients contain a non-finite value")]
    NonFiniteInitialCoefficients,

    #[error("tolerance must be positive and finite, got {0}")]
    InvalidTolerance(f64),

    #[error("max_iterations must be at least 1")]
    ZeroIterationBudget,
}

/// What went non-finite or degenerate during an iteration.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Divergence {
    #[error("fitted probability for observation {observation} saturated at 0 or 1")]
    SaturatedProbability { observation: usize },

    #[error("working response for observation {observation} is not finite")]
    NonFiniteWorkingResponse { observation: usize },

    #[error("working weights collapsed and X'WX lost rank")]
    CollapsedWeights,

    #[error("updated coefficients are not finite")]
    NonFiniteCoefficients,
}

pub type Result<T> = std::result::Result<T, IrlsError>;
