//! Design matrix construction

use ndarray::{s, Array2, ArrayView1, ArrayView2};

/// Columns `[1, x]`
pub fn with_intercept(x: ArrayView1<f64>) -> Array2<f64> {
    polynomial_design(x, 1)
}

/// Monomial basis columns `1, x, x², ..., x^degree`
pub fn polynomial_design(x: ArrayView1<f64>, degree: usize) -> Array2<f64> {
    let n = x.len();
    let mut design = Array2::<f64>::ones((n, degree + 1));
    for (i, &xi) in x.iter().enumerate() {
        let mut power = 1.0;
        for j in 1..=degree {
            power *= xi;
            design[[i, j]] = power;
        }
    }
    design
}

/// Prepend a column of ones to an existing predictor matrix
pub fn add_intercept(x: ArrayView2<f64>) -> Array2<f64> {
    let (n, p) = x.dim();
    let mut design = Array2::<f64>::ones((n, p + 1));
    design.slice_mut(s![.., 1..]).assign(&x);
    design
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_with_intercept() {
        let x = array![0.5, 2.0];
        let design = with_intercept(x.view());
        assert_eq!(design, array![[1.0, 0.5], [1.0, 2.0]]);
    }

    #[test]
    fn test_polynomial_design() {
        let x = array![2.0, -1.0];
        let design = polynomial_design(x.view(), 3);
        assert_eq!(design, array![[1.0, 2.0, 4.0, 8.0], [1.0, -1.0, 1.0, -1.0]]);
    }

    #[test]
    fn test_add_intercept() {
        let x = array![[3.0, 4.0], [5.0, 6.0]];
        let design = add_intercept(x.view());
        assert_eq!(design, array![[1.0, 3.0, 4.0], [1.0, 5.0, 6.0]]);
    }
}
