//! Yeo-Johnson power transform
//!
//! Monotonic variance-stabilizing transform for skewed features. The
//! lambda parameter is fitted on training data by log-likelihood grid
//! search and frozen; the inverse is recovered with Newton-Raphson.

use serde::{Deserialize, Serialize};

/// Fitted Yeo-Johnson transform.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct YeoJohnson {
    lambda: f64,
}

impl YeoJohnson {
    /// Fit lambda on the finite values of a training column.
    pub fn fit(values: &[f64]) -> Self {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();

        let mut best_lambda = 1.0;
        let mut best_ll = f64::NEG_INFINITY;
        for lambda_int in -20..=20 {
            let lambda = lambda_int as f64 * 0.1;
            let ll = log_likelihood(&finite, lambda);
            if ll > best_ll {
                best_ll = ll;
                best_lambda = lambda;
            }
        }

        Self {
            lambda: best_lambda,
        }
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn transform(&self, x: f64) -> f64 {
        transform_value(x, self.lambda)
    }

    /// Invert the transform with Newton-Raphson.
    pub fn inverse(&self, y: f64) -> f64 {
        let mut x = y;
        for _ in 0..30 {
            let fx = transform_value(x, self.lambda) - y;
            if fx.abs() < 1e-12 {
                break;
            }
            let h = 1e-8;
            let dfx =
                (transform_value(x + h, self.lambda) - transform_value(x - h, self.lambda))
                    / (2.0 * h);
            if dfx.abs() < 1e-12 {
                break;
            }
            x -= fx / dfx;
        }
        x
    }
}

fn transform_value(x: f64, lambda: f64) -> f64 {
    if x >= 0.0 {
        if lambda.abs() < 1e-10 {
            (x + 1.0).ln()
        } else {
            ((x + 1.0).powf(lambda) - 1.0) / lambda
        }
    } else if (lambda - 2.0).abs() < 1e-10 {
        -((-x + 1.0).ln())
    } else {
        -(((-x + 1.0).powf(2.0 - lambda) - 1.0) / (2.0 - lambda))
    }
}

fn log_likelihood(values: &[f64], lambda: f64) -> f64 {
    let n = values.len() as f64;
    if n < 2.0 {
        return f64::NEG_INFINITY;
    }

    let transformed: Vec<f64> = values.iter().map(|&x| transform_value(x, lambda)).collect();
    let mean = transformed.iter().sum::<f64>() / n;
    let variance = transformed.iter().map(|&t| (t - mean).powi(2)).sum::<f64>() / n;
    if variance <= 0.0 {
        return f64::NEG_INFINITY;
    }

    let log_jacobian: f64 = values.iter().map(|&x| (x.abs() + 1.0).ln().copysign(x)).sum();

    -n / 2.0 * variance.ln() + (lambda - 1.0) * log_jacobian
}

/// Sample skewness over the finite values of a column: third central
/// moment over the cubed standard deviation (variance with ddof = 1).
pub fn sample_skewness(values: &[f64]) -> f64 {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let n = finite.len() as f64;
    if n < 2.0 {
        return 0.0;
    }

    let mean = finite.iter().sum::<f64>() / n;
    let var = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std = var.sqrt();
    if std < 1e-12 {
        return 0.0;
    }

    let m3 = finite.iter().map(|v| (v - mean).powi(3)).sum::<f64>() / n;
    m3 / (std * std * std)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_handles_negative_values() {
        let values = vec![-2.0, -1.0, 0.0, 1.0, 2.0, 3.0];
        let yj = YeoJohnson::fit(&values);
        for &v in &values {
            assert!(yj.transform(v).is_finite());
        }
    }

    #[test]
    fn test_inverse_round_trip() {
        let values = vec![0.5, 1.0, 2.0, 4.0, 8.0, 16.0, 32.0];
        let yj = YeoJohnson::fit(&values);
        for &v in &values {
            let recovered = yj.inverse(yj.transform(v));
            assert!((recovered - v).abs() < 1e-6, "{v} -> {recovered}");
        }
    }

    #[test]
    fn test_skewness_of_symmetric_data_near_zero() {
        let values = vec![-2.0, -1.0, 0.0, 1.0, 2.0];
        assert!(sample_skewness(&values).abs() < 1e-10);
    }

    #[test]
    fn test_skewness_of_exponential_like_data() {
        let values = vec![1.0, 1.0, 1.0, 2.0, 2.0, 3.0, 5.0, 9.0, 30.0, 100.0];
        assert!(sample_skewness(&values) > 1.0);
    }
}
