//! Zero-mean/unit-variance standardization

use crate::error::{FurlongError, Result};
use serde::{Deserialize, Serialize};

/// Frozen standardization parameters for one column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StandardParams {
    pub mean: f64,
    pub std: f64,
}

impl StandardParams {
    /// Fit mean and sample standard deviation over the finite values of
    /// a training column. A column with no variance cannot be
    /// standardized and is rejected as a degenerate feature before any
    /// model is fit.
    pub fn fit(name: &str, values: &[f64]) -> Result<Self> {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.len() < 2 {
            return Err(FurlongError::DegenerateFeature(name.to_string()));
        }

        let n = finite.len() as f64;
        let mean = finite.iter().sum::<f64>() / n;
        let var = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        let std = var.sqrt();
        if std < 1e-12 {
            return Err(FurlongError::DegenerateFeature(name.to_string()));
        }

        Ok(Self { mean, std })
    }

    pub fn transform(&self, x: f64) -> f64 {
        (x - self.mean) / self.std
    }
}
