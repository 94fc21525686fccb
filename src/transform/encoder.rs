//! One-hot encoding with a frozen category vocabulary
//!
//! The first category of each field (in sorted order) is dropped as the
//! reference level. Categories unseen at fit time encode as all-zero
//! rows across the field's columns.

use crate::error::Result;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EncodedField {
    name: String,
    /// Sorted category vocabulary; index 0 is the dropped reference
    categories: Vec<String>,
}

/// Frozen-vocabulary one-hot encoder over string-valued fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneHotEncoder {
    fields: Vec<EncodedField>,
}

impl OneHotEncoder {
    /// Fit the vocabulary from training columns: (field name, per-row values).
    pub fn fit(columns: &[(String, Vec<String>)]) -> Self {
        let fields = columns
            .iter()
            .map(|(name, values)| {
                let mut categories: Vec<String> = values.to_vec();
                categories.sort();
                categories.dedup();
                EncodedField {
                    name: name.clone(),
                    categories,
                }
            })
            .collect();

        Self { fields }
    }

    /// Output column names: `{field}_{category}` for every non-reference category.
    pub fn column_names(&self) -> Vec<String> {
        self.fields
            .iter()
            .flat_map(|f| {
                f.categories
                    .iter()
                    .skip(1)
                    .map(move |c| format!("{}_{}", f.name, c))
            })
            .collect()
    }

    /// Encode a partition's columns against the frozen vocabulary.
    pub fn encode(&self, columns: &[(String, Vec<String>)]) -> Result<Array2<f64>> {
        let n_rows = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        let n_cols = self.column_names().len();
        let mut out = Array2::zeros((n_rows, n_cols));

        let mut offset = 0usize;
        for field in &self.fields {
            let values = columns
                .iter()
                .find(|(name, _)| *name == field.name)
                .map(|(_, v)| v.as_slice())
                .ok_or_else(|| crate::error::FurlongError::FeatureNotFound(field.name.clone()))?;

            for (row, value) in values.iter().enumerate() {
                // reference category and unseen categories leave all zeros
                if let Some(pos) = field.categories.iter().position(|c| c == value) {
                    if pos > 0 {
                        out[[row, offset + pos - 1]] = 1.0;
                    }
                }
            }
            offset += field.categories.len().saturating_sub(1);
        }

        Ok(out)
    }
}
