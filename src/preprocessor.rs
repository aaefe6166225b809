use std::collections::BTreeSet;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::features::FeatureRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericScaler {
    pub column: String,
    pub mean: f64,
    pub scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryEncoder {
    pub column: String,
    /// Sorted; lookups binary-search this list.
    pub categories: Vec<String>,
}

/// Standard scaling for numeric columns and one-hot encoding for categorical
/// ones, learned once from a training partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPreprocessor {
    pub numeric: Vec<NumericScaler>,
    pub categorical: Vec<CategoryEncoder>,
}

/// An encoded feature vector. Scaled numeric values occupy the first
/// `dense.len()` positions; `active` lists the one-hot positions set to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRow {
    pub dense: Vec<f64>,
    pub active: Vec<usize>,
}

impl EncodedRow {
    pub fn value(&self, feature: usize) -> f64 {
        if feature < self.dense.len() {
            self.dense[feature]
        } else if self.active.contains(&feature) {
            1.0
        } else {
            0.0
        }
    }

    pub fn dot(&self, weights: &[f64]) -> f64 {
        let dense: f64 = self.dense.iter().zip(weights).map(|(x, w)| x * w).sum();
        dense + self.active.iter().map(|&j| weights[j]).sum::<f64>()
    }

    pub fn squared_norm(&self) -> f64 {
        self.dense.iter().map(|x| x * x).sum::<f64>() + self.active.len() as f64
    }

    pub fn to_dense(&self, width: usize) -> Vec<f64> {
        let mut out = vec![0.0; width];
        out[..self.dense.len()].copy_from_slice(&self.dense);
        for &j in &self.active {
            out[j] = 1.0;
        }
        out
    }
}

impl FittedPreprocessor {
    pub fn fit(rows: &[FeatureRow], numeric: &[String], categorical: &[String]) -> Result<Self> {
        if rows.is_empty() {
            return Err(anyhow!("cannot fit preprocessor on an empty partition"));
        }

        let mut scalers = Vec::with_capacity(numeric.len());
        for column in numeric {
            let values = rows
                .iter()
                .map(|r| r.numeric(column))
                .collect::<Option<Vec<f64>>>()
                .ok_or_else(|| anyhow!("unknown numeric column {column:?}"))?;
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            scalers.push(NumericScaler {
                column: column.clone(),
                mean,
                scale: if std > 0.0 { std } else { 1.0 },
            });
        }

        let mut encoders = Vec::with_capacity(categorical.len());
        for column in categorical {
            let mut seen: BTreeSet<String> = BTreeSet::new();
            for row in rows {
                let value = row
                    .categorical(column)
                    .ok_or_else(|| anyhow!("unknown categorical column {column:?}"))?;
                if !seen.contains(&*value) {
                    seen.insert(value.into_owned());
                }
            }
            encoders.push(CategoryEncoder {
                column: column.clone(),
                categories: seen.into_iter().collect(),
            });
        }

        Ok(Self {
            numeric: scalers,
            categorical: encoders,
        })
    }

    pub fn width(&self) -> usize {
        self.numeric.len()
            + self
                .categorical
                .iter()
                .map(|e| e.categories.len())
                .sum::<usize>()
    }

    pub fn numeric_width(&self) -> usize {
        self.numeric.len()
    }

    /// Encodes one row. A category not seen during fitting leaves its block
    /// all zero.
    pub fn transform_row(&self, row: &FeatureRow) -> EncodedRow {
        let dense = self
            .numeric
            .iter()
            .map(|s| (row.numeric(&s.column).unwrap_or(s.mean) - s.mean) / s.scale)
            .collect();

        let mut active = Vec::with_capacity(self.categorical.len());
        let mut offset = self.numeric.len();
        for enc in &self.categorical {
            if let Some(value) = row.categorical(&enc.column)
                && let Ok(pos) = enc
                    .categories
                    .binary_search_by(|c| c.as_str().cmp(&*value))
            {
                active.push(offset + pos);
            }
            offset += enc.categories.len();
        }

        EncodedRow { dense, active }
    }

    pub fn transform(&self, rows: &[FeatureRow]) -> Vec<EncodedRow> {
        rows.iter().map(|r| self.transform_row(r)).collect()
    }

    pub fn feature_names_out(&self) -> Vec<String> {
        let mut names: Vec<String> = self.numeric.iter().map(|s| s.column.clone()).collect();
        for enc in &self.categorical {
            names.extend(enc.categories.iter().map(|c| format!("{}_{}", enc.column, c)));
        }
        names
    }
}
