use anyhow::{Result, anyhow};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::preprocessor::EncodedRow;

const LR_DECAY: f64 = 0.003;
const INIT_SCALE: f64 = 0.01;
const GRAD_CHUNK: usize = 4096;

#[derive(Debug, Clone, Copy)]
pub struct LogisticParams {
    pub max_iter: usize,
    /// Inverse regularization strength.
    pub c: f64,
    pub tol: f64,
    pub seed: u64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            c: 1.0,
            tol: 1e-4,
            seed: 42,
        }
    }
}

/// Multinomial softmax regression over encoded rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    /// One row of coefficients per class.
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
}

impl LogisticModel {
    /// Full-batch gradient descent on mean cross-entropy plus an L2 penalty of
    /// `1 / (2 C n) * |W|^2`. The intercepts are not penalised.
    pub fn fit(
        rows: &[EncodedRow],
        labels: &[usize],
        n_classes: usize,
        width: usize,
        params: LogisticParams,
    ) -> Result<Self> {
        if rows.is_empty() || rows.len() != labels.len() {
            return Err(anyhow!(
                "logistic fit needs matching non-empty rows and labels ({} vs {})",
                rows.len(),
                labels.len()
            ));
        }
        if n_classes < 2 {
            return Err(anyhow!("logistic fit needs at least two classes"));
        }
        if let Some(&bad) = labels.iter().find(|&&y| y >= n_classes) {
            return Err(anyhow!("label index {bad} out of range for {n_classes} classes"));
        }

        let n = rows.len() as f64;
        let l2 = 1.0 / (params.c.max(1e-12) * n);
        let max_norm = rows.iter().map(EncodedRow::squared_norm).fold(0.0, f64::max);
        let lr_start = 1.0 / (0.5 * (max_norm + 1.0) + l2);

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut model = Self {
            coefficients: (0..n_classes)
                .map(|_| {
                    (0..width)
                        .map(|_| rng.gen_range(-INIT_SCALE..INIT_SCALE))
                        .collect()
                })
                .collect(),
            intercepts: vec![0.0; n_classes],
            iterations: 0,
            converged: false,
        };

        for iter in 0..params.max_iter {
            let (mut grad_w, grad_b) = model.gradient(rows, labels, width);
            let mut norm_sq = 0.0;
            for (k, row) in grad_w.iter_mut().enumerate() {
                for (j, g) in row.iter_mut().enumerate() {
                    *g = *g / n + l2 * model.coefficients[k][j];
                    norm_sq += *g * *g;
                }
            }
            let grad_b: Vec<f64> = grad_b.into_iter().map(|g| g / n).collect();
            norm_sq += grad_b.iter().map(|g| g * g).sum::<f64>();

            model.iterations = iter + 1;
            if norm_sq.sqrt() < params.tol {
                model.converged = true;
                break;
            }

            let lr = lr_start / (1.0 + iter as f64 * LR_DECAY);
            for (k, row) in grad_w.iter().enumerate() {
                for (w, g) in model.coefficients[k].iter_mut().zip(row) {
                    *w -= lr * g;
                }
                model.intercepts[k] -= lr * grad_b[k];
            }

            if iter % 100 == 0 {
                debug!("logistic iter {iter}: |grad| = {:.6}", norm_sq.sqrt());
            }
        }

        info!(
            "logistic regression: {} iterations, converged = {}",
            model.iterations, model.converged
        );
        Ok(model)
    }

    /// Summed (not averaged) loss gradient. Chunks are reduced in order so the
    /// result does not depend on thread scheduling.
    fn gradient(
        &self,
        rows: &[EncodedRow],
        labels: &[usize],
        width: usize,
    ) -> (Vec<Vec<f64>>, Vec<f64>) {
        let k = self.intercepts.len();
        let partials: Vec<(Vec<Vec<f64>>, Vec<f64>)> = rows
            .par_chunks(GRAD_CHUNK)
            .zip(labels.par_chunks(GRAD_CHUNK))
            .map(|(xs, ys)| {
                let mut gw = vec![vec![0.0; width]; k];
                let mut gb = vec![0.0; k];
                for (x, &y) in xs.iter().zip(ys) {
                    let p = self.predict_proba(x);
                    for class in 0..k {
                        let d = p[class] - if class == y { 1.0 } else { 0.0 };
                        gb[class] += d;
                        let row = &mut gw[class];
                        for (j, v) in x.dense.iter().enumerate() {
                            row[j] += d * v;
                        }
                        for &j in &x.active {
                            row[j] += d;
                        }
                    }
                }
                (gw, gb)
            })
            .collect();

        let mut grad_w = vec![vec![0.0; width]; k];
        let mut grad_b = vec![0.0; k];
        for (gw, gb) in partials {
            for class in 0..k {
                for (acc, g) in grad_w[class].iter_mut().zip(&gw[class]) {
                    *acc += g;
                }
                grad_b[class] += gb[class];
            }
        }
        (grad_w, grad_b)
    }

    pub fn decision(&self, row: &EncodedRow) -> Vec<f64> {
        self.coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(w, b)| row.dot(w) + b)
            .collect()
    }

    pub fn predict_proba(&self, row: &EncodedRow) -> Vec<f64> {
        softmax(&self.decision(row))
    }
}

pub fn softmax(z: &[f64]) -> Vec<f64> {
    let max = z.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = z.iter().map(|v| (v - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(x: f64) -> EncodedRow {
        EncodedRow {
            dense: vec![x],
            active: Vec::new(),
        }
    }

    fn separable() -> (Vec<EncodedRow>, Vec<usize>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..30 {
            let x = -3.0 + i as f64 * 0.2;
            rows.push(row(x));
            labels.push(if x < -1.0 {
                0
            } else if x < 1.0 {
                1
            } else {
                2
            });
        }
        (rows, labels)
    }

    #[test]
    fn softmax_is_a_distribution() {
        let p = softmax(&[1000.0, 1000.0, -1000.0]);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((p[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn learns_ordered_classes() {
        let (rows, labels) = separable();
        let model = LogisticModel::fit(&rows, &labels, 3, 1, LogisticParams::default()).unwrap();
        let argmax = |x: f64| {
            let p = model.predict_proba(&row(x));
            (0..3).max_by(|&a, &b| p[a].total_cmp(&p[b])).unwrap()
        };
        assert_eq!(argmax(-3.0), 0);
        assert_eq!(argmax(0.0), 1);
        assert_eq!(argmax(3.0), 2);
        // Lowest class falls with x, highest rises.
        assert!(model.coefficients[0][0] < 0.0);
        assert!(model.coefficients[2][0] > 0.0);
    }

    #[test]
    fn fixed_seed_is_deterministic() {
        let (rows, labels) = separable();
        let params = LogisticParams {
            max_iter: 50,
            ..LogisticParams::default()
        };
        let a = LogisticModel::fit(&rows, &labels, 3, 1, params).unwrap();
        let b = LogisticModel::fit(&rows, &labels, 3, 1, params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_bad_inputs() {
        let (rows, labels) = separable();
        let params = LogisticParams::default();
        assert!(LogisticModel::fit(&[], &[], 3, 1, params).is_err());
        assert!(LogisticModel::fit(&rows, &labels[..3], 3, 1, params).is_err());
        assert!(LogisticModel::fit(&rows, &labels, 1, 1, params).is_err());
        assert!(LogisticModel::fit(&rows, &labels, 2, 1, params).is_err());
    }
}
