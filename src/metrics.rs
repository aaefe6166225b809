use std::collections::BTreeSet;

use crate::outcome::Outcome;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub per_class: Vec<(Outcome, ClassMetrics)>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

/// Rows are true classes, columns predicted classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub classes: Vec<Outcome>,
    pub counts: Vec<Vec<usize>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbabilityMetrics {
    pub samples: usize,
    pub brier: f64,
    pub log_loss: f64,
}

pub fn accuracy(truth: &[Outcome], predicted: &[Outcome]) -> f64 {
    if truth.is_empty() || truth.len() != predicted.len() {
        return 0.0;
    }
    let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
    correct as f64 / truth.len() as f64
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Per-class precision, recall and F1 over the sorted union of true and
/// predicted labels. Undefined ratios are reported as zero.
pub fn classification_report(truth: &[Outcome], predicted: &[Outcome]) -> ClassificationReport {
    let labels: BTreeSet<Outcome> = truth.iter().chain(predicted).copied().collect();
    let mut per_class = Vec::with_capacity(labels.len());
    for class in labels {
        let mut tp = 0usize;
        let mut predicted_pos = 0usize;
        let mut support = 0usize;
        for (t, p) in truth.iter().zip(predicted) {
            if *p == class {
                predicted_pos += 1;
            }
            if *t == class {
                support += 1;
                if *p == class {
                    tp += 1;
                }
            }
        }
        let precision = ratio(tp, predicted_pos);
        let recall = ratio(tp, support);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        per_class.push((
            class,
            ClassMetrics {
                precision,
                recall,
                f1,
                support,
            },
        ));
    }

    let total: usize = per_class.iter().map(|(_, m)| m.support).sum();
    let k = per_class.len().max(1) as f64;
    let avg = |f: fn(&ClassMetrics) -> f64| per_class.iter().map(|(_, m)| f(m)).sum::<f64>() / k;
    let weighted = |f: fn(&ClassMetrics) -> f64| {
        if total == 0 {
            0.0
        } else {
            per_class
                .iter()
                .map(|(_, m)| f(m) * m.support as f64)
                .sum::<f64>()
                / total as f64
        }
    };

    let macro_avg = ClassMetrics {
        precision: avg(|m| m.precision),
        recall: avg(|m| m.recall),
        f1: avg(|m| m.f1),
        support: total,
    };
    let weighted_avg = ClassMetrics {
        precision: weighted(|m| m.precision),
        recall: weighted(|m| m.recall),
        f1: weighted(|m| m.f1),
        support: total,
    };

    ClassificationReport {
        accuracy: accuracy(truth, predicted),
        per_class,
        macro_avg,
        weighted_avg,
    }
}

/// Labels outside `classes` are not counted.
pub fn confusion_matrix(
    truth: &[Outcome],
    predicted: &[Outcome],
    classes: &[Outcome],
) -> ConfusionMatrix {
    let mut counts = vec![vec![0usize; classes.len()]; classes.len()];
    for (t, p) in truth.iter().zip(predicted) {
        let row = classes.iter().position(|c| c == t);
        let col = classes.iter().position(|c| c == p);
        if let (Some(r), Some(c)) = (row, col) {
            counts[r][c] += 1;
        }
    }
    ConfusionMatrix {
        classes: classes.to_vec(),
        counts,
    }
}

/// Brier score and log loss of probability vectors indexed like `classes`.
pub fn probability_metrics(
    probas: &[Vec<f64>],
    classes: &[Outcome],
    truth: &[Outcome],
) -> ProbabilityMetrics {
    if probas.is_empty() || probas.len() != truth.len() {
        return ProbabilityMetrics {
            samples: 0,
            brier: 0.0,
            log_loss: 0.0,
        };
    }

    let mut brier_sum = 0.0_f64;
    let mut log_loss_sum = 0.0_f64;
    for (p, outcome) in probas.iter().zip(truth) {
        let mut actual_prob = 0.0;
        for (k, class) in classes.iter().enumerate() {
            let pk = p.get(k).copied().unwrap_or(0.0);
            let y = if class == outcome { 1.0 } else { 0.0 };
            brier_sum += (pk - y).powi(2);
            if class == outcome {
                actual_prob = pk;
            }
        }
        if !classes.contains(outcome) {
            brier_sum += 1.0;
        }
        log_loss_sum += -actual_prob.clamp(1e-12, 1.0).ln();
    }

    let n = probas.len() as f64;
    ProbabilityMetrics {
        samples: probas.len(),
        brier: brier_sum / n,
        log_loss: log_loss_sum / n,
    }
}
