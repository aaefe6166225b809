use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use chrono::Utc;
use log::{error, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::config::{LOGISTIC_REGRESSION_NAME, PipelineConfig, RANDOM_FOREST_NAME};
use crate::features::{AnalyzedMatch, FeatureRow};
use crate::forest::{ForestParams, RandomForest};
use crate::logistic::{LogisticModel, LogisticParams};
use crate::metrics::accuracy;
use crate::model::{Classifier, ModelArtifact};
use crate::outcome::Outcome;
use crate::preprocessor::FittedPreprocessor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Logistic,
    Forest,
}

impl CandidateKind {
    pub fn display_name(self) -> &'static str {
        match self {
            CandidateKind::Logistic => LOGISTIC_REGRESSION_NAME,
            CandidateKind::Forest => RANDOM_FOREST_NAME,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScore {
    pub name: String,
    pub accuracy: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub train_rows: usize,
    pub test_rows: usize,
    pub class_balance: Vec<(Outcome, usize, usize)>,
    pub candidates: Vec<CandidateScore>,
    pub selected: String,
}

#[derive(Debug, Clone)]
pub struct TrainedSelection {
    pub artifact: ModelArtifact,
    pub test_rows: Vec<FeatureRow>,
    pub test_labels: Vec<Outcome>,
    pub report: TrainingReport,
}

impl TrainedSelection {
    pub fn name(&self) -> &str {
        &self.artifact.name
    }
}

/// Splits row indices into (train, test). Each class sends
/// `round(count * test_fraction)` of its rows to the test side.
pub fn stratified_split(
    labels: &[Outcome],
    test_fraction: f64,
    seed: u64,
) -> (Vec<usize>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();
    for class in Outcome::ALL {
        let mut members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, l)| **l == class)
            .map(|(i, _)| i)
            .collect();
        members.shuffle(&mut rng);
        let n_test = ((members.len() as f64) * test_fraction).round() as usize;
        let n_test = n_test.min(members.len());
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }
    train.shuffle(&mut rng);
    test.shuffle(&mut rng);
    (train, test)
}

/// Index of the highest score. A later score must be strictly greater to
/// displace an earlier one.
pub fn select_best(scores: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &score) in scores.iter().enumerate() {
        match best {
            Some(b) if score > scores[b] => best = Some(i),
            None => best = Some(i),
            _ => {}
        }
    }
    best
}

pub fn fit_candidate(
    kind: CandidateKind,
    rows: &[FeatureRow],
    labels: &[Outcome],
    config: &PipelineConfig,
) -> Result<ModelArtifact> {
    let preprocessor = FittedPreprocessor::fit(
        rows,
        &config.numeric_columns,
        &config.categorical_columns,
    )?;
    let mut classes: Vec<Outcome> = labels.to_vec();
    classes.sort_unstable();
    classes.dedup();
    let targets = labels
        .iter()
        .map(|l| classes.iter().position(|c| c == l))
        .collect::<Option<Vec<usize>>>()
        .ok_or_else(|| anyhow!("label outside the fitted class list"))?;

    let encoded = preprocessor.transform(rows);
    let width = preprocessor.width();
    let classifier = match kind {
        CandidateKind::Logistic => {
            let params = LogisticParams {
                max_iter: config.logistic_max_iter,
                c: config.logistic_c,
                seed: config.seed,
                ..LogisticParams::default()
            };
            Classifier::Logistic(LogisticModel::fit(
                &encoded,
                &targets,
                classes.len(),
                width,
                params,
            )?)
        }
        CandidateKind::Forest => {
            let params = ForestParams {
                n_trees: config.forest_trees,
                seed: config.seed,
                ..ForestParams::default()
            };
            Classifier::Forest(RandomForest::fit(
                &encoded,
                &targets,
                classes.len(),
                width,
                params,
            )?)
        }
    };

    Ok(ModelArtifact {
        name: kind.display_name().to_string(),
        preprocessor,
        classes,
        classifier,
        holdout_accuracy: 0.0,
        trained_at: Utc::now().to_rfc3339(),
    })
}

/// Fits both candidates on a stratified training partition and keeps the
/// one with the better hold-out accuracy.
pub fn train_models(
    table: Option<&[AnalyzedMatch]>,
    config: &PipelineConfig,
) -> Option<TrainedSelection> {
    let Some(table) = table else {
        warn!("input table is absent; nothing to train on");
        return None;
    };
    if table.is_empty() {
        warn!("input table is empty; nothing to train on");
        return None;
    }

    let labels: Vec<Outcome> = table.iter().map(|m| m.result).collect();
    let (train_idx, test_idx) = stratified_split(&labels, config.test_fraction, config.seed);
    if train_idx.is_empty() {
        error!("training partition is empty");
        return None;
    }
    if test_idx.is_empty() {
        warn!("test partition is empty; hold-out accuracy will read as zero");
    }

    let train_rows: Vec<FeatureRow> = train_idx.iter().map(|&i| table[i].features()).collect();
    let train_labels: Vec<Outcome> = train_idx.iter().map(|&i| labels[i]).collect();
    let test_rows: Vec<FeatureRow> = test_idx.iter().map(|&i| table[i].features()).collect();
    let test_labels: Vec<Outcome> = test_idx.iter().map(|&i| labels[i]).collect();
    info!(
        "split: {} training rows, {} test rows",
        train_rows.len(),
        test_rows.len()
    );

    let mut fitted: Vec<ModelArtifact> = Vec::new();
    for kind in [CandidateKind::Logistic, CandidateKind::Forest] {
        info!("training {}", kind.display_name());
        match fit_candidate(kind, &train_rows, &train_labels, config) {
            Ok(mut artifact) => {
                let predicted = artifact.predict_many(&test_rows);
                artifact.holdout_accuracy = accuracy(&test_labels, &predicted);
                info!(
                    "{} hold-out accuracy: {:.4}",
                    artifact.name, artifact.holdout_accuracy
                );
                fitted.push(artifact);
            }
            Err(err) => error!("{} failed to train: {err:#}", kind.display_name()),
        }
    }

    let scores: Vec<f64> = fitted.iter().map(|a| a.holdout_accuracy).collect();
    let best = select_best(&scores)?;
    let candidates = fitted
        .iter()
        .map(|a| CandidateScore {
            name: a.name.clone(),
            accuracy: a.holdout_accuracy,
        })
        .collect();
    let artifact = fitted.swap_remove(best);
    info!(
        "selected {} (accuracy {:.4})",
        artifact.name, artifact.holdout_accuracy
    );

    let report = TrainingReport {
        train_rows: train_rows.len(),
        test_rows: test_rows.len(),
        class_balance: Outcome::ALL
            .iter()
            .map(|&c| {
                (
                    c,
                    train_labels.iter().filter(|&&l| l == c).count(),
                    test_labels.iter().filter(|&&l| l == c).count(),
                )
            })
            .collect(),
        candidates,
        selected: artifact.name.clone(),
    };

    Some(TrainedSelection {
        artifact,
        test_rows,
        test_labels,
        report,
    })
}

pub fn save_model(artifact: &ModelArtifact, dir: &Path) -> Result<PathBuf> {
    let path = artifact.save(dir)?;
    info!("saved {} to {}", artifact.name, path.display());
    Ok(path)
}
