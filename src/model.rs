use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::model_file_name;
use crate::features::FeatureRow;
use crate::forest::RandomForest;
use crate::logistic::LogisticModel;
use crate::outcome::Outcome;
use crate::preprocessor::FittedPreprocessor;

const TOP_COEFFICIENTS: usize = 10;
const TOP_IMPORTANCES: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Linear,
    Ensemble,
    Other,
}

/// What a classifier can say about the features it relies on.
#[derive(Debug, Clone, PartialEq)]
pub enum Interpretation {
    Coefficients {
        class: Outcome,
        positive: Vec<(String, f64)>,
        negative: Vec<(String, f64)>,
    },
    Importances {
        top: Vec<(String, f64)>,
    },
    Unsupported,
}

pub trait Explain {
    fn family(&self) -> ModelFamily {
        ModelFamily::Other
    }

    fn explain(&self, _feature_names: &[String], _classes: &[Outcome]) -> Interpretation {
        Interpretation::Unsupported
    }
}

impl Explain for LogisticModel {
    fn family(&self) -> ModelFamily {
        ModelFamily::Linear
    }

    /// Ranks the coefficients of the home-win row.
    fn explain(&self, feature_names: &[String], classes: &[Outcome]) -> Interpretation {
        let class = if classes.contains(&Outcome::HomeWin) {
            Outcome::HomeWin
        } else {
            match classes.last() {
                Some(&c) => c,
                None => return Interpretation::Unsupported,
            }
        };
        let Some(row) = classes
            .iter()
            .position(|&c| c == class)
            .and_then(|k| self.coefficients.get(k))
        else {
            return Interpretation::Unsupported;
        };

        let mut ranked: Vec<(String, f64)> = feature_names
            .iter()
            .cloned()
            .zip(row.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        let positive = ranked.iter().take(TOP_COEFFICIENTS).cloned().collect();
        let negative = ranked.iter().rev().take(TOP_COEFFICIENTS).cloned().collect();
        Interpretation::Coefficients {
            class,
            positive,
            negative,
        }
    }
}

impl Explain for RandomForest {
    fn family(&self) -> ModelFamily {
        ModelFamily::Ensemble
    }

    fn explain(&self, feature_names: &[String], _classes: &[Outcome]) -> Interpretation {
        let mut ranked: Vec<(String, f64)> = feature_names
            .iter()
            .cloned()
            .zip(self.importances.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(TOP_IMPORTANCES);
        Interpretation::Importances { top: ranked }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classifier {
    Logistic(LogisticModel),
    Forest(RandomForest),
}

impl Classifier {
    fn as_explain(&self) -> &dyn Explain {
        match self {
            Classifier::Logistic(m) => m,
            Classifier::Forest(m) => m,
        }
    }
}

/// A fitted preprocessor and classifier, persisted together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub name: String,
    pub preprocessor: FittedPreprocessor,
    /// Index `k` of a probability vector is the probability of `classes[k]`.
    pub classes: Vec<Outcome>,
    pub classifier: Classifier,
    pub holdout_accuracy: f64,
    pub trained_at: String,
}

impl ModelArtifact {
    pub fn predict_proba(&self, row: &FeatureRow) -> Vec<f64> {
        let encoded = self.preprocessor.transform_row(row);
        match &self.classifier {
            Classifier::Logistic(m) => m.predict_proba(&encoded),
            Classifier::Forest(m) => m.predict_proba(&encoded),
        }
    }

    /// Most probable class; ties go to the earlier class.
    pub fn predict(&self, row: &FeatureRow) -> Outcome {
        let proba = self.predict_proba(row);
        let mut best = 0;
        for (k, p) in proba.iter().enumerate() {
            if *p > proba[best] {
                best = k;
            }
        }
        self.classes.get(best).copied().unwrap_or(Outcome::Draw)
    }

    pub fn predict_many(&self, rows: &[FeatureRow]) -> Vec<Outcome> {
        rows.iter().map(|r| self.predict(r)).collect()
    }

    pub fn family(&self) -> ModelFamily {
        self.classifier.as_explain().family()
    }

    pub fn interpret(&self) -> Interpretation {
        self.classifier
            .as_explain()
            .explain(&self.preprocessor.feature_names_out(), &self.classes)
    }

    pub fn file_name(&self) -> String {
        model_file_name(&self.name)
    }

    /// Writes the artifact as JSON under `dir`, replacing any previous file
    /// for the same model name.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        let path = dir.join(self.file_name());
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec(self).context("serialize model artifact")?;
        fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("swap {}", path.display()))?;
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path).with_context(|| format!("read {}", path.display()))?;
        serde_json::from_slice(&raw).with_context(|| format!("decode {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Opaque;
    impl Explain for Opaque {}

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{i}")).collect()
    }

    #[test]
    fn default_explain_is_unsupported() {
        assert_eq!(Opaque.family(), ModelFamily::Other);
        assert_eq!(Opaque.explain(&names(2), &Outcome::ALL), Interpretation::Unsupported);
    }

    #[test]
    fn logistic_ranks_home_win_row() {
        let model = LogisticModel {
            coefficients: vec![
                vec![9.0; 12],
                vec![9.0; 12],
                (0..12).map(|i| i as f64 - 6.0).collect(),
            ],
            intercepts: vec![0.0; 3],
            iterations: 1,
            converged: true,
        };
        let Interpretation::Coefficients {
            class,
            positive,
            negative,
        } = model.explain(&names(12), &Outcome::ALL)
        else {
            panic!("expected coefficients");
        };
        assert_eq!(class, Outcome::HomeWin);
        assert_eq!(positive.len(), 10);
        assert_eq!(positive[0], ("f11".to_string(), 5.0));
        assert_eq!(negative[0], ("f0".to_string(), -6.0));
        assert_eq!(negative.len(), 10);
    }

    #[test]
    fn forest_keeps_top_fifteen() {
        let forest = RandomForest {
            trees: Vec::new(),
            n_classes: 3,
            importances: (0..20).map(|i| i as f64 / 190.0).collect(),
        };
        let Interpretation::Importances { top } = forest.explain(&names(20), &Outcome::ALL) else {
            panic!("expected importances");
        };
        assert_eq!(top.len(), 15);
        assert_eq!(top[0].0, "f19");
        assert!(top.windows(2).all(|w| w[0].1 >= w[1].1));
    }
}
