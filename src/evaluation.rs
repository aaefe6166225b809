use log::info;

use crate::features::FeatureRow;
use crate::metrics::{
    ClassificationReport, ConfusionMatrix, ProbabilityMetrics, accuracy, classification_report,
    confusion_matrix, probability_metrics,
};
use crate::model::{Interpretation, ModelArtifact};
use crate::outcome::Outcome;

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub model: String,
    pub samples: usize,
    pub accuracy: f64,
    pub classification: ClassificationReport,
    pub confusion: ConfusionMatrix,
    pub probability: ProbabilityMetrics,
}

pub fn evaluate_model(
    artifact: &ModelArtifact,
    rows: &[FeatureRow],
    labels: &[Outcome],
) -> EvaluationReport {
    let probas: Vec<Vec<f64>> = rows.iter().map(|r| artifact.predict_proba(r)).collect();
    let predicted = artifact.predict_many(rows);
    let report = EvaluationReport {
        model: artifact.name.clone(),
        samples: rows.len(),
        accuracy: accuracy(labels, &predicted),
        classification: classification_report(labels, &predicted),
        confusion: confusion_matrix(labels, &predicted, &artifact.classes),
        probability: probability_metrics(&probas, &artifact.classes, labels),
    };
    info!(
        "{}: accuracy {:.4} on {} rows",
        report.model, report.accuracy, report.samples
    );
    report
}

pub fn interpret_model(artifact: &ModelArtifact) -> Interpretation {
    artifact.interpret()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logistic::LogisticModel;
    use crate::model::Classifier;
    use crate::preprocessor::{FittedPreprocessor, NumericScaler};

    fn row(goal_difference: i32) -> FeatureRow {
        FeatureRow {
            home_team: "Japan".to_string(),
            away_team: "Korea Republic".to_string(),
            tournament: "AFC Asian Cup".to_string(),
            city: "Doha".to_string(),
            country: "Qatar".to_string(),
            neutral: true,
            year: 2023,
            month: 1,
            day_of_week: 4,
            is_home_game: 0,
            goal_difference,
            total_goals: goal_difference.abs(),
        }
    }

    /// Scores each class by the sign of the goal difference.
    fn sign_model() -> ModelArtifact {
        ModelArtifact {
            name: "Logistic Regression".to_string(),
            preprocessor: FittedPreprocessor {
                numeric: vec![NumericScaler {
                    column: "goal_difference".to_string(),
                    mean: 0.0,
                    scale: 1.0,
                }],
                categorical: Vec::new(),
            },
            classes: Outcome::ALL.to_vec(),
            classifier: Classifier::Logistic(LogisticModel {
                coefficients: vec![vec![-5.0], vec![0.0], vec![5.0]],
                intercepts: vec![0.0, 2.0, 0.0],
                iterations: 0,
                converged: true,
            }),
            holdout_accuracy: 1.0,
            trained_at: "2024-01-01T00:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn evaluation_combines_metrics() {
        let artifact = sign_model();
        let rows = vec![row(2), row(0), row(-1), row(3)];
        let labels = vec![Outcome::HomeWin, Outcome::Draw, Outcome::AwayWin, Outcome::Draw];
        let report = evaluate_model(&artifact, &rows, &labels);
        assert_eq!(report.samples, 4);
        assert_eq!(report.accuracy, 0.75);
        assert_eq!(report.confusion.counts[1], vec![0, 1, 1]);
        assert_eq!(report.classification.per_class.len(), 3);
        assert!(report.probability.log_loss > 0.0);
    }

    #[test]
    fn interpretation_names_expanded_features() {
        let Interpretation::Coefficients { positive, .. } = interpret_model(&sign_model()) else {
            panic!("expected coefficients");
        };
        assert_eq!(positive, vec![("goal_difference".to_string(), 5.0)]);
    }
}
