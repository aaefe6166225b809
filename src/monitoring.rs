use std::path::Path;

use log::{error, info, warn};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::config::{LOGISTIC_REGRESSION_NAME, LabelPolicy, RANDOM_FOREST_NAME, model_file_name};
use crate::evaluation::{EvaluationReport, evaluate_model};
use crate::features::{AnalyzedMatch, FeatureRow};
use crate::model::{Interpretation, ModelArtifact, ModelFamily};
use crate::outcome::{Outcome, classify_outcome, outcome_counts};

const TEAM_POOL: usize = 5;
const CONTEXT_POOL: usize = 3;
const SIMULATED_YEAR: i32 = 2024;

const FALLBACK_TEAMS: [&str; 5] = ["Brazil", "Argentina", "Germany", "France", "Italy"];
const FALLBACK_TOURNAMENTS: [&str; 3] = ["Friendly", "FIFA World Cup", "Copa America"];
const FALLBACK_CITIES: [&str; 3] = ["Rio de Janeiro", "Buenos Aires", "Berlin"];
const FALLBACK_COUNTRIES: [&str; 3] = ["Brazil", "Argentina", "Germany"];

const LINEAR_RECOMMENDATIONS: [&str; 5] = [
    "Goal difference is one of the strongest factors: the wider the margin in a side's favour, the likelier the win. Scoring more and conceding less matters most.",
    "Total goals carries weight too: high-scoring matches point to an attacking style that tends to favour the winner.",
    "Home advantage is significant: crowd support and familiarity with the ground shift results.",
    "Specific teams move the outcome a lot, through large positive home-side or negative away-side coefficients. Weigh the quality of the opponent.",
    "Tournament type changes the dynamics: World Cup matches do not play like friendlies.",
];

const ENSEMBLE_RECOMMENDATIONS: [&str; 5] = [
    "Focus on the top three to five features in the importance ranking; those are what the forest leans on.",
    "Goal difference and total goals usually rank highest, which argues for balancing attack and defence.",
    "Playing at home is consistently relevant.",
    "Opponent strength is a primary factor: check the opponent's history and recent form.",
    "Match context such as tournament and year carries nuance the model picks up; important matches tend to be closer.",
];

const GENERAL_RECOMMENDATIONS: [&str; 1] = [
    "No model-specific insight is available. Focus on attacking output, defensive record and home advantage.",
];

/// A synthetic match for the monitoring cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedMatch {
    pub features: FeatureRow,
    pub result: Outcome,
}

#[derive(Debug, Clone)]
pub struct MonitoringReport {
    pub model: String,
    pub family: ModelFamily,
    pub evaluation: EvaluationReport,
    /// Real and predicted counts, indexed by [`Outcome::index`].
    pub real_counts: [usize; 3],
    pub predicted_counts: [usize; 3],
    pub holdout_accuracy: f64,
    /// Batch accuracy minus hold-out accuracy.
    pub accuracy_drift: f64,
    pub interpretation: Interpretation,
    pub recommendations: &'static [&'static str],
}

/// Loads the persisted artifact, preferring the logistic slot over the
/// forest slot.
pub fn load_model(models_dir: &Path) -> Option<ModelArtifact> {
    for name in [LOGISTIC_REGRESSION_NAME, RANDOM_FOREST_NAME] {
        let path = models_dir.join(model_file_name(name));
        if !path.exists() {
            continue;
        }
        return match ModelArtifact::load(&path) {
            Ok(artifact) => {
                info!("loaded {} from {}", artifact.name, path.display());
                Some(artifact)
            }
            Err(err) => {
                error!("could not load model: {err:#}");
                None
            }
        };
    }
    error!("no model found in {}", models_dir.display());
    error!("run the training stage first to persist a model");
    None
}

/// First `cap` distinct values in order of appearance.
fn first_distinct<'a>(values: impl Iterator<Item = &'a str>, cap: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(cap);
    for v in values {
        if out.len() == cap {
            break;
        }
        if !out.iter().any(|o| o == v) {
            out.push(v.to_string());
        }
    }
    out
}

fn owned(pool: &[&str]) -> Vec<String> {
    pool.iter().map(|s| s.to_string()).collect()
}

fn pick<R: Rng>(pool: &[String], rng: &mut R) -> String {
    pool.choose(rng).cloned().unwrap_or_default()
}

/// Builds `count` synthetic matches whose categorical values are drawn from
/// the reference table so the fitted encoders recognise them.
pub fn simulate_new_data<R: Rng>(
    reference: &[AnalyzedMatch],
    count: usize,
    policy: LabelPolicy,
    rng: &mut R,
) -> Vec<SimulatedMatch> {
    let (teams, tournaments, cities, countries) = if reference.is_empty() {
        warn!("reference table is empty; using fallback pools");
        (
            owned(&FALLBACK_TEAMS),
            owned(&FALLBACK_TOURNAMENTS),
            owned(&FALLBACK_CITIES),
            owned(&FALLBACK_COUNTRIES),
        )
    } else {
        (
            first_distinct(reference.iter().map(|m| m.home_team.as_str()), TEAM_POOL),
            first_distinct(reference.iter().map(|m| m.tournament.as_str()), CONTEXT_POOL),
            first_distinct(reference.iter().map(|m| m.city.as_str()), CONTEXT_POOL),
            first_distinct(reference.iter().map(|m| m.country.as_str()), CONTEXT_POOL),
        )
    };

    let batch: Vec<SimulatedMatch> = (0..count)
        .map(|_| {
            let goal_difference = rng.gen_range(-3..=3);
            let features = FeatureRow {
                home_team: pick(&teams, rng),
                away_team: pick(&teams, rng),
                tournament: pick(&tournaments, rng),
                city: pick(&cities, rng),
                country: pick(&countries, rng),
                neutral: rng.gen_bool(0.5),
                year: SIMULATED_YEAR,
                month: rng.gen_range(1..=12),
                day_of_week: rng.gen_range(0..=6),
                is_home_game: rng.gen_range(0..=1),
                goal_difference,
                total_goals: rng.gen_range(0..=5),
            };
            let result = match policy {
                LabelPolicy::IndependentDraw => {
                    Outcome::ALL.choose(rng).copied().unwrap_or(Outcome::Draw)
                }
                LabelPolicy::FromGoalDifference => classify_outcome(goal_difference, 0),
            };
            SimulatedMatch { features, result }
        })
        .collect();
    info!("simulated {} new matches", batch.len());
    batch
}

pub fn recommendations(family: ModelFamily) -> &'static [&'static str] {
    match family {
        ModelFamily::Linear => &LINEAR_RECOMMENDATIONS,
        ModelFamily::Ensemble => &ENSEMBLE_RECOMMENDATIONS,
        ModelFamily::Other => &GENERAL_RECOMMENDATIONS,
    }
}

/// Scores the batch and compares it with the accuracy recorded at training.
pub fn monitor_and_insight(
    artifact: &ModelArtifact,
    batch: &[SimulatedMatch],
    holdout_accuracy: f64,
) -> Option<MonitoringReport> {
    if batch.is_empty() {
        warn!("simulated batch is empty; nothing to monitor");
        return None;
    }

    let rows: Vec<FeatureRow> = batch.iter().map(|m| m.features.clone()).collect();
    let labels: Vec<Outcome> = batch.iter().map(|m| m.result).collect();
    let evaluation = evaluate_model(artifact, &rows, &labels);
    let predicted = artifact.predict_many(&rows);
    let accuracy_drift = evaluation.accuracy - holdout_accuracy;
    if accuracy_drift < 0.0 {
        warn!(
            "accuracy on new matches is {:.1} points below hold-out",
            -accuracy_drift * 100.0
        );
    }
    let family = artifact.family();

    Some(MonitoringReport {
        model: artifact.name.clone(),
        family,
        real_counts: outcome_counts(labels.iter().copied()),
        predicted_counts: outcome_counts(predicted),
        holdout_accuracy,
        accuracy_drift,
        interpretation: artifact.interpret(),
        recommendations: recommendations(family),
        evaluation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn fallback_pools_on_empty_reference() {
        let mut rng = StdRng::seed_from_u64(42);
        let batch = simulate_new_data(&[], 20, LabelPolicy::IndependentDraw, &mut rng);
        assert_eq!(batch.len(), 20);
        for m in &batch {
            let f = &m.features;
            assert!(FALLBACK_TEAMS.contains(&f.home_team.as_str()));
            assert!(FALLBACK_TEAMS.contains(&f.away_team.as_str()));
            assert!(FALLBACK_TOURNAMENTS.contains(&f.tournament.as_str()));
            assert!(FALLBACK_CITIES.contains(&f.city.as_str()));
            assert!(FALLBACK_COUNTRIES.contains(&f.country.as_str()));
            assert_eq!(f.year, 2024);
            assert!((1..=12).contains(&f.month));
            assert!(f.day_of_week <= 6);
            assert!(f.is_home_game <= 1);
            assert!((-3..=3).contains(&f.goal_difference));
            assert!((0..=5).contains(&f.total_goals));
        }
    }

    #[test]
    fn goal_difference_policy_labels_consistently() {
        let mut rng = StdRng::seed_from_u64(3);
        let batch = simulate_new_data(&[], 50, LabelPolicy::FromGoalDifference, &mut rng);
        for m in &batch {
            assert_eq!(m.result, classify_outcome(m.features.goal_difference, 0));
        }
    }

    #[test]
    fn pools_keep_first_seen_order() {
        let values = ["b", "a", "b", "c", "d", "a", "e", "f"];
        assert_eq!(first_distinct(values.iter().copied(), 5), vec!["b", "a", "c", "d", "e"]);
        assert_eq!(first_distinct(values.iter().copied(), 3), vec!["b", "a", "c"]);
    }

    #[test]
    fn missing_model_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_model(dir.path()).is_none());
    }

    #[test]
    fn corrupt_model_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("random_forest_model.json"), b"{not json").unwrap();
        assert!(load_model(dir.path()).is_none());
    }

    #[test]
    fn recommendations_follow_family() {
        assert_eq!(recommendations(ModelFamily::Linear).len(), 5);
        assert_eq!(recommendations(ModelFamily::Ensemble).len(), 5);
        assert_eq!(recommendations(ModelFamily::Other), &GENERAL_RECOMMENDATIONS);
    }
}
