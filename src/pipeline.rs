use std::path::{Path, PathBuf};

use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::analysis::{AnalysisReport, analyze_correlation};
use crate::config::PipelineConfig;
use crate::dataset::{load_raw_data, save_table};
use crate::error::PipelineHalt;
use crate::evaluation::{EvaluationReport, evaluate_model, interpret_model};
use crate::features::engineer_features;
use crate::model::Interpretation;
use crate::monitoring::{
    MonitoringReport, SimulatedMatch, load_model, monitor_and_insight, simulate_new_data,
};
use crate::preprocess::{CleaningSummary, cleaning_summary, preprocess_data};
use crate::training::{TrainingReport, save_model, train_models};

pub const STUDY_GOAL: &str = "Raise match-outcome prediction accuracy by 15% and identify the three strongest statistical factors.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Define,
    Measure,
    Analyze,
    Improve,
    Control,
}

impl Phase {
    pub fn title(self) -> &'static str {
        match self {
            Phase::Define => "DEFINE",
            Phase::Measure => "MEASURE",
            Phase::Analyze => "ANALYZE",
            Phase::Improve => "IMPROVE",
            Phase::Control => "CONTROL",
        }
    }

    pub fn subtitle(self) -> &'static str {
        match self {
            Phase::Define => "define the problem and the study goal",
            Phase::Measure => "measure current performance and collect data",
            Phase::Analyze => "analyze root causes and form hypotheses",
            Phase::Improve => "improve: train and select a model",
            Phase::Control => "control: monitor and sustain the improvement",
        }
    }
}

/// Progress and results of a run, in the order they are produced.
#[derive(Debug)]
pub enum PipelineEvent<'a> {
    Started,
    Phase(Phase),
    Goal(&'static str),
    RawLoaded { rows: usize },
    Cleaned(&'a CleaningSummary),
    TableSaved { rows: usize, path: &'a Path },
    Analysis(&'a AnalysisReport),
    Training(&'a TrainingReport),
    ModelSaved { name: &'a str, path: &'a Path },
    Evaluation(&'a EvaluationReport),
    Interpretation { model: &'a str, interpretation: &'a Interpretation },
    ModelLoaded { name: &'a str },
    Simulated(&'a [SimulatedMatch]),
    Monitoring(&'a MonitoringReport),
    Finished,
}

#[derive(Debug, Clone)]
pub struct PipelineSummary {
    pub raw_rows: usize,
    pub cleaning: CleaningSummary,
    /// Observational only; no later stage reads it.
    pub analysis: Option<AnalysisReport>,
    pub training: TrainingReport,
    pub model_path: PathBuf,
    pub evaluation: EvaluationReport,
    pub interpretation: Interpretation,
    pub monitoring: MonitoringReport,
}

/// Runs every stage in order. The first stage with no result stops the run,
/// except exploratory analysis, which only reports.
pub fn run_dmaic_project(
    config: &PipelineConfig,
    mut on_event: impl FnMut(PipelineEvent<'_>),
) -> Result<PipelineSummary, PipelineHalt> {
    on_event(PipelineEvent::Started);

    on_event(PipelineEvent::Phase(Phase::Define));
    on_event(PipelineEvent::Goal(STUDY_GOAL));

    on_event(PipelineEvent::Phase(Phase::Measure));
    let raw = load_raw_data(config, config.source).ok_or(PipelineHalt::Ingestion)?;
    on_event(PipelineEvent::RawLoaded { rows: raw.len() });

    let cleaned = preprocess_data(Some(raw.as_slice())).ok_or(PipelineHalt::Preprocessing)?;
    let cleaning = cleaning_summary(&raw, &cleaned);
    on_event(PipelineEvent::Cleaned(&cleaning));
    save_table(&cleaned, &config.cleaned_data_path)
        .map_err(|err| PipelineHalt::persist(&config.cleaned_data_path, &err))?;
    on_event(PipelineEvent::TableSaved {
        rows: cleaned.len(),
        path: &config.cleaned_data_path,
    });

    on_event(PipelineEvent::Phase(Phase::Analyze));
    let analyzed =
        engineer_features(Some(cleaned.as_slice())).ok_or(PipelineHalt::FeatureEngineering)?;
    let analysis = analyze_correlation(&analyzed);
    match &analysis {
        Some(report) => on_event(PipelineEvent::Analysis(report)),
        None => warn!("exploratory analysis produced no report; continuing"),
    }
    save_table(&analyzed, &config.analyzed_data_path)
        .map_err(|err| PipelineHalt::persist(&config.analyzed_data_path, &err))?;
    on_event(PipelineEvent::TableSaved {
        rows: analyzed.len(),
        path: &config.analyzed_data_path,
    });

    on_event(PipelineEvent::Phase(Phase::Improve));
    let selection =
        train_models(Some(analyzed.as_slice()), config).ok_or(PipelineHalt::Training)?;
    on_event(PipelineEvent::Training(&selection.report));
    let model_path = save_model(&selection.artifact, &config.models_dir)
        .map_err(|err| PipelineHalt::persist(&config.models_dir, &err))?;
    on_event(PipelineEvent::ModelSaved {
        name: selection.name(),
        path: &model_path,
    });
    let evaluation = evaluate_model(
        &selection.artifact,
        &selection.test_rows,
        &selection.test_labels,
    );
    on_event(PipelineEvent::Evaluation(&evaluation));
    let interpretation = interpret_model(&selection.artifact);
    on_event(PipelineEvent::Interpretation {
        model: selection.name(),
        interpretation: &interpretation,
    });

    on_event(PipelineEvent::Phase(Phase::Control));
    let loaded = load_model(&config.models_dir).ok_or(PipelineHalt::MonitoringLoad)?;
    on_event(PipelineEvent::ModelLoaded { name: &loaded.name });
    let mut rng = StdRng::seed_from_u64(config.seed);
    let batch = simulate_new_data(&analyzed, config.simulated_games, config.label_policy, &mut rng);
    on_event(PipelineEvent::Simulated(&batch));
    let monitoring = monitor_and_insight(&loaded, &batch, loaded.holdout_accuracy)
        .ok_or(PipelineHalt::Monitoring)?;
    on_event(PipelineEvent::Monitoring(&monitoring));

    on_event(PipelineEvent::Finished);
    info!("pipeline finished");

    Ok(PipelineSummary {
        raw_rows: raw.len(),
        cleaning,
        analysis,
        training: selection.report,
        model_path,
        evaluation,
        interpretation,
        monitoring,
    })
}
