use std::path::PathBuf;

pub const RAW_DATA_PATH: &str = "data/raw/results.csv";
pub const CLEANED_DATA_PATH: &str = "data/processed/cleaned_data.csv";
pub const ANALYZED_DATA_PATH: &str = "data/processed/analyzed_data.csv";
pub const MODELS_DIR: &str = "models";
pub const CHARTS_DIR: &str = "reports/charts";
pub const REPORT_PATH: &str = "reports/dmaic_report.xlsx";

pub const RAW_DATA_URL: &str = "https://raw.githubusercontent.com/moises-rb/projeto_futebol_preditivo/main/02_measure/data/raw/results.csv";

pub const LOGISTIC_REGRESSION_NAME: &str = "Logistic Regression";
pub const RANDOM_FOREST_NAME: &str = "Random Forest";

pub const FEATURES: [&str; 12] = [
    "home_team",
    "away_team",
    "tournament",
    "city",
    "country",
    "neutral",
    "year",
    "month",
    "day_of_week",
    "is_home_game",
    "goal_difference",
    "total_goals",
];
pub const TARGET: &str = "result";

pub const NUMERICAL_COLS: [&str; 5] = [
    "year",
    "month",
    "day_of_week",
    "goal_difference",
    "total_goals",
];
pub const CATEGORICAL_COLS: [&str; 7] = [
    "home_team",
    "away_team",
    "tournament",
    "city",
    "country",
    "neutral",
    "is_home_game",
];

pub const NUM_SIMULATED_GAMES: usize = 5;

pub const TEST_FRACTION: f64 = 0.2;
pub const RANDOM_SEED: u64 = 42;
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

pub const LOGISTIC_MAX_ITER: usize = 1000;
pub const LOGISTIC_C: f64 = 1.0;
pub const FOREST_TREES: usize = 100;

/// Which source the ingestion stage should try first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Local,
    Remote,
}

/// How the monitoring stage labels its synthetic matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelPolicy {
    /// Uniform draw over the three outcomes, unrelated to the synthetic scores.
    IndependentDraw,
    /// Sign of the synthetic goal difference, matching the preprocessing rule.
    FromGoalDifference,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub raw_data_path: PathBuf,
    pub cleaned_data_path: PathBuf,
    pub analyzed_data_path: PathBuf,
    pub models_dir: PathBuf,
    pub charts_dir: PathBuf,
    pub report_path: PathBuf,
    pub raw_data_url: String,
    pub source: DataSource,
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    pub test_fraction: f64,
    pub seed: u64,
    pub logistic_max_iter: usize,
    pub logistic_c: f64,
    pub forest_trees: usize,
    pub simulated_games: usize,
    pub label_policy: LabelPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_data_path: PathBuf::from(RAW_DATA_PATH),
            cleaned_data_path: PathBuf::from(CLEANED_DATA_PATH),
            analyzed_data_path: PathBuf::from(ANALYZED_DATA_PATH),
            models_dir: PathBuf::from(MODELS_DIR),
            charts_dir: PathBuf::from(CHARTS_DIR),
            report_path: PathBuf::from(REPORT_PATH),
            raw_data_url: RAW_DATA_URL.to_string(),
            source: DataSource::Local,
            numeric_columns: NUMERICAL_COLS.iter().map(|c| c.to_string()).collect(),
            categorical_columns: CATEGORICAL_COLS.iter().map(|c| c.to_string()).collect(),
            test_fraction: TEST_FRACTION,
            seed: RANDOM_SEED,
            logistic_max_iter: LOGISTIC_MAX_ITER,
            logistic_c: LOGISTIC_C,
            forest_trees: FOREST_TREES,
            simulated_games: NUM_SIMULATED_GAMES,
            label_policy: LabelPolicy::IndependentDraw,
        }
    }
}

impl PipelineConfig {
    /// Same layout as the default, rooted at `base` instead of the working directory.
    pub fn rooted_at(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            raw_data_path: base.join(RAW_DATA_PATH),
            cleaned_data_path: base.join(CLEANED_DATA_PATH),
            analyzed_data_path: base.join(ANALYZED_DATA_PATH),
            models_dir: base.join(MODELS_DIR),
            charts_dir: base.join(CHARTS_DIR),
            report_path: base.join(REPORT_PATH),
            ..Self::default()
        }
    }
}

/// File name of the persisted artifact for a model display name.
pub fn model_file_name(display_name: &str) -> String {
    format!("{}_model.json", display_name.replace(' ', "_").to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_file_name_is_slugged() {
        assert_eq!(
            model_file_name(LOGISTIC_REGRESSION_NAME),
            "logistic_regression_model.json"
        );
        assert_eq!(model_file_name(RANDOM_FOREST_NAME), "random_forest_model.json");
    }

    #[test]
    fn feature_partition_covers_declared_features() {
        let mut partition: Vec<&str> = NUMERICAL_COLS
            .iter()
            .chain(CATEGORICAL_COLS.iter())
            .copied()
            .collect();
        partition.sort_unstable();
        let mut declared = FEATURES.to_vec();
        declared.sort_unstable();
        assert_eq!(partition, declared);
    }
}
