use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use dmaic_football::config::{CATEGORICAL_COLS, NUMERICAL_COLS};
use dmaic_football::dataset::read_matches;
use dmaic_football::features::{AnalyzedMatch, FeatureRow, engineer_features};
use dmaic_football::forest::{ForestParams, RandomForest};
use dmaic_football::logistic::{LogisticModel, LogisticParams};
use dmaic_football::preprocess::preprocess_data;
use dmaic_football::preprocessor::{EncodedRow, FittedPreprocessor};

fn analyzed_sample() -> Vec<AnalyzedMatch> {
    let raw = read_matches(RESULTS_CSV.as_bytes()).expect("valid fixture csv");
    let cleaned = preprocess_data(Some(raw.as_slice())).expect("cleaning succeeds");
    engineer_features(Some(cleaned.as_slice())).expect("features derive")
}

fn encoded_sample() -> (Vec<EncodedRow>, Vec<usize>, usize) {
    let analyzed = analyzed_sample();
    let rows: Vec<FeatureRow> = analyzed.iter().map(|m| m.features()).collect();
    let numeric: Vec<String> = NUMERICAL_COLS.iter().map(|c| c.to_string()).collect();
    let categorical: Vec<String> = CATEGORICAL_COLS.iter().map(|c| c.to_string()).collect();
    let pre = FittedPreprocessor::fit(&rows, &numeric, &categorical).expect("fit preprocessor");
    let labels = analyzed.iter().map(|m| m.result.index()).collect();
    (pre.transform(&rows), labels, pre.width())
}

fn bench_feature_engineering(c: &mut Criterion) {
    let raw = read_matches(RESULTS_CSV.as_bytes()).expect("valid fixture csv");
    let cleaned = preprocess_data(Some(raw.as_slice())).expect("cleaning succeeds");
    c.bench_function("feature_engineering", |b| {
        b.iter(|| {
            let analyzed = engineer_features(Some(black_box(cleaned.as_slice()))).unwrap();
            black_box(analyzed.len());
        })
    });
}

fn bench_forest_fit(c: &mut Criterion) {
    let (rows, labels, width) = encoded_sample();
    let params = ForestParams {
        n_trees: 20,
        ..ForestParams::default()
    };
    c.bench_function("forest_fit_20_trees", |b| {
        b.iter(|| {
            let forest = RandomForest::fit(black_box(&rows), &labels, 3, width, params).unwrap();
            black_box(forest.trees.len());
        })
    });
}

fn bench_logistic_fit(c: &mut Criterion) {
    let (rows, labels, width) = encoded_sample();
    let params = LogisticParams {
        max_iter: 200,
        ..LogisticParams::default()
    };
    c.bench_function("logistic_fit_200_iter", |b| {
        b.iter(|| {
            let model = LogisticModel::fit(black_box(&rows), &labels, 3, width, params).unwrap();
            black_box(model.iterations);
        })
    });
}

criterion_group!(
    perf,
    bench_feature_engineering,
    bench_forest_fit,
    bench_logistic_fit
);
criterion_main!(perf);

static RESULTS_CSV: &str = include_str!("../tests/fixtures/results_sample.csv");
