use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use env_logger::Env;
use rand::SeedableRng;
use rand::rngs::StdRng;

use dmaic_football::config::{LabelPolicy, PipelineConfig};
use dmaic_football::dataset::load_analyzed_table;
use dmaic_football::monitoring::{load_model, monitor_and_insight, simulate_new_data};
use dmaic_football::report::SimulatedBatch;

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let mut config = PipelineConfig::default();
    if let Some(path) = parse_path_arg("--analyzed") {
        config.analyzed_data_path = path;
    }
    if let Some(dir) = parse_path_arg("--models") {
        config.models_dir = dir;
    }
    if let Some(games) = parse_u64_arg("--games") {
        config.simulated_games = games.max(1) as usize;
    }
    if let Some(seed) = parse_u64_arg("--seed") {
        config.seed = seed;
    }
    if has_flag("--labels-from-goals") {
        config.label_policy = LabelPolicy::FromGoalDifference;
    }

    let artifact = load_model(&config.models_dir).ok_or_else(|| {
        anyhow!(
            "no model found under {}; train one first",
            config.models_dir.display()
        )
    })?;
    let reference = load_analyzed_table(&config.analyzed_data_path)
        .context("the analyzed table seeds the simulated matches")?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let batch = simulate_new_data(
        &reference,
        config.simulated_games,
        config.label_policy,
        &mut rng,
    );
    println!("{}", SimulatedBatch(&batch));

    match monitor_and_insight(&artifact, &batch, artifact.holdout_accuracy) {
        Some(report) => println!("{report}"),
        None => println!("Monitoring produced no report."),
    }
    Ok(())
}

fn parse_path_arg(name: &str) -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix(&format!("{name}=")) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(PathBuf::from(next));
        }
    }
    None
}

fn parse_u64_arg(name: &str) -> Option<u64> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}="))
            && let Ok(v) = raw.trim().parse::<u64>()
        {
            return Some(v);
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && let Ok(v) = next.trim().parse::<u64>()
        {
            return Some(v);
        }
    }
    None
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}
