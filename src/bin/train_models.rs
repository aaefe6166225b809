use std::path::PathBuf;

use anyhow::{Context, Result};
use env_logger::Env;

use dmaic_football::config::PipelineConfig;
use dmaic_football::dataset::load_analyzed_table;
use dmaic_football::evaluation::{evaluate_model, interpret_model};
use dmaic_football::training::{save_model, train_models};

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let mut config = PipelineConfig::default();
    if let Some(path) = parse_path_arg("--analyzed") {
        config.analyzed_data_path = path;
    }
    if let Some(dir) = parse_path_arg("--models") {
        config.models_dir = dir;
    }
    if let Some(trees) = parse_usize_arg("--trees") {
        config.forest_trees = trees.max(1);
    }
    if let Some(iters) = parse_usize_arg("--max-iter") {
        config.logistic_max_iter = iters.max(1);
    }
    let dry_run = has_flag("--dry-run");

    let analyzed = load_analyzed_table(&config.analyzed_data_path)
        .context("run the full pipeline first to produce the analyzed table")?;
    let Some(selection) = train_models(Some(analyzed.as_slice()), &config) else {
        println!("No model could be trained; see the log for details.");
        return Ok(());
    };
    println!("{}", selection.report);

    if dry_run {
        println!("dry_run=true (model not saved)");
    } else {
        let path = save_model(&selection.artifact, &config.models_dir)?;
        println!("model_path={}", path.display());
    }

    let evaluation = evaluate_model(
        &selection.artifact,
        &selection.test_rows,
        &selection.test_labels,
    );
    println!("{evaluation}");
    println!("{}", interpret_model(&selection.artifact));
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

fn parse_usize_arg(name: &str) -> Option<usize> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}="))
            && let Ok(v) = raw.trim().parse::<usize>()
        {
            return Some(v);
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && let Ok(v) = next.trim().parse::<usize>()
        {
            return Some(v);
        }
    }
    None
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}
