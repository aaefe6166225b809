use std::path::{Path, PathBuf};

use anyhow::Result;
use env_logger::Env;
use log::{info, warn};

use dmaic_football::charts;
use dmaic_football::config::PipelineConfig;
use dmaic_football::export::export_summary_with_progress;
use dmaic_football::pipeline::{PipelineEvent, run_dmaic_project};
use dmaic_football::report::SimulatedBatch;

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = PipelineConfig::default();
    let charts_dir = config.charts_dir.clone();

    let summary = match run_dmaic_project(&config, |event| render(&event, &charts_dir)) {
        Ok(summary) => summary,
        Err(halt) => {
            println!();
            println!("Run stopped: {halt}");
            println!("Check the log above, fix the input and run again.");
            return Ok(());
        }
    };

    match export_summary_with_progress(&summary, &config.report_path, |p| {
        info!("export {}/{}: {}", p.current, p.total, p.message);
    }) {
        Ok(report) => println!(
            "Report workbook: {} ({} sheets, {} rows)",
            config.report_path.display(),
            report.sheets,
            report.rows
        ),
        Err(err) => warn!("report export failed: {err:#}"),
    }
    Ok(())
}

fn render(event: &PipelineEvent<'_>, charts_dir: &Path) {
    match event {
        PipelineEvent::Started => {
            println!("DMAIC study: international football match outcomes");
        }
        PipelineEvent::Phase(phase) => {
            println!();
            println!("{}", "=".repeat(60));
            println!("{} - {}", phase.title(), phase.subtitle());
            println!("{}", "=".repeat(60));
        }
        PipelineEvent::Goal(goal) => println!("Goal: {goal}"),
        PipelineEvent::RawLoaded { rows } => println!("Raw rows loaded: {rows}"),
        PipelineEvent::Cleaned(summary) => println!("{summary}"),
        PipelineEvent::TableSaved { rows, path } => {
            println!("Saved {rows} rows to {}", path.display());
        }
        PipelineEvent::Analysis(report) => {
            println!("{report}");
            chart(charts::outcome_distribution(report, charts_dir));
            chart(charts::score_histograms(report, charts_dir));
            chart(charts::goals_by_outcome(report, charts_dir));
            chart(charts::correlation_heatmap(&report.correlation, charts_dir));
        }
        PipelineEvent::Training(report) => println!("{report}"),
        PipelineEvent::ModelSaved { name, path } => {
            println!("Saved {name} to {}", path.display());
        }
        PipelineEvent::Evaluation(report) => {
            println!("{report}");
            chart(charts::confusion_heatmap(
                &report.confusion,
                charts_dir,
                "confusion_matrix.png",
            ));
        }
        PipelineEvent::Interpretation {
            model,
            interpretation,
        } => {
            println!("Interpretation of {model}:");
            println!("{interpretation}");
            if let Some(drawn) = charts::interpretation_bars(interpretation, charts_dir) {
                chart(drawn);
            }
        }
        PipelineEvent::ModelLoaded { name } => println!("Monitoring model: {name}"),
        PipelineEvent::Simulated(batch) => println!("{}", SimulatedBatch(batch)),
        PipelineEvent::Monitoring(report) => {
            println!("{report}");
            chart(charts::confusion_heatmap(
                &report.evaluation.confusion,
                charts_dir,
                "monitoring_confusion_matrix.png",
            ));
            chart(charts::real_vs_predicted(report, charts_dir));
        }
        PipelineEvent::Finished => {
            println!();
            println!("DMAIC cycle complete.");
        }
    }
}

fn chart(result: Result<PathBuf>) {
    match result {
        Ok(path) => info!("chart written to {}", path.display()),
        Err(err) => warn!("chart failed: {err:#}"),
    }
}
