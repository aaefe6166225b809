//! PNG charts for the stage reports.
//!
//! Every public function writes one file under the chart directory and
//! returns its path. Rendering problems surface as errors for the caller to
//! log; nothing downstream depends on a chart existing.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use plotters::prelude::*;

use crate::analysis::{AnalysisReport, CorrelationMatrix};
use crate::metrics::ConfusionMatrix;
use crate::model::Interpretation;
use crate::monitoring::MonitoringReport;
use crate::outcome::Outcome;

type DrawResult = std::result::Result<(), Box<dyn Error>>;

const SIZE: (u32, u32) = (1000, 600);
const SKY: RGBColor = RGBColor(135, 206, 235);
const CORAL: RGBColor = RGBColor(240, 128, 128);
const TEAL: RGBColor = RGBColor(0, 128, 128);

struct Series<'a> {
    name: &'a str,
    values: Vec<f64>,
    color: RGBColor,
}

fn prepare(dir: &Path, file: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir.join(file))
}

fn finish(path: PathBuf, drawn: DrawResult) -> Result<PathBuf> {
    drawn.map_err(|e| anyhow!("render {}: {e}", path.display()))?;
    Ok(path)
}

fn outcome_labels() -> Vec<String> {
    Outcome::ALL.iter().map(|o| o.label().to_string()).collect()
}

/// Vertical bars, one group per label and one bar per series inside a group.
fn grouped_bars(
    path: &Path,
    title: &str,
    labels: &[String],
    series: &[Series<'_>],
    y_desc: &str,
) -> DrawResult {
    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let n = labels.len().max(1);
    let y_max = series
        .iter()
        .flat_map(|s| s.values.iter().copied())
        .fold(0.0_f64, f64::max)
        .max(1e-9)
        * 1.1;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5_f64..(n as f64 - 0.5), 0.0_f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|x| {
            let idx = x.round();
            if (x - idx).abs() < 1e-6 && idx >= 0.0 && (idx as usize) < labels.len() {
                labels[idx as usize].clone()
            } else {
                String::new()
            }
        })
        .y_desc(y_desc)
        .draw()?;

    let group = 0.8;
    let bar = group / series.len().max(1) as f64;
    for (s_idx, s) in series.iter().enumerate() {
        let color = s.color;
        chart
            .draw_series(s.values.iter().enumerate().map(|(i, &v)| {
                let x0 = i as f64 - group / 2.0 + s_idx as f64 * bar;
                Rectangle::new([(x0, 0.0), (x0 + bar * 0.95, v)], color.filled())
            }))?
            .label(s.name)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    if series.len() > 1 {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}

/// Square grid coloured by `color_of`, annotated with `text_of`.
fn heatmap(
    path: &Path,
    title: &str,
    labels: &[String],
    values: &[Vec<f64>],
    color_of: &dyn Fn(f64) -> RGBColor,
    text_of: &dyn Fn(f64) -> String,
) -> DrawResult {
    let root = BitMapBackend::new(path, (900, 800)).into_drawing_area();
    root.fill(&WHITE)?;

    let n = labels.len();
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(80)
        .y_label_area_size(140)
        .build_cartesian_2d(0..n, 0..n)?;

    // Row 0 is drawn at the top.
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(n)
        .y_labels(n)
        .x_label_formatter(&|i| labels.get(*i).cloned().unwrap_or_default())
        .y_label_formatter(&|i| {
            n.checked_sub(*i + 1)
                .and_then(|r| labels.get(r))
                .cloned()
                .unwrap_or_default()
        })
        .draw()?;

    chart.draw_series(values.iter().enumerate().flat_map(|(r, row)| {
        row.iter().enumerate().map(move |(c, &v)| {
            let y = n - 1 - r;
            Rectangle::new([(c, y), (c + 1, y + 1)], color_of(v).filled())
        })
    }))?;

    let font = ("sans-serif", 14).into_font();
    chart.draw_series(values.iter().enumerate().flat_map(|(r, row)| {
        let font = font.clone();
        row.iter().enumerate().map(move |(c, &v)| {
            EmptyElement::at((c, n - r)) + Text::new(text_of(v), (8, 8), font.clone())
        })
    }))?;

    root.present()?;
    Ok(())
}

/// Horizontal bars around zero, one row per named value.
fn horizontal_bars(
    path: &Path,
    title: &str,
    items: &[(String, f64)],
    x_desc: &str,
) -> DrawResult {
    let names: Vec<&str> = items.iter().map(|(n, _)| n.as_str()).collect();
    let values: Vec<f64> = items.iter().map(|(_, v)| *v).collect();
    let count = items.len().max(1);

    let min_x = values.iter().copied().fold(0.0_f64, f64::min);
    let max_x = values.iter().copied().fold(0.0_f64, f64::max);
    let pad = ((max_x - min_x) * 0.1).max(1e-6);

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(260)
        .build_cartesian_2d((min_x - pad)..(max_x + pad), 0..count)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .y_labels(count)
        .y_label_formatter(&|idx| {
            // Largest value at the top.
            count
                .checked_sub(*idx + 1)
                .and_then(|i| names.get(i))
                .map(|s| s.to_string())
                .unwrap_or_default()
        })
        .x_desc(x_desc)
        .draw()?;

    chart.draw_series(values.iter().enumerate().map(|(i, &v)| {
        let y = count - 1 - i;
        let color = if v >= 0.0 { TEAL } else { CORAL };
        Rectangle::new([(v.min(0.0), y), (v.max(0.0), y + 1)], color.mix(0.7).filled())
    }))?;

    root.present()?;
    Ok(())
}

fn diverging(v: f64) -> RGBColor {
    if v.is_nan() {
        return RGBColor(200, 200, 200);
    }
    let t = v.clamp(-1.0, 1.0);
    let fade = |c: u8, w: f64| (255.0 - (255.0 - c as f64) * w).round() as u8;
    if t >= 0.0 {
        RGBColor(fade(180, t), fade(30, t), fade(40, t))
    } else {
        RGBColor(fade(40, -t), fade(70, -t), fade(180, -t))
    }
}

pub fn outcome_distribution(report: &AnalysisReport, dir: &Path) -> Result<PathBuf> {
    let path = prepare(dir, "outcome_distribution.png")?;
    let series = [Series {
        name: "matches",
        values: report.outcome_counts.iter().map(|&c| c as f64).collect(),
        color: SKY,
    }];
    let drawn = grouped_bars(
        &path,
        "Match outcome distribution",
        &outcome_labels(),
        &series,
        "Matches",
    );
    finish(path, drawn)
}

pub fn score_histograms(report: &AnalysisReport, dir: &Path) -> Result<PathBuf> {
    let path = prepare(dir, "score_histograms.png")?;
    let bins = report
        .home_score_histogram
        .len()
        .max(report.away_score_histogram.len());
    let padded = |h: &[usize]| -> Vec<f64> {
        (0..bins).map(|i| h.get(i).copied().unwrap_or(0) as f64).collect()
    };
    let series = [
        Series {
            name: "home goals",
            values: padded(&report.home_score_histogram),
            color: SKY,
        },
        Series {
            name: "away goals",
            values: padded(&report.away_score_histogram),
            color: CORAL,
        },
    ];
    let labels: Vec<String> = (0..bins).map(|i| i.to_string()).collect();
    let drawn = grouped_bars(&path, "Goals per match", &labels, &series, "Matches");
    finish(path, drawn)
}

pub fn goals_by_outcome(report: &AnalysisReport, dir: &Path) -> Result<PathBuf> {
    let path = prepare(dir, "goals_by_outcome.png")?;
    let series = [
        Series {
            name: "home score",
            values: report.goals_by_outcome.iter().map(|g| g.mean_home_score).collect(),
            color: SKY,
        },
        Series {
            name: "away score",
            values: report.goals_by_outcome.iter().map(|g| g.mean_away_score).collect(),
            color: CORAL,
        },
    ];
    let labels: Vec<String> = report
        .goals_by_outcome
        .iter()
        .map(|g| g.outcome.label().to_string())
        .collect();
    let drawn = grouped_bars(&path, "Mean goals by outcome", &labels, &series, "Goals");
    finish(path, drawn)
}

pub fn correlation_heatmap(matrix: &CorrelationMatrix, dir: &Path) -> Result<PathBuf> {
    let path = prepare(dir, "correlation_matrix.png")?;
    let drawn = heatmap(
        &path,
        "Correlation matrix",
        &matrix.columns,
        &matrix.values,
        &diverging,
        &|v| if v.is_nan() { "nan".to_string() } else { format!("{v:.2}") },
    );
    finish(path, drawn)
}

pub fn confusion_heatmap(matrix: &ConfusionMatrix, dir: &Path, file: &str) -> Result<PathBuf> {
    let path = prepare(dir, file)?;
    let labels: Vec<String> = matrix.classes.iter().map(|c| c.label().to_string()).collect();
    let max = matrix.counts.iter().flatten().copied().max().unwrap_or(0).max(1) as f64;
    let values: Vec<Vec<f64>> = matrix
        .counts
        .iter()
        .map(|row| row.iter().map(|&c| c as f64).collect())
        .collect();
    let drawn = heatmap(
        &path,
        "Confusion matrix (rows: true, columns: predicted)",
        &labels,
        &values,
        &|v| diverging(v / max),
        &|v| format!("{v:.0}"),
    );
    finish(path, drawn)
}

/// Coefficient or importance bars; `None` when the interpretation has
/// nothing to plot.
pub fn interpretation_bars(
    interpretation: &Interpretation,
    dir: &Path,
) -> Option<Result<PathBuf>> {
    let (file, title, items, x_desc) = match interpretation {
        Interpretation::Coefficients {
            class,
            positive,
            negative,
        } => {
            let mut items = positive.clone();
            items.extend(negative.iter().rev().cloned());
            (
                "coefficients.png",
                format!("Logistic regression coefficients ({class})"),
                items,
                "Coefficient",
            )
        }
        Interpretation::Importances { top } => (
            "feature_importances.png",
            "Random forest feature importances".to_string(),
            top.clone(),
            "Importance",
        ),
        Interpretation::Unsupported => return None,
    };
    Some(prepare(dir, file).and_then(|path| {
        let drawn = horizontal_bars(&path, &title, &items, x_desc);
        finish(path, drawn)
    }))
}

pub fn real_vs_predicted(report: &MonitoringReport, dir: &Path) -> Result<PathBuf> {
    let path = prepare(dir, "real_vs_predicted.png")?;
    let series = [
        Series {
            name: "real",
            values: report.real_counts.iter().map(|&c| c as f64).collect(),
            color: SKY,
        },
        Series {
            name: "predicted",
            values: report.predicted_counts.iter().map(|&c| c as f64).collect(),
            color: CORAL,
        },
    ];
    let drawn = grouped_bars(
        &path,
        "Real vs predicted outcomes on new matches",
        &outcome_labels(),
        &series,
        "Matches",
    );
    finish(path, drawn)
}
