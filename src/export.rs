use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::metrics::{ClassificationReport, ConfusionMatrix};
use crate::model::Interpretation;
use crate::outcome::Outcome;
use crate::pipeline::PipelineSummary;

pub struct ExportReport {
    pub sheets: usize,
    pub rows: usize,
}

pub struct ExportProgress {
    pub current: usize,
    pub total: usize,
    pub message: String,
}

/// Writes the run summary as an `.xlsx` workbook, one sheet per report.
pub fn export_summary_with_progress(
    summary: &PipelineSummary,
    path: &Path,
    mut on_progress: impl FnMut(ExportProgress),
) -> Result<ExportReport> {
    let sheets: [(&str, Vec<Vec<String>>); 5] = [
        ("Training", training_rows(summary)),
        (
            "Classification",
            classification_rows(&summary.evaluation.classification),
        ),
        ("Confusion", confusion_rows(&summary.evaluation.confusion)),
        ("Interpretation", interpretation_rows(&summary.interpretation)),
        ("Monitoring", monitoring_rows(summary)),
    ];
    let total = sheets.len();

    let mut workbook = Workbook::new();
    let mut rows = 0usize;
    for (current, (name, sheet_rows)) in sheets.iter().enumerate() {
        let sheet = workbook.add_worksheet();
        sheet.set_name(*name)?;
        write_rows(sheet, sheet_rows)?;
        rows += sheet_rows.len().saturating_sub(1);
        on_progress(ExportProgress {
            current: current + 1,
            total,
            message: format!("Wrote {name}"),
        });
    }

    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        sheets: total,
        rows,
    })
}

fn strings<const N: usize>(cells: [&str; N]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

fn training_rows(summary: &PipelineSummary) -> Vec<Vec<String>> {
    let t = &summary.training;
    let mut rows = vec![strings(["Item", "Value"])];
    rows.push(vec!["Raw rows".to_string(), summary.raw_rows.to_string()]);
    rows.push(vec!["Train rows".to_string(), t.train_rows.to_string()]);
    rows.push(vec!["Test rows".to_string(), t.test_rows.to_string()]);
    for c in &t.candidates {
        rows.push(vec![
            format!("{} accuracy", c.name),
            format!("{:.4}", c.accuracy),
        ]);
    }
    rows.push(vec!["Selected".to_string(), t.selected.clone()]);
    rows.push(vec![
        "Model file".to_string(),
        summary.model_path.display().to_string(),
    ]);
    rows
}

fn classification_rows(report: &ClassificationReport) -> Vec<Vec<String>> {
    let mut rows = vec![strings(["Class", "Precision", "Recall", "F1", "Support"])];
    let metric_row = |label: &str, m: &crate::metrics::ClassMetrics| {
        vec![
            label.to_string(),
            format!("{:.4}", m.precision),
            format!("{:.4}", m.recall),
            format!("{:.4}", m.f1),
            m.support.to_string(),
        ]
    };
    for (class, m) in &report.per_class {
        rows.push(metric_row(class.label(), m));
    }
    rows.push(vec![
        "accuracy".to_string(),
        String::new(),
        String::new(),
        format!("{:.4}", report.accuracy),
        report.macro_avg.support.to_string(),
    ]);
    rows.push(metric_row("macro avg", &report.macro_avg));
    rows.push(metric_row("weighted avg", &report.weighted_avg));
    rows
}

fn confusion_rows(matrix: &ConfusionMatrix) -> Vec<Vec<String>> {
    let mut header = vec!["True \\ Predicted".to_string()];
    header.extend(matrix.classes.iter().map(|c| c.label().to_string()));
    let mut rows = vec![header];
    for (class, counts) in matrix.classes.iter().zip(&matrix.counts) {
        let mut row = vec![class.label().to_string()];
        row.extend(counts.iter().map(|n| n.to_string()));
        rows.push(row);
    }
    rows
}

fn interpretation_rows(interpretation: &Interpretation) -> Vec<Vec<String>> {
    let mut rows = vec![strings(["Kind", "Feature", "Value"])];
    match interpretation {
        Interpretation::Coefficients {
            positive, negative, ..
        } => {
            for (name, v) in positive {
                rows.push(vec!["positive".to_string(), name.clone(), format!("{v:.6}")]);
            }
            for (name, v) in negative {
                rows.push(vec!["negative".to_string(), name.clone(), format!("{v:.6}")]);
            }
        }
        Interpretation::Importances { top } => {
            for (name, v) in top {
                rows.push(vec!["importance".to_string(), name.clone(), format!("{v:.6}")]);
            }
        }
        Interpretation::Unsupported => {
            rows.push(strings(["unsupported", "", ""]));
        }
    }
    rows
}

fn monitoring_rows(summary: &PipelineSummary) -> Vec<Vec<String>> {
    let m = &summary.monitoring;
    let mut rows = vec![strings(["Item", "Value"])];
    rows.push(vec!["Model".to_string(), m.model.clone()]);
    rows.push(vec![
        "New-data accuracy".to_string(),
        format!("{:.4}", m.evaluation.accuracy),
    ]);
    rows.push(vec![
        "Hold-out accuracy".to_string(),
        format!("{:.4}", m.holdout_accuracy),
    ]);
    rows.push(vec!["Drift".to_string(), format!("{:+.4}", m.accuracy_drift)]);
    for outcome in Outcome::ALL {
        rows.push(vec![
            format!("{} real/predicted", outcome.label()),
            format!(
                "{}/{}",
                m.real_counts[outcome.index()],
                m.predicted_counts[outcome.index()]
            ),
        ]);
    }
    for (i, rec) in m.recommendations.iter().enumerate() {
        rows.push(vec![format!("Recommendation {}", i + 1), rec.to_string()]);
    }
    rows
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::confusion_matrix;

    #[test]
    fn confusion_sheet_has_header_and_class_rows() {
        let m = confusion_matrix(&[Outcome::Draw], &[Outcome::HomeWin], &Outcome::ALL);
        let rows = confusion_rows(&m);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0][3], "Home Win");
        assert_eq!(rows[2], vec!["Draw", "0", "0", "1"]);
    }

    #[test]
    fn interpretation_sheet_marks_unsupported() {
        let rows = interpretation_rows(&Interpretation::Unsupported);
        assert_eq!(rows[1][0], "unsupported");
    }
}
