//! Plain-text rendering of the stage reports.

use std::fmt;

use crate::analysis::AnalysisReport;
use crate::evaluation::EvaluationReport;
use crate::metrics::{ClassificationReport, ConfusionMatrix};
use crate::model::Interpretation;
use crate::monitoring::{MonitoringReport, SimulatedMatch};
use crate::outcome::Outcome;
use crate::preprocess::CleaningSummary;
use crate::training::TrainingReport;

fn fmt_corr(v: f64) -> String {
    if v.is_nan() {
        "   nan".to_string()
    } else {
        format!("{v:+.3}")
    }
}

impl fmt::Display for CleaningSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rows after cleaning: {}", self.rows)?;
        writeln!(f, "Missing values before cleaning:")?;
        for (column, missing) in &self.missing_by_column {
            writeln!(f, "  {column:<12} {missing}")?;
        }
        writeln!(f, "Scores coerced to 0: {}", self.coerced_scores)?;
        write!(f, "Outcomes:")?;
        for outcome in Outcome::ALL {
            write!(f, " {}={}", outcome, self.outcome_counts[outcome.index()])?;
        }
        Ok(())
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Matches analysed: {}", self.rows)?;
        writeln!(f, "Outcome distribution:")?;
        for outcome in Outcome::ALL {
            let n = self.outcome_counts[outcome.index()];
            let pct = 100.0 * n as f64 / self.rows.max(1) as f64;
            writeln!(f, "  {:<9} {:>7} ({pct:.1}%)", outcome.label(), n)?;
        }

        writeln!(f, "Mean goals by outcome:")?;
        for g in &self.goals_by_outcome {
            writeln!(
                f,
                "  {:<9} home={:.2} away={:.2} n={}",
                g.outcome.label(),
                g.mean_home_score,
                g.mean_away_score,
                g.matches
            )?;
        }

        writeln!(f, "Correlation matrix:")?;
        write!(f, "{:>16}", "")?;
        for (i, _) in self.correlation.columns.iter().enumerate() {
            write!(f, " {:>6}", format!("c{i}"))?;
        }
        writeln!(f)?;
        for (i, (name, row)) in self
            .correlation
            .columns
            .iter()
            .zip(&self.correlation.values)
            .enumerate()
        {
            write!(f, "{:>12} c{i:<2}", name)?;
            for v in row {
                write!(f, " {}", fmt_corr(*v))?;
            }
            writeln!(f)?;
        }

        writeln!(f, "Correlation with result_numeric:")?;
        for (name, v) in &self.result_correlations {
            writeln!(f, "  {name:<16} {}", fmt_corr(*v))?;
        }

        let Some(t) = &self.home_advantage_test else {
            return write!(f, "Home vs away goals t-test: not enough matches.");
        };
        writeln!(
            f,
            "Home vs away goals t-test: t={:.3} p={:.4} (home mean {:.3}, away mean {:.3})",
            t.statistic, t.p_value, t.home_mean, t.away_mean
        )?;
        if t.significant {
            write!(
                f,
                "  p < {:.2}: home and away scoring differ significantly (home advantage).",
                t.alpha
            )
        } else {
            write!(
                f,
                "  p >= {:.2}: no significant difference between home and away scoring.",
                t.alpha
            )
        }
    }
}

impl fmt::Display for TrainingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Split: train={} test={}",
            self.train_rows, self.test_rows
        )?;
        for (outcome, train, test) in &self.class_balance {
            writeln!(f, "  {:<9} train={train:<7} test={test}", outcome.label())?;
        }
        for c in &self.candidates {
            writeln!(f, "{:<20} accuracy={:.4}", c.name, c.accuracy)?;
        }
        write!(f, "Selected: {}", self.selected)
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>14} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for (class, m) in &self.per_class {
            writeln!(
                f,
                "{:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                class.label(),
                m.precision,
                m.recall,
                m.f1,
                m.support
            )?;
        }
        let total = self.macro_avg.support;
        writeln!(
            f,
            "{:>14} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, total
        )?;
        for (label, m) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                label, m.precision, m.recall, m.f1, m.support
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>10}", "true\\pred")?;
        for c in &self.classes {
            write!(f, " {:>9}", c.label())?;
        }
        for (c, row) in self.classes.iter().zip(&self.counts) {
            writeln!(f)?;
            write!(f, "{:>10}", c.label())?;
            for n in row {
                write!(f, " {n:>9}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} accuracy: {:.4} ({} rows)",
            self.model, self.accuracy, self.samples
        )?;
        writeln!(
            f,
            "brier={:.4} log_loss={:.4}",
            self.probability.brier, self.probability.log_loss
        )?;
        writeln!(f, "Classification report:")?;
        writeln!(f, "{}", self.classification)?;
        writeln!(f, "Confusion matrix:")?;
        write!(f, "{}", self.confusion)
    }
}

impl fmt::Display for Interpretation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interpretation::Coefficients {
                class,
                positive,
                negative,
            } => {
                writeln!(f, "Top {} positive coefficients ({class}):", positive.len())?;
                for (name, v) in positive {
                    writeln!(f, "  {name:<40} {v:+.4}")?;
                }
                write!(f, "Top {} negative coefficients ({class}):", negative.len())?;
                for (name, v) in negative {
                    write!(f, "\n  {name:<40} {v:+.4}")?;
                }
                Ok(())
            }
            Interpretation::Importances { top } => {
                write!(f, "Top {} feature importances:", top.len())?;
                for (name, v) in top {
                    write!(f, "\n  {name:<40} {v:.4}")?;
                }
                Ok(())
            }
            Interpretation::Unsupported => {
                write!(f, "Interpretation is not supported for this model.")
            }
        }
    }
}

/// Display adapter for a simulated batch.
pub struct SimulatedBatch<'a>(pub &'a [SimulatedMatch]);

impl fmt::Display for SimulatedBatch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Simulated matches: {}", self.0.len())?;
        for m in self.0 {
            let r = &m.features;
            write!(
                f,
                "\n  {} vs {} | {} | {}, {} | neutral={} {}-{:02}-dow{} gd={:+} goals={} => {}",
                r.home_team,
                r.away_team,
                r.tournament,
                r.city,
                r.country,
                r.neutral,
                r.year,
                r.month,
                r.day_of_week,
                r.goal_difference,
                r.total_goals,
                m.result
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for MonitoringReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.evaluation)?;
        writeln!(
            f,
            "Hold-out accuracy {:.4}, new-data accuracy {:.4}, drift {:+.4}",
            self.holdout_accuracy, self.evaluation.accuracy, self.accuracy_drift
        )?;
        writeln!(f, "Real vs predicted:")?;
        for outcome in Outcome::ALL {
            writeln!(
                f,
                "  {:<9} real={} predicted={}",
                outcome.label(),
                self.real_counts[outcome.index()],
                self.predicted_counts[outcome.index()]
            )?;
        }
        writeln!(f, "{}", self.interpretation)?;
        write!(f, "Recommendations ({}):", self.model)?;
        for (i, rec) in self.recommendations.iter().enumerate() {
            write!(f, "\n  {}. {rec}", i + 1)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{classification_report, confusion_matrix};

    #[test]
    fn confusion_matrix_renders_rows_in_class_order() {
        let m = confusion_matrix(
            &[Outcome::HomeWin, Outcome::Draw],
            &[Outcome::HomeWin, Outcome::HomeWin],
            &Outcome::ALL,
        );
        let text = m.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].trim_start().starts_with("Away Win"));
        assert!(lines[3].trim_start().starts_with("Home Win"));
        assert!(lines[2].ends_with('1'));
    }

    #[test]
    fn classification_report_lists_averages() {
        let r = classification_report(
            &[Outcome::HomeWin, Outcome::Draw],
            &[Outcome::HomeWin, Outcome::HomeWin],
        );
        let text = r.to_string();
        assert!(text.contains("macro avg"));
        assert!(text.contains("weighted avg"));
        assert!(text.contains("accuracy"));
    }

    #[test]
    fn unsupported_interpretation_says_so() {
        assert!(Interpretation::Unsupported.to_string().contains("not supported"));
    }
}
