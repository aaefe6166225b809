use std::cmp::Ordering;

use log::{info, warn};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::config::SIGNIFICANCE_LEVEL;
use crate::features::AnalyzedMatch;
use crate::outcome::{Outcome, outcome_counts};

pub const CORRELATION_COLUMNS: [&str; 9] = [
    "home_score",
    "away_score",
    "goal_difference",
    "total_goals",
    "year",
    "month",
    "day_of_week",
    "is_home_game",
    "result_numeric",
];

#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.values[i][j])
    }

    /// Correlations of every column with `target`, highest first; NaN sorts last.
    pub fn against(&self, target: &str) -> Vec<(String, f64)> {
        let Some(j) = self.columns.iter().position(|c| c == target) else {
            return Vec::new();
        };
        let mut out: Vec<(String, f64)> = self
            .columns
            .iter()
            .zip(&self.values)
            .map(|(name, row)| (name.clone(), row[j]))
            .collect();
        out.sort_by(|a, b| desc_nan_last(a.1, b.1));
        out
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TTestResult {
    pub statistic: f64,
    pub p_value: f64,
    pub home_mean: f64,
    pub away_mean: f64,
    pub alpha: f64,
    pub significant: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct OutcomeGoals {
    pub outcome: Outcome,
    pub matches: usize,
    pub mean_home_score: f64,
    pub mean_away_score: f64,
}

/// Observational summary of the engineered table; nothing downstream reads it.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub rows: usize,
    pub outcome_counts: [usize; 3],
    /// Index = goals scored, value = number of matches.
    pub home_score_histogram: Vec<usize>,
    pub away_score_histogram: Vec<usize>,
    pub goals_by_outcome: Vec<OutcomeGoals>,
    pub correlation: CorrelationMatrix,
    pub result_correlations: Vec<(String, f64)>,
    /// `None` when there are too few matches to estimate a variance.
    pub home_advantage_test: Option<TTestResult>,
}

pub fn analyze_correlation(rows: &[AnalyzedMatch]) -> Option<AnalysisReport> {
    if rows.is_empty() {
        warn!("no rows to analyze");
        return None;
    }

    let columns: Vec<Vec<f64>> = CORRELATION_COLUMNS
        .iter()
        .map(|name| rows.iter().map(|m| column_value(m, name)).collect())
        .collect();
    let values = columns
        .iter()
        .map(|a| columns.iter().map(|b| pearson(a, b)).collect())
        .collect();
    let correlation = CorrelationMatrix {
        columns: CORRELATION_COLUMNS.iter().map(|c| c.to_string()).collect(),
        values,
    };
    let result_correlations = correlation.against("result_numeric");

    let home: Vec<f64> = rows.iter().map(|m| m.home_score as f64).collect();
    let away: Vec<f64> = rows.iter().map(|m| m.away_score as f64).collect();
    let home_advantage_test = two_sample_t_test(&home, &away, SIGNIFICANCE_LEVEL);
    match &home_advantage_test {
        Some(t) => info!(
            "home advantage t-test: t={:.2} p={:.3}",
            t.statistic, t.p_value
        ),
        None => warn!("too few matches for the home advantage t-test"),
    }

    Some(AnalysisReport {
        rows: rows.len(),
        outcome_counts: outcome_counts(rows.iter().map(|m| m.result)),
        home_score_histogram: histogram(rows.iter().map(|m| m.home_score)),
        away_score_histogram: histogram(rows.iter().map(|m| m.away_score)),
        goals_by_outcome: goals_by_outcome(rows),
        correlation,
        result_correlations,
        home_advantage_test,
    })
}

fn column_value(m: &AnalyzedMatch, name: &str) -> f64 {
    match name {
        "home_score" => m.home_score as f64,
        "away_score" => m.away_score as f64,
        "goal_difference" => m.goal_difference as f64,
        "total_goals" => m.total_goals as f64,
        "year" => m.year as f64,
        "month" => m.month as f64,
        "day_of_week" => m.day_of_week as f64,
        "is_home_game" => m.is_home_game as f64,
        "result_numeric" => m.result.numeric(),
        _ => f64::NAN,
    }
}

/// Pearson correlation; NaN when either side has zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return f64::NAN;
    }
    let mx = xs[..n].iter().sum::<f64>() / n as f64;
    let my = ys[..n].iter().sum::<f64>() / n as f64;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in xs[..n].iter().zip(&ys[..n]) {
        let dx = x - mx;
        let dy = y - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0)
}

/// Equal-variance two-sample t-test with a two-sided p-value.
pub fn two_sample_t_test(a: &[f64], b: &[f64], alpha: f64) -> Option<TTestResult> {
    let (n1, n2) = (a.len(), b.len());
    if n1 < 1 || n2 < 1 || n1 + n2 < 3 {
        return None;
    }
    let m1 = mean(a);
    let m2 = mean(b);
    let ss1: f64 = a.iter().map(|x| (x - m1).powi(2)).sum();
    let ss2: f64 = b.iter().map(|x| (x - m2).powi(2)).sum();
    let df = (n1 + n2 - 2) as f64;
    let pooled = (ss1 + ss2) / df;
    let se = (pooled * (1.0 / n1 as f64 + 1.0 / n2 as f64)).sqrt();

    let (statistic, p_value) = if se > 0.0 {
        let t = (m1 - m2) / se;
        let p = StudentsT::new(0.0, 1.0, df)
            .map(|dist| 2.0 * (1.0 - dist.cdf(t.abs())))
            .unwrap_or(f64::NAN);
        (t, p.clamp(0.0, 1.0))
    } else {
        (f64::NAN, f64::NAN)
    };

    Some(TTestResult {
        statistic,
        p_value,
        home_mean: m1,
        away_mean: m2,
        alpha,
        significant: p_value < alpha,
    })
}

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

fn histogram(scores: impl Iterator<Item = i32>) -> Vec<usize> {
    let mut bins: Vec<usize> = Vec::new();
    for s in scores {
        let idx = s.max(0) as usize;
        if idx >= bins.len() {
            bins.resize(idx + 1, 0);
        }
        bins[idx] += 1;
    }
    bins
}

fn goals_by_outcome(rows: &[AnalyzedMatch]) -> Vec<OutcomeGoals> {
    Outcome::ALL
        .iter()
        .map(|&outcome| {
            let mut n = 0usize;
            let mut home = 0.0;
            let mut away = 0.0;
            for m in rows.iter().filter(|m| m.result == outcome) {
                n += 1;
                home += m.home_score as f64;
                away += m.away_score as f64;
            }
            let denom = n.max(1) as f64;
            OutcomeGoals {
                outcome,
                matches: n,
                mean_home_score: home / denom,
                mean_away_score: away / denom,
            }
        })
        .collect()
}

fn desc_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}
