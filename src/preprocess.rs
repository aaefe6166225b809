use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::dataset::{REQUIRED_COLUMNS, RawMatch};
use crate::outcome::{Outcome, classify_outcome, outcome_counts};

const MISSING_MARKERS: [&str; 4] = ["", "na", "nan", "null"];

/// A results row with clean integer scores and its derived outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanMatch {
    pub date: String,
    pub home_team: String,
    pub away_team: String,
    pub home_score: i32,
    pub away_score: i32,
    pub tournament: String,
    pub city: String,
    pub country: String,
    pub neutral: bool,
    pub result: Outcome,
}

impl CleanMatch {
    /// Text form of this row, as it would be read back from a results table.
    pub fn to_raw(&self) -> RawMatch {
        RawMatch {
            date: self.date.clone(),
            home_team: self.home_team.clone(),
            away_team: self.away_team.clone(),
            home_score: Some(self.home_score.to_string()),
            away_score: Some(self.away_score.to_string()),
            tournament: self.tournament.clone(),
            city: self.city.clone(),
            country: self.country.clone(),
            neutral: self.neutral.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleaningSummary {
    pub rows: usize,
    pub missing_by_column: Vec<(&'static str, usize)>,
    pub coerced_scores: usize,
    pub outcome_counts: [usize; 3],
}

/// Coerces scores to integers and appends the outcome label. Never drops a row.
pub fn preprocess_data(raw: Option<&[RawMatch]>) -> Option<Vec<CleanMatch>> {
    let Some(raw) = raw else {
        warn!("input table is absent; nothing to preprocess");
        return None;
    };

    let rows: Vec<CleanMatch> = raw.iter().map(clean_row).collect();
    info!("preprocessing complete: {} rows labelled", rows.len());
    Some(rows)
}

fn clean_row(raw: &RawMatch) -> CleanMatch {
    let home_score = parse_score(raw.home_score.as_deref()).unwrap_or(0);
    let away_score = parse_score(raw.away_score.as_deref()).unwrap_or(0);
    CleanMatch {
        date: raw.date.clone(),
        home_team: raw.home_team.clone(),
        away_team: raw.away_team.clone(),
        home_score,
        away_score,
        tournament: raw.tournament.clone(),
        city: raw.city.clone(),
        country: raw.country.clone(),
        neutral: parse_neutral(&raw.neutral),
        result: classify_outcome(home_score, away_score),
    }
}

/// Integer value of a score field; floats truncate toward zero. `None` when the
/// field is missing or not numeric.
pub fn parse_score(raw: Option<&str>) -> Option<i32> {
    let s = raw?.trim();
    if let Ok(v) = s.parse::<i32>() {
        return Some(v);
    }
    let v = s.parse::<f64>().ok()?;
    if !v.is_finite() {
        return None;
    }
    Some(v.trunc().clamp(i32::MIN as f64, i32::MAX as f64) as i32)
}

/// Reads the `neutral` column. Only an explicit false value marks a home
/// fixture; blank or unrecognised values count as neutral ground.
pub fn parse_neutral(raw: &str) -> bool {
    !matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "false" | "0" | "no" | "f"
    )
}

pub fn cleaning_summary(raw: &[RawMatch], cleaned: &[CleanMatch]) -> CleaningSummary {
    let mut missing = [0usize; REQUIRED_COLUMNS.len()];
    let mut coerced = 0usize;
    for row in raw {
        let fields: [Option<&str>; REQUIRED_COLUMNS.len()] = [
            Some(row.date.as_str()),
            Some(row.home_team.as_str()),
            Some(row.away_team.as_str()),
            row.home_score.as_deref(),
            row.away_score.as_deref(),
            Some(row.tournament.as_str()),
            Some(row.city.as_str()),
            Some(row.country.as_str()),
            Some(row.neutral.as_str()),
        ];
        for (slot, field) in missing.iter_mut().zip(fields) {
            if is_missing(field) {
                *slot += 1;
            }
        }
        for score in [row.home_score.as_deref(), row.away_score.as_deref()] {
            if parse_score(score).is_none() {
                coerced += 1;
            }
        }
    }

    CleaningSummary {
        rows: cleaned.len(),
        missing_by_column: REQUIRED_COLUMNS.iter().copied().zip(missing).collect(),
        coerced_scores: coerced,
        outcome_counts: outcome_counts(cleaned.iter().map(|m| m.result)),
    }
}

fn is_missing(field: Option<&str>) -> bool {
    match field {
        None => true,
        Some(s) => MISSING_MARKERS.contains(&s.trim().to_ascii_lowercase().as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(home: Option<&str>, away: Option<&str>, neutral: &str) -> RawMatch {
        RawMatch {
            date: "2020-01-01".to_string(),
            home_team: "Brazil".to_string(),
            away_team: "Argentina".to_string(),
            home_score: home.map(str::to_string),
            away_score: away.map(str::to_string),
            tournament: "Friendly".to_string(),
            city: "Rio de Janeiro".to_string(),
            country: "Brazil".to_string(),
            neutral: neutral.to_string(),
        }
    }

    #[test]
    fn absent_input_stays_absent() {
        assert!(preprocess_data(None).is_none());
    }

    #[test]
    fn malformed_scores_become_zero() {
        let rows = vec![
            raw(Some("x"), Some("2"), "FALSE"),
            raw(None, Some("NA"), "FALSE"),
            raw(Some("3.0"), Some(" 1 "), "TRUE"),
        ];
        let cleaned = preprocess_data(Some(rows.as_slice())).unwrap();
        assert_eq!(cleaned.len(), 3);
        assert_eq!((cleaned[0].home_score, cleaned[0].away_score), (0, 2));
        assert_eq!(cleaned[0].result, Outcome::AwayWin);
        assert_eq!((cleaned[1].home_score, cleaned[1].away_score), (0, 0));
        assert_eq!(cleaned[1].result, Outcome::Draw);
        assert_eq!((cleaned[2].home_score, cleaned[2].away_score), (3, 1));
        assert_eq!(cleaned[2].result, Outcome::HomeWin);
        assert!(cleaned[2].neutral);

        let summary = cleaning_summary(&rows, &cleaned);
        assert_eq!(summary.coerced_scores, 3);
        assert_eq!(summary.outcome_counts, [1, 1, 1]);
        let missing_home = summary
            .missing_by_column
            .iter()
            .find(|(c, _)| *c == "home_score")
            .unwrap();
        assert_eq!(missing_home.1, 1);
    }

    #[test]
    fn only_explicit_false_is_a_home_fixture() {
        let rows = vec![
            raw(Some("1"), Some("0"), "FALSE"),
            raw(Some("1"), Some("0"), " true "),
            raw(Some("1"), Some("0"), ""),
            raw(Some("1"), Some("0"), "unknown"),
        ];
        let cleaned = preprocess_data(Some(rows.as_slice())).unwrap();
        let neutral: Vec<bool> = cleaned.iter().map(|m| m.neutral).collect();
        assert_eq!(neutral, vec![false, true, true, true]);
    }

    #[test]
    fn cleaning_is_idempotent() {
        let rows = vec![
            raw(Some("2"), Some("0"), "FALSE"),
            raw(Some("bad"), None, "TRUE"),
        ];
        let once = preprocess_data(Some(rows.as_slice())).unwrap();
        let as_raw: Vec<RawMatch> = once.iter().map(CleanMatch::to_raw).collect();
        let twice = preprocess_data(Some(as_raw.as_slice())).unwrap();
        assert_eq!(once, twice);
    }
}
