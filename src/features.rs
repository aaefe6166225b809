use std::borrow::Cow;

use anyhow::{Result, anyhow};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::outcome::Outcome;
use crate::preprocess::CleanMatch;

/// A cleaned match plus the calendar and match-shape features.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzedMatch {
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
    pub year: i32,
    pub month: u32,
    /// Monday = 0 .. Sunday = 6.
    pub day_of_week: u32,
    pub is_home_game: u8,
    pub goal_difference: i32,
    pub total_goals: i32,
}

/// The model-facing columns of a match, addressable by column name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub home_team: String,
    pub away_team: String,
    pub tournament: String,
    pub city: String,
    pub country: String,
    pub neutral: bool,
    pub year: i32,
    pub month: u32,
    pub day_of_week: u32,
    pub is_home_game: u8,
    pub goal_difference: i32,
    pub total_goals: i32,
}

impl AnalyzedMatch {
    pub fn features(&self) -> FeatureRow {
        FeatureRow {
            home_team: self.home_team.clone(),
            away_team: self.away_team.clone(),
            tournament: self.tournament.clone(),
            city: self.city.clone(),
            country: self.country.clone(),
            neutral: self.neutral,
            year: self.year,
            month: self.month,
            day_of_week: self.day_of_week,
            is_home_game: self.is_home_game,
            goal_difference: self.goal_difference,
            total_goals: self.total_goals,
        }
    }
}

impl FeatureRow {
    pub fn numeric(&self, column: &str) -> Option<f64> {
        let v = match column {
            "year" => self.year as f64,
            "month" => self.month as f64,
            "day_of_week" => self.day_of_week as f64,
            "is_home_game" => self.is_home_game as f64,
            "goal_difference" => self.goal_difference as f64,
            "total_goals" => self.total_goals as f64,
            "neutral" => u8::from(self.neutral) as f64,
            _ => return None,
        };
        Some(v)
    }

    pub fn categorical(&self, column: &str) -> Option<Cow<'_, str>> {
        let v = match column {
            "home_team" => Cow::Borrowed(self.home_team.as_str()),
            "away_team" => Cow::Borrowed(self.away_team.as_str()),
            "tournament" => Cow::Borrowed(self.tournament.as_str()),
            "city" => Cow::Borrowed(self.city.as_str()),
            "country" => Cow::Borrowed(self.country.as_str()),
            "neutral" => Cow::Owned(self.neutral.to_string()),
            "is_home_game" => Cow::Owned(self.is_home_game.to_string()),
            "year" => Cow::Owned(self.year.to_string()),
            "month" => Cow::Owned(self.month.to_string()),
            "day_of_week" => Cow::Owned(self.day_of_week.to_string()),
            "goal_difference" => Cow::Owned(self.goal_difference.to_string()),
            "total_goals" => Cow::Owned(self.total_goals.to_string()),
            _ => return None,
        };
        Some(v)
    }
}

/// Appends calendar and match-shape features to every cleaned row. An
/// unparseable date makes the whole table absent.
pub fn engineer_features(cleaned: Option<&[CleanMatch]>) -> Option<Vec<AnalyzedMatch>> {
    let Some(cleaned) = cleaned else {
        warn!("input table is absent; no features to engineer");
        return None;
    };

    let mut out = Vec::with_capacity(cleaned.len());
    for (idx, row) in cleaned.iter().enumerate() {
        match derive_features(row) {
            Ok(analyzed) => out.push(analyzed),
            Err(err) => {
                error!("feature engineering failed at row {idx}: {err:#}");
                return None;
            }
        }
    }
    info!("feature engineering complete: {} rows", out.len());
    Some(out)
}

pub fn derive_features(row: &CleanMatch) -> Result<AnalyzedMatch> {
    let date = parse_match_date(&row.date)
        .ok_or_else(|| anyhow!("unparseable date {:?}", row.date))?;
    Ok(AnalyzedMatch {
        date: row.date.clone(),
        home_team: row.home_team.clone(),
        away_team: row.away_team.clone(),
        home_score: row.home_score,
        away_score: row.away_score,
        tournament: row.tournament.clone(),
        city: row.city.clone(),
        country: row.country.clone(),
        neutral: row.neutral,
        result: row.result,
        year: date.year(),
        month: date.month(),
        day_of_week: date.weekday().num_days_from_monday(),
        is_home_game: u8::from(!row.neutral),
        goal_difference: row.home_score - row.away_score,
        total_goals: row.home_score + row.away_score,
    })
}

pub fn parse_match_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::classify_outcome;

    fn clean(home: i32, away: i32, neutral: bool) -> CleanMatch {
        CleanMatch {
            date: "2018-07-15".to_string(),
            home_team: "France".to_string(),
            away_team: "Croatia".to_string(),
            home_score: home,
            away_score: away,
            tournament: "FIFA World Cup".to_string(),
            city: "Moscow".to_string(),
            country: "Russia".to_string(),
            neutral,
            result: classify_outcome(home, away),
        }
    }

    #[test]
    fn home_win_example() {
        let m = derive_features(&clean(2, 0, false)).unwrap();
        assert_eq!(m.result, Outcome::HomeWin);
        assert_eq!(m.goal_difference, 2);
        assert_eq!(m.total_goals, 2);
        assert_eq!(m.is_home_game, 1);
    }

    #[test]
    fn neutral_draw_example() {
        let m = derive_features(&clean(1, 1, true)).unwrap();
        assert_eq!(m.result, Outcome::Draw);
        assert_eq!(m.goal_difference, 0);
        assert_eq!(m.total_goals, 2);
        assert_eq!(m.is_home_game, 0);
    }

    #[test]
    fn calendar_fields() {
        let m = derive_features(&clean(4, 2, true)).unwrap();
        assert_eq!(m.year, 2018);
        assert_eq!(m.month, 7);
        // 2018-07-15 was a Sunday.
        assert_eq!(m.day_of_week, 6);
    }

    #[test]
    fn goal_identity_and_home_flag_hold() {
        let rows: Vec<CleanMatch> = (0..6)
            .flat_map(|h| (0..6).map(move |a| clean(h, a, (h + a) % 2 == 0)))
            .collect();
        let analyzed = engineer_features(Some(rows.as_slice())).unwrap();
        for m in &analyzed {
            assert_eq!(m.goal_difference + 2 * m.away_score, m.total_goals);
            assert_eq!(m.is_home_game == 1, !m.neutral);
        }
    }

    #[test]
    fn bad_date_makes_table_absent() {
        let mut row = clean(1, 0, false);
        row.date = "not a date".to_string();
        assert!(engineer_features(Some(&[row][..])).is_none());
        assert!(engineer_features(None).is_none());
    }

    #[test]
    fn timestamped_dates_parse() {
        assert_eq!(
            parse_match_date("2024-03-01 00:00:00"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
    }

    #[test]
    fn feature_row_lookup() {
        let row = derive_features(&clean(3, 1, false)).unwrap().features();
        assert_eq!(row.numeric("goal_difference"), Some(2.0));
        assert_eq!(row.numeric("home_team"), None);
        assert_eq!(row.categorical("neutral").as_deref(), Some("false"));
        assert_eq!(row.categorical("is_home_game").as_deref(), Some("1"));
        assert_eq!(row.categorical("unknown"), None);
    }
}
