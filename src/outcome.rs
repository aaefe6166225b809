use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

/// Match outcome from the home side's point of view.
///
/// Variant order is the lexicographic order of the labels, which is the class
/// order used by reports and confusion matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "Away Win")]
    AwayWin,
    #[serde(rename = "Draw")]
    Draw,
    #[serde(rename = "Home Win")]
    HomeWin,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::AwayWin, Outcome::Draw, Outcome::HomeWin];

    pub fn label(self) -> &'static str {
        match self {
            Outcome::AwayWin => "Away Win",
            Outcome::Draw => "Draw",
            Outcome::HomeWin => "Home Win",
        }
    }

    /// Home Win = 1, Draw = 0, Away Win = -1.
    pub fn numeric(self) -> f64 {
        match self {
            Outcome::HomeWin => 1.0,
            Outcome::Draw => 0.0,
            Outcome::AwayWin => -1.0,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Outcome::AwayWin => 0,
            Outcome::Draw => 1,
            Outcome::HomeWin => 2,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Outcome {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Home Win" => Ok(Outcome::HomeWin),
            "Draw" => Ok(Outcome::Draw),
            "Away Win" => Ok(Outcome::AwayWin),
            other => Err(anyhow!("unknown outcome label: {other}")),
        }
    }
}

pub fn classify_outcome(home_goals: i32, away_goals: i32) -> Outcome {
    if home_goals > away_goals {
        Outcome::HomeWin
    } else if home_goals < away_goals {
        Outcome::AwayWin
    } else {
        Outcome::Draw
    }
}

/// Counts per outcome, indexed by [`Outcome::index`].
pub fn outcome_counts(outcomes: impl IntoIterator<Item = Outcome>) -> [usize; 3] {
    let mut counts = [0usize; 3];
    for outcome in outcomes {
        counts[outcome.index()] += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_is_total_over_small_scores() {
        for home in 0..=12 {
            for away in 0..=12 {
                let expected = match home.cmp(&away) {
                    std::cmp::Ordering::Greater => Outcome::HomeWin,
                    std::cmp::Ordering::Less => Outcome::AwayWin,
                    std::cmp::Ordering::Equal => Outcome::Draw,
                };
                assert_eq!(classify_outcome(home, away), expected, "{home}-{away}");
            }
        }
    }

    #[test]
    fn labels_round_trip_and_sort_lexicographically() {
        for outcome in Outcome::ALL {
            assert_eq!(outcome.label().parse::<Outcome>().unwrap(), outcome);
        }
        let mut labels: Vec<&str> = Outcome::ALL.iter().map(|o| o.label()).collect();
        let sorted = {
            let mut s = labels.clone();
            s.sort_unstable();
            s
        };
        assert_eq!(labels, sorted);
        labels.dedup();
        assert_eq!(labels.len(), 3);
    }

    #[test]
    fn numeric_encoding() {
        assert_eq!(Outcome::HomeWin.numeric(), 1.0);
        assert_eq!(Outcome::Draw.numeric(), 0.0);
        assert_eq!(Outcome::AwayWin.numeric(), -1.0);
    }
}
