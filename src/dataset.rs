use std::fs::{self, File};
use std::io;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use log::{error, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::{DataSource, PipelineConfig};
use crate::features::AnalyzedMatch;
use crate::http_client::download_csv;

pub const REQUIRED_COLUMNS: [&str; 9] = [
    "date",
    "home_team",
    "away_team",
    "home_score",
    "away_score",
    "tournament",
    "city",
    "country",
    "neutral",
];

/// One row of the source results table, kept as text until preprocessing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMatch {
    pub date: String,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub home_score: Option<String>,
    #[serde(default)]
    pub away_score: Option<String>,
    pub tournament: String,
    pub city: String,
    pub country: String,
    pub neutral: String,
}

/// Loads the raw results table, preferring `source` and falling back to the
/// local path when the remote read fails. `None` means no source could be read.
pub fn load_raw_data(config: &PipelineConfig, source: DataSource) -> Option<Vec<RawMatch>> {
    if source == DataSource::Remote {
        info!("loading raw data from {}", config.raw_data_url);
        match download_csv(&config.raw_data_url).and_then(|body| read_matches(body.as_bytes())) {
            Ok(rows) => {
                info!("loaded {} rows from remote source", rows.len());
                return Some(rows);
            }
            Err(err) => {
                warn!("remote load failed: {err:#}");
                warn!("falling back to local path");
            }
        }
    }
    load_local_raw_data(&config.raw_data_path)
}

fn load_local_raw_data(path: &Path) -> Option<Vec<RawMatch>> {
    info!("loading raw data from {}", path.display());
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            error!("file not found at {}", path.display());
            error!("place the results table (results.csv) under data/raw/");
            return None;
        }
        Err(err) => {
            error!("failed to open {}: {err}", path.display());
            return None;
        }
    };
    match read_matches(file) {
        Ok(rows) => {
            info!("loaded {} rows from local source", rows.len());
            Some(rows)
        }
        Err(err) => {
            error!("failed to read {}: {err:#}", path.display());
            None
        }
    }
}

/// Parses a results table. The header must carry every required column; extra
/// columns are ignored, blank lines and malformed rows are skipped.
pub fn read_matches<R: io::Read>(reader: R) -> Result<Vec<RawMatch>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(reader);

    let headers = rdr.headers().context("read csv header")?.clone();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    if !missing.is_empty() {
        return Err(anyhow!("missing required columns: {}", missing.join(", ")));
    }

    let mut out = Vec::new();
    let mut skipped = 0usize;
    for result in rdr.records() {
        let record = result.context("read csv record")?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        match record.deserialize::<RawMatch>(Some(&headers)) {
            Ok(row) => out.push(row),
            Err(err) => {
                skipped += 1;
                let line = record.position().map(|p| p.line()).unwrap_or(0);
                warn!("skipping malformed row at line {line}: {err}");
            }
        }
    }
    if skipped > 0 {
        warn!("{skipped} malformed rows skipped");
    }
    Ok(out)
}

/// Writes `rows` as CSV with a header, creating missing parent directories.
pub fn save_table<T: Serialize>(rows: &[T], path: &Path) -> Result<()> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
        && !dir.exists()
    {
        fs::create_dir_all(dir).with_context(|| format!("create directory {}", dir.display()))?;
        info!("created directory {}", dir.display());
    }

    let mut wtr = WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("open {} for writing", path.display()))?;
    for row in rows {
        wtr.serialize(row)
            .with_context(|| format!("write row to {}", path.display()))?;
    }
    wtr.flush()
        .with_context(|| format!("flush {}", path.display()))?;
    info!("saved {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Reads a table previously written by [`save_table`].
pub fn load_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("open {}", path.display()))?;
    let mut out = Vec::new();
    for row in rdr.deserialize() {
        out.push(row.with_context(|| format!("parse row in {}", path.display()))?);
    }
    Ok(out)
}

/// Reloads the analyzed table persisted by a previous run.
pub fn load_analyzed_table(path: &Path) -> Result<Vec<AnalyzedMatch>> {
    let rows: Vec<AnalyzedMatch> = load_table(path)?;
    if rows.is_empty() {
        return Err(anyhow!("{} holds no rows", path.display()));
    }
    info!("loaded {} analyzed rows from {}", rows.len(), path.display());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
date,home_team,away_team,home_score,away_score,tournament,city,country,neutral
1872-11-30,Scotland,England,0,0,Friendly,Glasgow,Scotland,FALSE

1873-03-08,England,Scotland,4,2,Friendly,London,England,FALSE
2022-12-18,Argentina,France,,NA,FIFA World Cup,Lusail,Qatar,TRUE
";

    #[test]
    fn reads_rows_and_skips_blank_lines() {
        let rows = read_matches(SAMPLE.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].home_team, "England");
        assert_eq!(rows[1].home_score.as_deref(), Some("4"));
        assert_eq!(rows[2].home_score, None);
        assert_eq!(rows[2].away_score.as_deref(), Some("NA"));
        assert_eq!(rows[2].neutral, "TRUE");
    }

    #[test]
    fn missing_columns_are_rejected() {
        let raw = "date,home_team,away_team\n2020-01-01,A,B\n";
        let err = read_matches(raw.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("home_score"));
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("raw.csv");
        let rows = read_matches(SAMPLE.as_bytes()).unwrap();
        save_table(&rows, &path).unwrap();
        let back: Vec<RawMatch> = load_table(&path).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn missing_local_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::rooted_at(dir.path());
        assert!(load_raw_data(&config, DataSource::Local).is_none());
    }

    #[test]
    fn remote_failure_falls_back_to_local() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PipelineConfig::rooted_at(dir.path());
        config.raw_data_url = "http://127.0.0.1:9/results.csv".to_string();
        fs::create_dir_all(config.raw_data_path.parent().unwrap()).unwrap();
        fs::write(&config.raw_data_path, SAMPLE).unwrap();
        let rows = load_raw_data(&config, DataSource::Remote).unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn empty_analyzed_table_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analyzed.csv");
        save_table::<AnalyzedMatch>(&[], &path).unwrap();
        assert!(load_analyzed_table(&path).is_err());
    }
}
