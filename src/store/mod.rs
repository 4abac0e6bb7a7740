//! File-backed persistence: the raw match table, the assembled feature
//! table, and the trained artifact triple.

pub mod sample;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, ensure, Context, Result};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::{FeatureRow, LinearModel, ModelInfo, RawMatch, Standardizer, FEATURES_ORDER};

pub const SCALER_FILE: &str = "scaler.json";
pub const MODEL_FILE: &str = "model.json";
pub const MODEL_INFO_FILE: &str = "model_info.json";

// %Y-%m-%d first; the short-year and datetime variants show up in
// historical exports
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d/%m/%y", "%Y-%m-%dT%H:%M:%S"];

pub fn default_matches_path() -> PathBuf {
    PathBuf::from(
        env::var("FAIRLINE_MATCHES_CSV").unwrap_or_else(|_| "data/matches.csv".to_string()),
    )
}

pub fn default_features_path() -> PathBuf {
    PathBuf::from(
        env::var("FAIRLINE_FEATURES_CSV").unwrap_or_else(|_| "data/feature_table.csv".to_string()),
    )
}

pub fn default_model_dir() -> PathBuf {
    PathBuf::from(env::var("FAIRLINE_MODEL_DIR").unwrap_or_else(|_| "data/model".to_string()))
}

// ── raw match table ─────────────────────────────────────────────────────────

/// Read the raw match table. Numeric values that fail to parse count as
/// missing rather than failing the load; rows without a parseable date are
/// dropped with a warning.
pub fn read_matches_csv(path: &Path) -> Result<Vec<RawMatch>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open match table {}", path.display()))?;

    let headers = reader.headers()?.clone();
    let col = |names: &[&str]| -> Option<usize> {
        names
            .iter()
            .find_map(|name| headers.iter().position(|h| h == *name))
    };

    let date_idx = col(&["MatchDate", "Date"])
        .with_context(|| format!("{}: no MatchDate or Date column", path.display()))?;
    let home_idx = col(&["HomeTeam"])
        .with_context(|| format!("{}: no HomeTeam column", path.display()))?;
    let away_idx = col(&["AwayTeam"])
        .with_context(|| format!("{}: no AwayTeam column", path.display()))?;

    let odd_home_idx = col(&["OddHome"]);
    let odd_draw_idx = col(&["OddDraw"]);
    let odd_away_idx = col(&["OddAway"]);
    let home_elo_idx = col(&["HomeElo"]);
    let away_elo_idx = col(&["AwayElo"]);
    let home_shots_idx = col(&["HomeTarget"]);
    let away_shots_idx = col(&["AwayTarget"]);
    let form3_home_idx = col(&["Form3Home"]);
    let form3_away_idx = col(&["Form3Away"]);
    let form5_home_idx = col(&["Form5Home"]);
    let form5_away_idx = col(&["Form5Away"]);

    let mut matches = Vec::new();
    let mut dropped_dates = 0usize;
    for result in reader.records() {
        let record = result?;
        let date = match record.get(date_idx).and_then(parse_date) {
            Some(date) => date,
            None => {
                dropped_dates += 1;
                continue;
            }
        };
        matches.push(RawMatch {
            date,
            home_team: record.get(home_idx).unwrap_or_default().trim().to_string(),
            away_team: record.get(away_idx).unwrap_or_default().trim().to_string(),
            odd_home: numeric_field(&record, odd_home_idx),
            odd_draw: numeric_field(&record, odd_draw_idx),
            odd_away: numeric_field(&record, odd_away_idx),
            home_elo: numeric_field(&record, home_elo_idx),
            away_elo: numeric_field(&record, away_elo_idx),
            home_shots: numeric_field(&record, home_shots_idx),
            away_shots: numeric_field(&record, away_shots_idx),
            form3_home: numeric_field(&record, form3_home_idx),
            form3_away: numeric_field(&record, form3_away_idx),
            form5_home: numeric_field(&record, form5_home_idx),
            form5_away: numeric_field(&record, form5_away_idx),
        });
    }

    if dropped_dates > 0 {
        tracing::warn!(
            "dropped {} rows with unparseable dates from {}",
            dropped_dates,
            path.display()
        );
    }
    Ok(matches)
}

/// Write a raw match table in the column layout `read_matches_csv` expects.
pub fn write_matches_csv(path: &Path, matches: &[RawMatch]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create match table {}", path.display()))?;

    writer.write_record([
        "MatchDate",
        "HomeTeam",
        "AwayTeam",
        "OddHome",
        "OddDraw",
        "OddAway",
        "HomeElo",
        "AwayElo",
        "HomeTarget",
        "AwayTarget",
        "Form3Home",
        "Form3Away",
        "Form5Home",
        "Form5Away",
    ])?;

    for m in matches {
        writer.write_record(&[
            m.date.format("%Y-%m-%d").to_string(),
            m.home_team.clone(),
            m.away_team.clone(),
            optional_field(m.odd_home),
            optional_field(m.odd_draw),
            optional_field(m.odd_away),
            optional_field(m.home_elo),
            optional_field(m.away_elo),
            optional_field(m.home_shots),
            optional_field(m.away_shots),
            optional_field(m.form3_home),
            optional_field(m.form3_away),
            optional_field(m.form5_home),
            optional_field(m.form5_away),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

fn numeric_field(record: &csv::StringRecord, idx: Option<usize>) -> Option<f64> {
    idx.and_then(|i| record.get(i))
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn optional_field(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

// ── feature table ───────────────────────────────────────────────────────────

pub fn write_feature_table(path: &Path, rows: &[FeatureRow]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create feature table {}", path.display()))?;

    writer.write_record([
        "Date",
        "HomeTeam",
        "AwayTeam",
        "p_target_p2p",
        "OddHome_P2P_Real",
        "Elo_Diff_Norm",
        "Elo_Signed_Sqrt",
        "Adj_Shots_Diff",
        "Form3_Diff",
        "Form5_Diff",
    ])?;

    for row in rows {
        writer.write_record(&[
            row.date.format("%Y-%m-%d").to_string(),
            row.home_team.clone(),
            row.away_team.clone(),
            row.p_target.to_string(),
            row.fair_odd.to_string(),
            row.elo_diff_norm.to_string(),
            row.elo_signed_sqrt.to_string(),
            row.adj_shots_diff.to_string(),
            row.form3_diff.to_string(),
            row.form5_diff.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Read a feature table written by `write_feature_table`. This is our own
/// artifact, so a malformed row is an error, not a silent drop.
pub fn read_feature_table(path: &Path) -> Result<Vec<FeatureRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open feature table {}", path.display()))?;

    let mut rows = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        let row = parse_feature_record(&record)
            .with_context(|| format!("{}: bad feature row at line {}", path.display(), i + 2))?;
        rows.push(row);
    }
    Ok(rows)
}

fn parse_feature_record(record: &csv::StringRecord) -> Result<FeatureRow> {
    let field = |i: usize| -> Result<&str> {
        record
            .get(i)
            .with_context(|| format!("missing column {}", i))
    };
    let number = |i: usize| -> Result<f64> { Ok(field(i)?.trim().parse::<f64>()?) };

    Ok(FeatureRow {
        date: NaiveDate::parse_from_str(field(0)?.trim(), "%Y-%m-%d")?,
        home_team: field(1)?.to_string(),
        away_team: field(2)?.to_string(),
        p_target: number(3)?,
        fair_odd: number(4)?,
        elo_diff_norm: number(5)?,
        elo_signed_sqrt: number(6)?,
        adj_shots_diff: number(7)?,
        form3_diff: number(8)?,
        form5_diff: number(9)?,
    })
}

// ── model artifacts ─────────────────────────────────────────────────────────

/// Persist the artifact triple into `dir`, creating it if needed.
pub fn save_artifacts(
    dir: &Path,
    scaler: &Standardizer,
    model: &LinearModel,
    info: &ModelInfo,
) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create model directory {}", dir.display()))?;
    write_json(&dir.join(SCALER_FILE), scaler)?;
    write_json(&dir.join(MODEL_FILE), model)?;
    write_json(&dir.join(MODEL_INFO_FILE), info)?;
    Ok(())
}

/// Load the artifact triple and check it is internally consistent with the
/// feature contract before anything gets served from it.
pub fn load_artifacts(dir: &Path) -> Result<(Standardizer, LinearModel, ModelInfo)> {
    let scaler: Standardizer = read_json(&dir.join(SCALER_FILE))?;
    let model: LinearModel = read_json(&dir.join(MODEL_FILE))?;
    let info: ModelInfo = read_json(&dir.join(MODEL_INFO_FILE))?;

    if scaler.features != FEATURES_ORDER {
        bail!(
            "scaler in {} was fitted for features {:?}, expected {:?}",
            dir.display(),
            scaler.features,
            FEATURES_ORDER
        );
    }
    ensure!(
        scaler.mean.len() == FEATURES_ORDER.len() && scaler.scale.len() == FEATURES_ORDER.len(),
        "scaler in {} carries {} means and {} scales, expected {}",
        dir.display(),
        scaler.mean.len(),
        scaler.scale.len(),
        FEATURES_ORDER.len()
    );
    ensure!(
        model.coef.len() == FEATURES_ORDER.len(),
        "model in {} carries {} coefficients, expected {}",
        dir.display(),
        model.coef.len(),
        FEATURES_ORDER.len()
    );

    Ok((scaler, model, info))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}
