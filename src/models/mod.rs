use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Canonical feature order. Load-bearing: training fits, artifacts persist,
/// and the API scores in exactly this order.
pub const FEATURES_ORDER: [&str; 5] = [
    "Elo_Diff_Norm",
    "Elo_Signed_Sqrt",
    "Adj_Shots_Diff",
    "Form3_Diff",
    "Form5_Diff",
];

/// One historical fixture as it arrives in the raw match CSV.
/// Numeric fields that failed coercion come through as None.
#[derive(Debug, Clone)]
pub struct RawMatch {
    pub date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    pub odd_home: Option<f64>,
    pub odd_draw: Option<f64>,
    pub odd_away: Option<f64>,
    pub home_elo: Option<f64>,
    pub away_elo: Option<f64>,
    pub home_shots: Option<f64>,
    pub away_shots: Option<f64>,
    pub form3_home: Option<f64>,
    pub form3_away: Option<f64>,
    pub form5_home: Option<f64>,
    pub form5_away: Option<f64>,
}

/// One team's slot in the concatenated appearance series (two per match).
/// `adj_shots` is None when the underlying shot or Elo input was missing;
/// the slot still occupies a rolling-window position.
#[derive(Debug, Clone)]
pub struct TeamAppearance {
    pub team: String,
    pub date: NaiveDate,
    pub adj_shots: Option<f64>,
}

/// One assembled row of the model-ready feature table
#[derive(Debug, Clone)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    /// De-vigorized market-implied home-win probability
    pub p_target: f64,
    /// Fair decimal odd implied by `p_target`
    pub fair_odd: f64,
    pub elo_diff_norm: f64,
    pub elo_signed_sqrt: f64,
    pub adj_shots_diff: f64,
    pub form3_diff: f64,
    pub form5_diff: f64,
}

impl FeatureRow {
    /// Feature values in FEATURES_ORDER
    pub fn features(&self) -> [f64; 5] {
        [
            self.elo_diff_norm,
            self.elo_signed_sqrt,
            self.adj_shots_diff,
            self.form3_diff,
            self.form5_diff,
        ]
    }
}

/// Per-feature standardization fitted on the training prefix only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Standardizer {
    pub features: Vec<String>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl Standardizer {
    /// Apply the fitted transform to one feature vector in FEATURES_ORDER
    pub fn transform(&self, raw: &[f64; 5]) -> [f64; 5] {
        let mut scaled = [0.0; 5];
        for (i, value) in raw.iter().enumerate() {
            scaled[i] = (value - self.mean[i]) / self.scale[i];
        }
        scaled
    }
}

/// Elastic-net coefficients in standardized feature space
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    pub coef: Vec<f64>,
    pub intercept: f64,
    pub alpha: f64,
    pub l1_ratio: f64,
}

impl LinearModel {
    /// Predicted log-odds for one standardized feature vector
    pub fn predict_logit(&self, scaled: &[f64; 5]) -> f64 {
        self.intercept
            + self
                .coef
                .iter()
                .zip(scaled.iter())
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }
}

/// Metadata document persisted alongside the model and scaler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model: String,
    pub features: Vec<String>,
    pub train_size: usize,
    pub test_size: usize,
    pub mae: f64,
    pub log_loss: f64,
    pub odds_error: f64,
}
