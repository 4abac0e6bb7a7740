use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::models::{LinearModel, ModelInfo, Standardizer};
use crate::store;
use crate::utils::{clamp_probability, probability_to_odds, round_dp, sigmoid};

/// Artifacts loaded once at startup and shared read-only across requests
pub struct LoadedArtifacts {
    pub scaler: Standardizer,
    pub model: LinearModel,
    pub info: ModelInfo,
}

/// Service state: either a loaded artifact triple or a degraded placeholder
/// that keeps answering health checks
pub struct ModelState {
    loaded: Option<LoadedArtifacts>,
}

pub type SharedState = Arc<ModelState>;

impl ModelState {
    /// Load the artifact triple, or start degraded when it is missing or
    /// corrupt. Replacing the artifacts requires a restart.
    pub fn load_or_degraded(model_dir: &Path) -> Self {
        match store::load_artifacts(model_dir) {
            Ok((scaler, model, info)) => {
                tracing::info!(
                    "model loaded from {} ({} features, trained on {} rows)",
                    model_dir.display(),
                    info.features.len(),
                    info.train_size
                );
                ModelState {
                    loaded: Some(LoadedArtifacts {
                        scaler,
                        model,
                        info,
                    }),
                }
            }
            Err(e) => {
                tracing::error!(
                    "failed to load model from {}: {:#}; serving in degraded mode",
                    model_dir.display(),
                    e
                );
                ModelState { loaded: None }
            }
        }
    }

    fn artifacts(&self) -> Result<&LoadedArtifacts, ApiError> {
        self.loaded.as_ref().ok_or(ApiError::ModelUnavailable)
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("model artifacts are not loaded")]
    ModelUnavailable,
    #[error("feature {0} must be a finite number")]
    NonFiniteFeature(&'static str),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::NonFiniteFeature(_) => StatusCode::UNPROCESSABLE_ENTITY,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Prediction request: the five model features under their canonical names,
/// with the lower-camel variants older clients send accepted as aliases
#[derive(Debug, Deserialize)]
pub struct MatchFeatures {
    #[serde(rename = "Elo_Diff_Norm", alias = "elo_Diff_Norm")]
    pub elo_diff_norm: f64,
    #[serde(rename = "Elo_Signed_Sqrt", alias = "elo_Signed_Sqrt")]
    pub elo_signed_sqrt: f64,
    #[serde(rename = "Adj_Shots_Diff", alias = "adj_Shots_Diff")]
    pub adj_shots_diff: f64,
    #[serde(rename = "Form3_Diff", alias = "form3_Diff")]
    pub form3_diff: f64,
    #[serde(rename = "Form5_Diff", alias = "form5_Diff")]
    pub form5_diff: f64,
}

impl MatchFeatures {
    fn validated(&self) -> Result<[f64; 5], ApiError> {
        let named = [
            ("Elo_Diff_Norm", self.elo_diff_norm),
            ("Elo_Signed_Sqrt", self.elo_signed_sqrt),
            ("Adj_Shots_Diff", self.adj_shots_diff),
            ("Form3_Diff", self.form3_diff),
            ("Form5_Diff", self.form5_diff),
        ];
        for (name, value) in named {
            if !value.is_finite() {
                return Err(ApiError::NonFiniteFeature(name));
            }
        }
        Ok([
            self.elo_diff_norm,
            self.elo_signed_sqrt,
            self.adj_shots_diff,
            self.form3_diff,
            self.form5_diff,
        ])
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_loaded: bool,
}

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub home_win_prob: f64,
    pub away_win_prob: f64,
    pub fair_odd_home: f64,
    pub fair_odd_away: f64,
}

pub async fn serve(port: u16, model_dir: &Path) -> anyhow::Result<()> {
    let state = Arc::new(ModelState::load_or_degraded(model_dir));

    let app = create_router().with_state(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    tracing::info!("fairline pricing service listening on port {}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

fn create_router() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/model-info", get(model_info_handler))
        .route("/predict", post(predict_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

// GET /health - liveness plus whether the model is usable
async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let loaded = state.loaded.is_some();
    Json(HealthResponse {
        status: if loaded { "ok" } else { "error" },
        model_loaded: loaded,
    })
}

// GET /model-info - training metadata for the loaded model
async fn model_info_handler(State(state): State<SharedState>) -> Result<Json<ModelInfo>, ApiError> {
    let artifacts = state.artifacts()?;
    Ok(Json(artifacts.info.clone()))
}

// POST /predict - price one match from its feature vector
async fn predict_handler(
    State(state): State<SharedState>,
    Json(request): Json<MatchFeatures>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let features = request.validated()?;
    let artifacts = state.artifacts()?;
    Ok(Json(price_match(artifacts, &features)))
}

/// Scale, score and clamp, then fold the home probability into a two-way
/// price pair
fn price_match(artifacts: &LoadedArtifacts, features: &[f64; 5]) -> PredictionResponse {
    let scaled = artifacts.scaler.transform(features);
    let p_home = clamp_probability(sigmoid(artifacts.model.predict_logit(&scaled)));
    let p_away = 1.0 - p_home;
    PredictionResponse {
        home_win_prob: round_dp(p_home, 4),
        away_win_prob: round_dp(p_away, 4),
        fair_odd_home: round_dp(probability_to_odds(p_home), 2),
        fair_odd_away: round_dp(probability_to_odds(p_away), 2),
    }
}
