//! Logit-space trainer: chronological split, train-prefix standardization,
//! cyclic coordinate-descent elastic net, probability- and odds-space
//! evaluation of the held-out suffix.

use anyhow::{ensure, Result};
use chrono::NaiveDate;
use nalgebra::{DMatrix, DVector};
use statrs::statistics::Statistics;

use crate::models::{FeatureRow, LinearModel, ModelInfo, Standardizer, FEATURES_ORDER};
use crate::utils::{clamp_probability, logit, sigmoid};

/// Held-out suffix length used when none is configured
pub const DEFAULT_TEST_SIZE: usize = 5000;
/// Elastic-net regularization strength
pub const ALPHA: f64 = 0.01;
/// Share of the penalty assigned to L1
pub const L1_RATIO: f64 = 0.2;
/// Coordinate-descent sweep cap
pub const MAX_ITER: usize = 10_000;
/// Fair odds at or above this are ignored by the odds-space metric
pub const ODDS_ERROR_CAP: f64 = 20.0;

const TOL: f64 = 1e-7;

/// Everything a training run produces: the artifact triple plus the
/// held-out predictions for reporting
pub struct TrainReport {
    pub scaler: Standardizer,
    pub model: LinearModel,
    pub info: ModelInfo,
    pub holdout: Vec<HoldoutPrediction>,
}

/// One held-out match scored by the freshly fitted model
pub struct HoldoutPrediction {
    pub date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    pub market_odd: f64,
    pub model_odd: f64,
    pub model_prob: f64,
}

/// Fit the pricing model on the chronological prefix of `rows` and evaluate
/// on the trailing `test_size` rows. Rows are stable-sorted by date first,
/// so the holdout is always the newest block regardless of input order.
pub fn train(rows: &[FeatureRow], test_size: usize) -> Result<TrainReport> {
    ensure!(test_size > 0, "held-out size must be positive");
    ensure!(
        rows.len() > test_size,
        "dataset has {} rows, cannot hold out {}",
        rows.len(),
        test_size
    );

    let mut rows: Vec<FeatureRow> = rows.to_vec();
    rows.sort_by_key(|r| r.date);

    let split = rows.len() - test_size;
    let (train_rows, test_rows) = rows.split_at(split);

    let scaler = fit_standardizer(train_rows);

    let x_train = design_matrix(train_rows, &scaler);
    let y_train = DVector::from_iterator(
        train_rows.len(),
        train_rows
            .iter()
            .map(|r| logit(clamp_probability(r.p_target))),
    );

    let (coef, intercept) = elastic_net(&x_train, &y_train, ALPHA, L1_RATIO, MAX_ITER);
    let model = LinearModel {
        coef,
        intercept,
        alpha: ALPHA,
        l1_ratio: L1_RATIO,
    };

    // score the held-out suffix exactly the way the service will
    let mut holdout = Vec::with_capacity(test_rows.len());
    for row in test_rows {
        let scaled = scaler.transform(&row.features());
        let prob = sigmoid(model.predict_logit(&scaled));
        holdout.push(HoldoutPrediction {
            date: row.date,
            home_team: row.home_team.clone(),
            away_team: row.away_team.clone(),
            market_odd: row.fair_odd,
            model_odd: 1.0 / prob,
            model_prob: prob,
        });
    }

    let truth: Vec<f64> = test_rows.iter().map(|r| r.p_target).collect();
    let probs: Vec<f64> = holdout.iter().map(|h| h.model_prob).collect();

    let info = ModelInfo {
        model: "ElasticNet(log-odds)".to_string(),
        features: FEATURES_ORDER.iter().map(|s| s.to_string()).collect(),
        train_size: train_rows.len(),
        test_size: test_rows.len(),
        mae: mean_absolute_error(&truth, &probs),
        log_loss: continuous_log_loss(&truth, &probs),
        odds_error: masked_odds_error(&holdout),
    };

    Ok(TrainReport {
        scaler,
        model,
        info,
        holdout,
    })
}

/// Per-feature mean and population standard deviation over the training
/// prefix; a zero-variance feature keeps scale 1 so it passes through
fn fit_standardizer(rows: &[FeatureRow]) -> Standardizer {
    let mut mean = Vec::with_capacity(FEATURES_ORDER.len());
    let mut scale = Vec::with_capacity(FEATURES_ORDER.len());
    for j in 0..FEATURES_ORDER.len() {
        let column: Vec<f64> = rows.iter().map(|r| r.features()[j]).collect();
        mean.push(column.iter().mean());
        let sd = column.iter().population_std_dev();
        scale.push(if sd == 0.0 { 1.0 } else { sd });
    }
    Standardizer {
        features: FEATURES_ORDER.iter().map(|s| s.to_string()).collect(),
        mean,
        scale,
    }
}

fn design_matrix(rows: &[FeatureRow], scaler: &Standardizer) -> DMatrix<f64> {
    DMatrix::from_fn(rows.len(), FEATURES_ORDER.len(), |i, j| {
        scaler.transform(&rows[i].features())[j]
    })
}

/// Cyclic coordinate descent for the elastic-net objective
///
///   (1/2n)·||y - Xw - b||² + alpha·l1_ratio·||w||₁
///                          + (alpha·(1 - l1_ratio)/2)·||w||²
///
/// X and y are centered first so the intercept stays unpenalized; sweeps
/// stop once the largest coefficient update falls below tolerance. The
/// cyclic order makes the fit fully deterministic.
pub(crate) fn elastic_net(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    alpha: f64,
    l1_ratio: f64,
    max_iter: usize,
) -> (Vec<f64>, f64) {
    let n = x.nrows() as f64;
    let p = x.ncols();

    let x_mean = DVector::from_iterator(p, (0..p).map(|j| x.column(j).mean()));
    let y_mean = y.mean();

    let xc = DMatrix::from_fn(x.nrows(), p, |i, j| x[(i, j)] - x_mean[j]);
    let yc = y.add_scalar(-y_mean);

    let col_norm: Vec<f64> = (0..p).map(|j| xc.column(j).norm_squared() / n).collect();

    let l1_penalty = alpha * l1_ratio;
    let l2_penalty = alpha * (1.0 - l1_ratio);

    let mut w = DVector::<f64>::zeros(p);
    let mut residual = yc;

    for _ in 0..max_iter {
        let mut max_delta = 0.0_f64;
        for j in 0..p {
            let xj = xc.column(j);
            let rho = xj.dot(&residual) / n + col_norm[j] * w[j];
            let updated = soft_threshold(rho, l1_penalty) / (col_norm[j] + l2_penalty);
            let delta = updated - w[j];
            if delta != 0.0 {
                residual.axpy(-delta, &xj, 1.0);
                w[j] = updated;
                max_delta = max_delta.max(delta.abs());
            }
        }
        if max_delta < TOL {
            break;
        }
    }

    let intercept = y_mean - x_mean.dot(&w);
    (w.iter().copied().collect(), intercept)
}

fn soft_threshold(value: f64, threshold: f64) -> f64 {
    if value > threshold {
        value - threshold
    } else if value < -threshold {
        value + threshold
    } else {
        0.0
    }
}

pub(crate) fn mean_absolute_error(truth: &[f64], pred: &[f64]) -> f64 {
    truth
        .iter()
        .zip(pred)
        .map(|(t, p)| (t - p).abs())
        .sum::<f64>()
        / truth.len() as f64
}

/// Soft-label log loss against the continuous market target, predictions
/// clipped away from 0 and 1 first
pub(crate) fn continuous_log_loss(truth: &[f64], pred: &[f64]) -> f64 {
    let total: f64 = truth
        .iter()
        .zip(pred)
        .map(|(t, p)| {
            let p = clamp_probability(*p);
            t * p.ln() + (1.0 - t) * (1.0 - p).ln()
        })
        .sum();
    -total / truth.len() as f64
}

/// Mean absolute fair-odd error over rows priced under the sanity cap;
/// long-shot lines would otherwise dominate the average
fn masked_odds_error(holdout: &[HoldoutPrediction]) -> f64 {
    let errors: Vec<f64> = holdout
        .iter()
        .filter(|h| h.market_odd < ODDS_ERROR_CAP)
        .map(|h| (h.model_odd - h.market_odd).abs())
        .collect();
    if errors.is_empty() {
        tracing::warn!(
            "no held-out fair odd under {}, odds error reported as 0",
            ODDS_ERROR_CAP
        );
        return 0.0;
    }
    errors.iter().mean()
}
