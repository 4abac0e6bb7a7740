/// Numeric floor applied to probabilities before any logarithm or division.
/// Probabilities live in [PROB_EPS, 1 - PROB_EPS] everywhere downstream.
pub const PROB_EPS: f64 = 1e-6;

/// Logistic function mapping log-odds to a probability
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Log-odds of a probability; callers clamp away from 0 and 1 first
pub fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

/// Clamp a probability into the open unit interval
pub fn clamp_probability(p: f64) -> f64 {
    p.clamp(PROB_EPS, 1.0 - PROB_EPS)
}

/// Signed square root: compresses magnitude while preserving sign
pub fn signed_sqrt(x: f64) -> f64 {
    x.signum() * x.abs().sqrt()
}

/// Round to a fixed number of decimal places
pub fn round_dp(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Convert a probability to a decimal fair odd
pub fn probability_to_odds(probability: f64) -> f64 {
    1.0 / clamp_probability(probability)
}
