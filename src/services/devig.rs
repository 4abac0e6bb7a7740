//! Market probability normalizer: strips the bookmaker margin from a
//! three-way odds triple and folds the result into a two-outcome target.

/// De-vigorized two-outcome target derived from one odds triple
#[derive(Debug, Clone, Copy)]
pub struct MarketTarget {
    /// Market-implied home-win probability, strictly in (0, 1)
    pub p_target: f64,
    /// Fair decimal odd implied by `p_target`
    pub fair_odd: f64,
}

/// Convert (home, draw, away) decimal odds into the de-vigorized home-win
/// probability. Each odd becomes an implied probability (reciprocal), the
/// three are renormalized to remove the margin, and the draw mass is folded
/// into a two-way split:
///
///   p_target = p_home_norm / (p_home_norm + p_away_norm)
///
/// Returns None when any odd is missing, non-finite, or non-positive, or
/// when the quote is so extreme the folded probability leaves (0, 1); rows
/// with no usable market quote are dropped, never repaired.
pub fn devig(
    odd_home: Option<f64>,
    odd_draw: Option<f64>,
    odd_away: Option<f64>,
) -> Option<MarketTarget> {
    let (home, draw, away) = (odd_home?, odd_draw?, odd_away?);
    if !home.is_finite() || !draw.is_finite() || !away.is_finite() {
        return None;
    }
    if home <= 0.0 || draw <= 0.0 || away <= 0.0 {
        return None;
    }

    let p_h = 1.0 / home;
    let p_d = 1.0 / draw;
    let p_a = 1.0 / away;

    let total = p_h + p_d + p_a;
    let p_h_norm = p_h / total;
    let p_a_norm = p_a / total;

    let p_target = p_h_norm / (p_h_norm + p_a_norm);

    // reciprocals of extreme quotes can overflow or underflow; the folded
    // probability must stay strictly inside (0, 1)
    if !p_target.is_finite() || p_target <= 0.0 || p_target >= 1.0 {
        return None;
    }

    Some(MarketTarget {
        p_target,
        fair_odd: 1.0 / p_target,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_devig_even_home_favourite() {
        // 2.00 / 3.40 / 3.80 is a standard home-favourite line
        let target = devig(Some(2.00), Some(3.40), Some(3.80)).unwrap();
        let expected = 0.5 / (0.5 + 1.0 / 3.80);
        assert!((target.p_target - expected).abs() < 1e-9);
        assert!((target.p_target - 0.6552).abs() < 1e-4);
        assert!(target.p_target > 0.5, "home should be favoured");
    }

    #[test]
    fn test_devig_output_in_open_unit_interval() {
        let triples = [
            (1.01, 15.0, 41.0),
            (2.5, 3.2, 2.9),
            (11.0, 6.5, 1.22),
            (1.5, 4.0, 7.0),
        ];
        for (h, d, a) in triples {
            let target = devig(Some(h), Some(d), Some(a)).unwrap();
            assert!(
                target.p_target > 0.0 && target.p_target < 1.0,
                "p_target out of range for odds ({}, {}, {})",
                h,
                d,
                a
            );
            assert!((target.fair_odd - 1.0 / target.p_target).abs() < 1e-12);
        }
    }

    #[test]
    fn test_devig_symmetric_line_is_even() {
        let target = devig(Some(3.0), Some(3.4), Some(3.0)).unwrap();
        assert!((target.p_target - 0.5).abs() < 1e-12);
        assert!((target.fair_odd - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_devig_rejects_missing_odds() {
        assert!(devig(None, Some(3.4), Some(3.8)).is_none());
        assert!(devig(Some(2.0), None, Some(3.8)).is_none());
        assert!(devig(Some(2.0), Some(3.4), None).is_none());
    }

    #[test]
    fn test_devig_rejects_non_positive_and_non_finite_odds() {
        assert!(devig(Some(0.0), Some(3.4), Some(3.8)).is_none());
        assert!(devig(Some(2.0), Some(-3.4), Some(3.8)).is_none());
        assert!(devig(Some(2.0), Some(3.4), Some(f64::INFINITY)).is_none());
        assert!(devig(Some(f64::NAN), Some(3.4), Some(3.8)).is_none());
    }

    #[test]
    fn test_devig_rejects_quotes_that_overflow_the_fold() {
        // a subnormal odd passes the positivity check but its reciprocal
        // is infinite, degenerating the normalization to NaN
        assert!(devig(Some(1e-310), Some(3.4), Some(3.8)).is_none());
        assert!(devig(Some(2.0), Some(3.4), Some(1e-310)).is_none());
        // an underflowing away share would pin the fold at exactly 1
        assert!(devig(Some(1e-308), Some(3.4), Some(f64::MAX)).is_none());
    }
}
