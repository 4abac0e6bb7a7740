//! Dataset assembler: joins the de-vigorized market target with the
//! temporal features and drops rows that cannot be priced.

use crate::models::{FeatureRow, RawMatch};
use crate::services::devig::devig;
use crate::services::features::{build_appearances, elo_features, RollingIndex};

/// Assembled feature table plus drop accounting
pub struct AssemblyReport {
    pub rows: Vec<FeatureRow>,
    pub dropped_odds: usize,
    pub dropped_features: usize,
}

/// Build the model-ready table from raw matches.
///
/// Matches are processed in chronological order, ties keeping input order.
/// Rows without a usable odds triple are discarded before the appearance
/// series is built, so they contribute no rolling slots. Rows whose Elo
/// inputs or rolling aggregates are missing are dropped after feature
/// computation; form gaps count as zero.
pub fn assemble(matches: &[RawMatch]) -> AssemblyReport {
    let mut ordered: Vec<&RawMatch> = matches.iter().collect();
    ordered.sort_by_key(|m| m.date);

    let mut priced = Vec::with_capacity(ordered.len());
    let mut dropped_odds = 0;
    for m in ordered {
        match devig(m.odd_home, m.odd_draw, m.odd_away) {
            Some(target) => priced.push((m, target)),
            None => dropped_odds += 1,
        }
    }

    let kept: Vec<RawMatch> = priced.iter().map(|(m, _)| (*m).clone()).collect();
    let index = RollingIndex::build(&build_appearances(&kept));

    let mut rows = Vec::with_capacity(priced.len());
    let mut dropped_features = 0;
    for (m, target) in priced {
        let (home_elo, away_elo) = match (m.home_elo, m.away_elo) {
            (Some(h), Some(a)) => (h, a),
            _ => {
                dropped_features += 1;
                continue;
            }
        };
        let rolls = (
            index.as_of(&m.home_team, m.date),
            index.as_of(&m.away_team, m.date),
        );
        let (home_roll, away_roll) = match rolls {
            (Some(h), Some(a)) => (h, a),
            _ => {
                dropped_features += 1;
                continue;
            }
        };

        let (elo_diff_norm, elo_signed_sqrt) = elo_features(home_elo, away_elo);
        rows.push(FeatureRow {
            date: m.date,
            home_team: m.home_team.clone(),
            away_team: m.away_team.clone(),
            p_target: target.p_target,
            fair_odd: target.fair_odd,
            elo_diff_norm,
            elo_signed_sqrt,
            adj_shots_diff: home_roll - away_roll,
            form3_diff: m.form3_home.unwrap_or(0.0) - m.form3_away.unwrap_or(0.0),
            form5_diff: m.form5_home.unwrap_or(0.0) - m.form5_away.unwrap_or(0.0),
        });
    }

    AssemblyReport {
        rows,
        dropped_odds,
        dropped_features,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn fixture(d: u32, home: &str, away: &str, home_shots: f64, away_shots: f64) -> RawMatch {
        RawMatch {
            date: day(d),
            home_team: home.to_string(),
            away_team: away.to_string(),
            odd_home: Some(2.0),
            odd_draw: Some(3.4),
            odd_away: Some(3.8),
            home_elo: Some(1500.0),
            away_elo: Some(1500.0),
            home_shots: Some(home_shots),
            away_shots: Some(away_shots),
            form3_home: Some(6.0),
            form3_away: Some(3.0),
            form5_home: Some(9.0),
            form5_away: Some(6.0),
        }
    }

    #[test]
    fn test_assemble_drops_rows_with_short_history() {
        // constant shot counts so each rolling mean equals the team constant
        let matches = vec![
            fixture(1, "A", "B", 2.0, 4.0),
            fixture(2, "C", "A", 6.0, 2.0),
            fixture(3, "B", "C", 4.0, 6.0),
            fixture(4, "A", "B", 2.0, 4.0),
            fixture(5, "C", "A", 6.0, 2.0), // C has only 2 prior appearances
            fixture(6, "B", "C", 4.0, 6.0),
            fixture(7, "A", "B", 2.0, 4.0),
        ];
        let report = assemble(&matches);

        assert_eq!(report.dropped_odds, 0);
        assert_eq!(report.dropped_features, 5);
        assert_eq!(report.rows.len(), 2);

        let first = &report.rows[0];
        assert_eq!(first.date, day(6));
        assert_eq!(first.home_team, "B");
        assert!((first.adj_shots_diff - (4.0 - 6.0)).abs() < 1e-12);

        let second = &report.rows[1];
        assert_eq!(second.date, day(7));
        assert!((second.adj_shots_diff - (2.0 - 4.0)).abs() < 1e-12);

        // target and reporting fields flow straight from the odds triple
        let expected_p = 0.5 / (0.5 + 1.0 / 3.8);
        assert!((first.p_target - expected_p).abs() < 1e-9);
        assert!((first.fair_odd - 1.0 / expected_p).abs() < 1e-9);
        assert!(first.elo_diff_norm.abs() < 1e-12);
        assert!((first.form3_diff - 3.0).abs() < 1e-12);
        assert!((first.form5_diff - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_assemble_unpriced_rows_leave_no_appearance_slots() {
        // A's shot counts 1,2,3 then a poisoned 100 on a row with no odds
        let mut matches = vec![
            fixture(1, "A", "B", 1.0, 0.0),
            fixture(2, "A", "B", 2.0, 0.0),
            fixture(3, "A", "B", 3.0, 0.0),
            fixture(4, "A", "B", 100.0, 0.0),
            fixture(5, "A", "B", 5.0, 0.0),
        ];
        matches[3].odd_home = None;

        let report = assemble(&matches);
        assert_eq!(report.dropped_odds, 1);
        assert_eq!(report.rows.len(), 1);

        // the day-5 rolling mean sees 1,2,3 only; 100 never entered a slot
        let row = &report.rows[0];
        assert_eq!(row.date, day(5));
        assert!((row.adj_shots_diff - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_assemble_orders_chronologically_with_stable_ties() {
        // two disjoint pairs meet three times, then both play on day 5;
        // input arrives shuffled with the C-D tie listed first
        let matches = vec![
            fixture(5, "C", "D", 6.0, 8.0),
            fixture(5, "A", "B", 2.0, 4.0),
            fixture(2, "A", "B", 2.0, 4.0),
            fixture(1, "C", "D", 6.0, 8.0),
            fixture(1, "A", "B", 2.0, 4.0),
            fixture(3, "C", "D", 6.0, 8.0),
            fixture(3, "A", "B", 2.0, 4.0),
            fixture(2, "C", "D", 6.0, 8.0),
        ];
        let report = assemble(&matches);

        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].home_team, "C");
        assert_eq!(report.rows[1].home_team, "A");
        assert!(report.rows[0].date <= report.rows[1].date);
    }

    #[test]
    fn test_assemble_missing_elo_drops_row_and_missing_form_counts_zero() {
        let mut matches: Vec<RawMatch> = (1..=5)
            .map(|d| fixture(d, "A", "B", 2.0, 4.0))
            .collect();
        matches[4].home_elo = None;

        let report = assemble(&matches);
        // day 5 has enough history but its Elo input is gone; day 4 is the
        // first row where both teams reach three prior appearances
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].date, day(4));
        assert_eq!(report.dropped_features, 4);

        // same fixture with Elo intact but a form gap prices fine
        let mut matches: Vec<RawMatch> = (1..=5)
            .map(|d| fixture(d, "A", "B", 2.0, 4.0))
            .collect();
        matches[4].form3_home = None;

        let report = assemble(&matches);
        assert_eq!(report.rows.len(), 2);
        assert!((report.rows[0].form3_diff - 3.0).abs() < 1e-12);
        // the day-5 gap counts as zero for the home side
        assert!((report.rows[1].form3_diff + 3.0).abs() < 1e-12);
    }
}
