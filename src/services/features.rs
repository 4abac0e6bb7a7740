//! Temporal feature builder: Elo-derived features and leakage-free rolling
//! adjusted-shot aggregates, re-attached to matches by as-of lookup.

use std::collections::HashMap;

use chrono::NaiveDate;
use statrs::statistics::Statistics;

use crate::models::{RawMatch, TeamAppearance};
use crate::utils::signed_sqrt;

/// Trailing window length, in appearance slots
pub const ROLLING_WINDOW: usize = 10;
/// Present values required inside the window before an aggregate is emitted
pub const MIN_WINDOW_VALUES: usize = 3;
/// League-average Elo used to scale opponent strength
pub const AVG_ELO: f64 = 1500.0;

/// Opponent-strength-adjusted offensive output for one side of one match
pub fn adjusted_shots(shots: Option<f64>, opponent_elo: Option<f64>) -> Option<f64> {
    Some(shots? * (opponent_elo? / AVG_ELO))
}

/// Elo gap features: normalized difference and its signed square root
pub fn elo_features(home_elo: f64, away_elo: f64) -> (f64, f64) {
    let diff_norm = (home_elo - away_elo) / 400.0;
    (diff_norm, signed_sqrt(diff_norm))
}

/// Two appearances per match (home side first), stably sorted by date so
/// same-date slots keep input order
pub fn build_appearances(matches: &[RawMatch]) -> Vec<TeamAppearance> {
    let mut appearances = Vec::with_capacity(matches.len() * 2);
    for m in matches {
        appearances.push(TeamAppearance {
            team: m.home_team.clone(),
            date: m.date,
            adj_shots: adjusted_shots(m.home_shots, m.away_elo),
        });
    }
    for m in matches {
        appearances.push(TeamAppearance {
            team: m.away_team.clone(),
            date: m.date,
            adj_shots: adjusted_shots(m.away_shots, m.home_elo),
        });
    }
    appearances.sort_by_key(|a| a.date);
    appearances
}

/// Per-team rolling aggregates laid out for as-of lookup.
///
/// Each team's appearance slots are kept in date order; the value stored at
/// a slot is the rolling mean over the slots strictly before it (one-step
/// shift), so looking up a match's own slot can never see that match's
/// statistic or anything later.
pub struct RollingIndex {
    by_team: HashMap<String, Vec<(NaiveDate, Option<f64>)>>,
}

impl RollingIndex {
    /// Build the index from a date-sorted appearance series
    pub fn build(appearances: &[TeamAppearance]) -> Self {
        let mut grouped: HashMap<String, Vec<(NaiveDate, Option<f64>)>> = HashMap::new();
        for appearance in appearances {
            grouped
                .entry(appearance.team.clone())
                .or_default()
                .push((appearance.date, appearance.adj_shots));
        }

        let mut by_team = HashMap::with_capacity(grouped.len());
        for (team, slots) in grouped {
            let values: Vec<Option<f64>> = slots.iter().map(|(_, v)| *v).collect();
            let rolled = slots
                .into_iter()
                .enumerate()
                .map(|(i, (date, _))| (date, rolling_mean(&values[..i])))
                .collect();
            by_team.insert(team, rolled);
        }
        Self { by_team }
    }

    /// Most recent rolling value for `team` dated at or before `date`.
    /// None when the team has no slot that early or too little history.
    pub fn as_of(&self, team: &str, date: NaiveDate) -> Option<f64> {
        let slots = self.by_team.get(team)?;
        let end = slots.partition_point(|(slot_date, _)| *slot_date <= date);
        if end == 0 {
            None
        } else {
            slots[end - 1].1
        }
    }
}

/// Mean of the present values among the last ROLLING_WINDOW prior slots.
/// A missing value occupies a slot but contributes nothing; fewer than
/// MIN_WINDOW_VALUES present values yields no aggregate.
fn rolling_mean(prior: &[Option<f64>]) -> Option<f64> {
    let start = prior.len().saturating_sub(ROLLING_WINDOW);
    let window: Vec<f64> = prior[start..].iter().flatten().copied().collect();
    if window.len() < MIN_WINDOW_VALUES {
        None
    } else {
        Some(window.iter().mean())
    }
}
