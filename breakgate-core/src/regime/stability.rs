//! Regime stability confirmation over a dated history of daily labels.

use super::Regime;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identical consecutive labels needed before a regime is trusted.
pub const STABILITY_DAYS: usize = 3;
/// Window for the recent-flip check.
pub const FLIP_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRegime {
    pub date: NaiveDate,
    pub regime: Regime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegimeState {
    pub regime: Regime,
    pub consecutive_days: usize,
    pub stable: bool,
}

fn newest_first(history: &[DailyRegime]) -> Vec<DailyRegime> {
    let mut sorted = history.to_vec();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted
}

/// Count identical labels from the newest entry back. At least `required`
/// gives the actual regime; fewer gives CHOP, unstable.
pub fn confirm(history: &[DailyRegime], required: usize) -> RegimeState {
    let sorted = newest_first(history);
    let Some(latest) = sorted.first() else {
        return RegimeState {
            regime: Regime::Chop,
            consecutive_days: 0,
            stable: false,
        };
    };
    let consecutive_days = sorted
        .iter()
        .take_while(|d| d.regime == latest.regime)
        .count();

    if consecutive_days >= required {
        RegimeState {
            regime: latest.regime,
            consecutive_days,
            stable: true,
        }
    } else {
        RegimeState {
            regime: Regime::Chop,
            consecutive_days,
            stable: false,
        }
    }
}

/// Whether the label changed anywhere within the newest `entries` readings.
pub fn regime_flipped_recently(history: &[DailyRegime], entries: usize) -> bool {
    let sorted = newest_first(history);
    let recent = &sorted[..entries.min(sorted.len())];
    recent.windows(2).any(|w| w[0].regime != w[1].regime)
}
