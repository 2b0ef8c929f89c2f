//! Weekly resampling and weekly trend confirmation.

use crate::domain::Bar;
use chrono::Datelike;
use serde::{Deserialize, Serialize};

const WEEKLY_MA: usize = 10;
const MIN_WEEKS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeeklyTrend {
    Up,
    Down,
    Neutral,
}

/// Last close of each ISO week, oldest first.
pub fn weekly_closes(bars: &[Bar]) -> Vec<f64> {
    let mut out: Vec<f64> = Vec::new();
    let mut current_week = None;
    for bar in bars {
        let iso = bar.date.iso_week();
        let key = (iso.year(), iso.week());
        if current_week == Some(key) {
            if let Some(last) = out.last_mut() {
                *last = bar.close;
            }
        } else {
            current_week = Some(key);
            out.push(bar.close);
        }
    }
    out
}

/// Up when the latest weekly close sits above a rising 10-week SMA, Down
/// when below a falling one. `None` with fewer than 12 weeks of history.
pub fn weekly_trend(bars: &[Bar]) -> Option<WeeklyTrend> {
    let weeks = weekly_closes(bars);
    if weeks.len() < MIN_WEEKS {
        return None;
    }
    let ma = super::sma::rolling_mean(&weeks, WEEKLY_MA);
    let now = super::valid_at_offset(&ma, 0)?;
    let prev = super::valid_at_offset(&ma, 1)?;
    let close = *weeks.last()?;
    let trend = if close > now && now > prev {
        WeeklyTrend::Up
    } else if close < now && now < prev {
        WeeklyTrend::Down
    } else {
        WeeklyTrend::Neutral
    };
    Some(trend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn resamples_by_iso_week() {
        // 2024-01-02 is a Tuesday: six days in week 1, then week 2
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        let weeks = weekly_closes(&bars);
        assert_eq!(weeks, vec![6.0, 8.0]);
    }

    #[test]
    fn needs_twelve_weeks() {
        let closes: Vec<f64> = (0..70).map(|i| 100.0 + i as f64).collect();
        // 70 calendar days = 11 ISO weeks
        assert_eq!(weekly_trend(&make_bars(&closes)), None);
    }

    #[test]
    fn rising_and_falling() {
        let up: Vec<f64> = (0..120).map(|i| 100.0 + i as f64).collect();
        assert_eq!(weekly_trend(&make_bars(&up)), Some(WeeklyTrend::Up));
        let down: Vec<f64> = (0..120).map(|i| 300.0 - i as f64).collect();
        assert_eq!(weekly_trend(&make_bars(&down)), Some(WeeklyTrend::Down));
    }
}
