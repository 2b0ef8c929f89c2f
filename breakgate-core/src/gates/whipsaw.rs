use super::{Gate, GateContext, GateVerdict};
use crate::domain::ExitReason;
use chrono::{Datelike, Duration, NaiveDate};

/// Serial stop-outs on the same ticker lock it out for a penalty period.
///
/// Stops are counted over a trailing window that excludes the current ISO
/// week, so a stop-out this week does not count until next week. The
/// penalty runs from the latest qualifying stop, even after that stop has
/// left today's lookback.
#[derive(Debug, Clone)]
pub struct WhipsawGate {
    pub lookback_days: i64,
    pub trigger_count: usize,
    pub penalty_days: i64,
}

impl Default for WhipsawGate {
    fn default() -> Self {
        Self {
            lookback_days: 30,
            trigger_count: 2,
            penalty_days: 60,
        }
    }
}

impl Gate for WhipsawGate {
    fn name(&self) -> &'static str {
        "whipsaw"
    }

    fn evaluate(&self, ctx: &GateContext<'_>) -> GateVerdict {
        let name = self.name();
        let Some(candidate) = ctx.candidate() else {
            return GateVerdict::not_applicable(name, "candidate-only gate");
        };
        let today = ctx.today;
        let this_week = today.iso_week();

        let mut stops: Vec<_> = ctx
            .closed_positions
            .iter()
            .filter(|p| p.ticker == candidate.ticker)
            .filter_map(|p| p.exit())
            .filter(|e| e.reason == ExitReason::StopHit)
            .map(|e| e.date)
            .filter(|d| *d <= today && d.iso_week() != this_week)
            .collect();
        stops.sort();

        let Some((latest, count)) = self.latest_qualifying_stop(&stops) else {
            let recent = stops
                .iter()
                .filter(|d| **d >= today - Duration::days(self.lookback_days))
                .count();
            return GateVerdict::pass(
                name,
                format!("{recent} stop-outs in {}d", self.lookback_days),
            );
        };
        let until = latest + Duration::days(self.penalty_days);
        if today < until {
            GateVerdict::block(
                name,
                format!(
                    "WHIPSAW: {count} stop-outs in {}d, blocked until {until}",
                    self.lookback_days
                ),
            )
        } else {
            GateVerdict::pass(name, format!("whipsaw penalty expired {until}"))
        }
    }
}

impl WhipsawGate {
    /// Most recent stop that closes a run of `trigger_count` stops inside
    /// one lookback window, with the size of that run. `stops` is sorted.
    fn latest_qualifying_stop(&self, stops: &[NaiveDate]) -> Option<(NaiveDate, usize)> {
        stops.iter().enumerate().rev().find_map(|(i, last)| {
            let window_start = *last - Duration::days(self.lookback_days);
            let count = stops[..=i].iter().filter(|d| **d >= window_start).count();
            (count >= self.trigger_count).then_some((*last, count))
        })
    }
}
