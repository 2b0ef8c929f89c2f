use crate::domain::Bar;

/// Sort ascending by date, keep the last bar for each duplicated date and
/// drop void or malformed bars.
pub fn normalize_bars(mut bars: Vec<Bar>) -> Vec<Bar> {
    // Stable sort keeps provider order within a date, so "last" is the
    // latest bar the provider sent for it.
    bars.sort_by_key(|b| b.date);
    let mut out: Vec<Bar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match out.last_mut() {
            Some(prev) if prev.date == bar.date => *prev = bar,
            _ => out.push(bar),
        }
    }
    out.retain(Bar::is_sane);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(day: u32, close: f64) -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1_000,
        }
    }

    #[test]
    fn sorts_newest_first_input() {
        let out = normalize_bars(vec![bar(4, 12.0), bar(3, 11.0), bar(2, 10.0)]);
        let days: Vec<u32> = out.iter().map(|b| chrono::Datelike::day(&b.date)).collect();
        assert_eq!(days, vec![2, 3, 4]);
    }

    #[test]
    fn duplicate_dates_keep_last() {
        let out = normalize_bars(vec![bar(2, 10.0), bar(3, 11.0), bar(3, 11.5)]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].close, 11.5);
    }

    #[test]
    fn drops_void_and_insane_bars() {
        let mut void = bar(3, 11.0);
        void.close = f64::NAN;
        let mut inverted = bar(4, 12.0);
        inverted.high = 5.0;
        let out = normalize_bars(vec![bar(2, 10.0), void, inverted]);
        assert_eq!(out.len(), 1);
    }
}
