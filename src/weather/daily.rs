//! Collapse 3-hourly forecast entries into one reading per day.

use chrono::Timelike;
use std::collections::HashSet;

use super::ForecastEntry;
use crate::domain::ForecastDay;

pub const MAX_FORECAST_DAYS: usize = 5;

fn is_midday(entry: &ForecastEntry) -> bool {
    let t = entry.timestamp.time();
    t.hour() == 12 && t.minute() == 0 && t.second() == 0
}

/// Pick at most five days, one entry per date.
///
/// The 12:00 slot of each date is preferred. When fewer than five dates have
/// one (a late-evening request has already lost today's noon slot), the
/// remaining dates are filled with their earliest entry. Output is in date
/// order.
pub fn select_daily(entries: &[ForecastEntry]) -> Vec<ForecastDay> {
    let mut seen = HashSet::new();
    let mut picked: Vec<&ForecastEntry> = Vec::with_capacity(MAX_FORECAST_DAYS);

    for entry in entries.iter().filter(|e| is_midday(e)) {
        if picked.len() >= MAX_FORECAST_DAYS {
            break;
        }
        if seen.insert(entry.timestamp.date()) {
            picked.push(entry);
        }
    }

    for entry in entries {
        if picked.len() >= MAX_FORECAST_DAYS {
            break;
        }
        if seen.insert(entry.timestamp.date()) {
            picked.push(entry);
        }
    }

    picked.sort_by_key(|e| e.timestamp.date());
    picked
        .into_iter()
        .map(|e| {
            let date = e.timestamp.date();
            ForecastDay {
                date,
                day_name: date.format("%a").to_string(),
                temp: e.temp,
                description: e.description.clone(),
                icon: e.icon.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use proptest::prelude::*;

    fn entry(ts: NaiveDateTime, temp: f64) -> ForecastEntry {
        ForecastEntry {
            timestamp: ts,
            temp,
            description: "clear sky".to_string(),
            icon: "01d".to_string(),
        }
    }

    /// 3-hourly entries starting at `start` for `count` slots
    fn series(start: NaiveDateTime, count: usize) -> Vec<ForecastEntry> {
        (0..count)
            .map(|i| {
                let ts = start + Duration::hours(3 * i as i64);
                entry(ts, ts.time().hour() as f64)
            })
            .collect()
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_picks_noon_slots() {
        let days = select_daily(&series(at(2026, 10, 19, 0), 40));

        assert_eq!(days.len(), 5);
        assert!(days.iter().all(|d| d.temp == 12.0));
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        assert_eq!(days[0].day_name, "Mon");
        assert_eq!(days[4].date, NaiveDate::from_ymd_opt(2026, 10, 23).unwrap());
    }

    #[test]
    fn test_late_night_request_backfills_in_date_order() {
        // 21:00 start: the provider's 40 slots reach 18:00 five days later,
        // so all five following dates have a noon slot.
        let days = select_daily(&series(at(2026, 10, 19, 21), 40));
        assert_eq!(days.len(), 5);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2026, 10, 20).unwrap());
        assert!(days.iter().all(|d| d.temp == 12.0));

        // Short horizon: only two noon slots, rest backfilled by earliest entry
        let days = select_daily(&series(at(2026, 10, 19, 15), 20));
        let dates: Vec<_> = days.iter().map(|d| d.date.to_string()).collect();
        assert_eq!(dates, vec!["2026-10-19", "2026-10-20", "2026-10-21", "2026-10-22"]);
        assert_eq!(days[0].temp, 15.0);
        assert_eq!(days[1].temp, 12.0);
        assert_eq!(days[2].temp, 12.0);
        assert_eq!(days[3].temp, 0.0);
    }

    #[test]
    fn test_empty_input() {
        assert!(select_daily(&[]).is_empty());
    }

    proptest! {
        #[test]
        fn never_more_than_five_unique_dates(
            offsets in proptest::collection::vec(0i64..(24 * 12), 0..80)
        ) {
            let base = at(2026, 1, 1, 0);
            let entries: Vec<_> = offsets
                .iter()
                .map(|h| entry(base + Duration::hours(*h), 0.0))
                .collect();

            let days = select_daily(&entries);
            prop_assert!(days.len() <= MAX_FORECAST_DAYS);

            let unique: HashSet<_> = days.iter().map(|d| d.date).collect();
            prop_assert_eq!(unique.len(), days.len());
            prop_assert!(days.windows(2).all(|w| w[0].date < w[1].date));
        }
    }
}
