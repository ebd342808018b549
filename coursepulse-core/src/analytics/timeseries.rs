//! Engagement time series.
//!
//! Activity events are counted per UTC calendar date inside a trailing
//! window, then labelled for one of three canned granularities.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

/// Closed time interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// The `days` days up to and including `end`.
    pub fn trailing(end: DateTime<Utc>, days: i64) -> Self {
        Self {
            start: end - Duration::days(days),
            end,
        }
    }

    pub fn contains(&self, ts: &DateTime<Utc>) -> bool {
        self.start <= *ts && *ts <= self.end
    }
}

/// Canned engagement windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    /// Last 7 days, one point per day
    Daily,
    /// Last 28 days, labelled by month
    Weekly,
    /// Last 90 days, labelled by month
    Monthly,
}

impl Granularity {
    pub const ALL: [Granularity; 3] = [Granularity::Daily, Granularity::Weekly, Granularity::Monthly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Daily => "daily",
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
        }
    }

    /// Lookback length in days.
    pub fn window_days(&self) -> i64 {
        match self {
            Granularity::Daily => 7,
            Granularity::Weekly => 28,
            Granularity::Monthly => 90,
        }
    }

    /// Window ending at `now`.
    pub fn window(&self, now: DateTime<Utc>) -> TimeWindow {
        TimeWindow::trailing(now, self.window_days())
    }

    /// Chart label for a date: `YYYY-MM-DD` for daily, `YYYY-MM` otherwise.
    pub fn label(&self, date: NaiveDate) -> String {
        match self {
            Granularity::Daily => date.format("%Y-%m-%d").to_string(),
            Granularity::Weekly | Granularity::Monthly => date.format("%Y-%m").to_string(),
        }
    }
}

/// One chart point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: u64,
}

/// Event count per UTC date for events inside `window`.
pub fn daily_counts<'a, I>(timestamps: I, window: &TimeWindow) -> BTreeMap<NaiveDate, u64>
where
    I: IntoIterator<Item = &'a DateTime<Utc>>,
{
    let mut counts = BTreeMap::new();
    for ts in timestamps.into_iter().filter(|ts| window.contains(ts)) {
        *counts.entry(ts.date_naive()).or_insert(0) += 1;
    }
    counts
}

/// Labelled series, ascending by date.
///
/// Days that share a label (same month for weekly/monthly) are summed into
/// a single point.
pub fn aggregate<'a, I>(timestamps: I, window: &TimeWindow, granularity: Granularity) -> Vec<SeriesPoint>
where
    I: IntoIterator<Item = &'a DateTime<Utc>>,
{
    let mut series: Vec<SeriesPoint> = Vec::new();
    for (date, count) in daily_counts(timestamps, window) {
        let label = granularity.label(date);
        match series.last_mut() {
            Some(last) if last.label == label => last.value += count,
            _ => series.push(SeriesPoint {
                label,
                value: count,
            }),
        }
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_daily_reference_example() {
        let events = [at(2024, 1, 1, 9), at(2024, 1, 1, 17), at(2024, 1, 3, 12)];
        let window = Granularity::Daily.window(at(2024, 1, 7, 23));

        let series = aggregate(&events, &window, Granularity::Daily);
        assert_eq!(
            series,
            vec![
                SeriesPoint {
                    label: "2024-01-01".to_string(),
                    value: 2
                },
                SeriesPoint {
                    label: "2024-01-03".to_string(),
                    value: 1
                },
            ]
        );
    }

    #[test]
    fn test_window_bounds_inclusive() {
        let end = at(2024, 3, 10, 12);
        let window = TimeWindow::trailing(end, 7);
        let events = [window.start, end, window.start - Duration::seconds(1)];

        let counts = daily_counts(&events, &window);
        assert_eq!(counts.values().sum::<u64>(), 2);
    }

    #[test]
    fn test_monthly_labels_sum_days() {
        let events = [
            at(2024, 1, 30, 8),
            at(2024, 2, 2, 8),
            at(2024, 2, 2, 9),
            at(2024, 2, 3, 8),
        ];
        let window = Granularity::Weekly.window(at(2024, 2, 5, 0));

        let series = aggregate(&events, &window, Granularity::Weekly);
        assert_eq!(
            series,
            vec![
                SeriesPoint {
                    label: "2024-01".to_string(),
                    value: 1
                },
                SeriesPoint {
                    label: "2024-02".to_string(),
                    value: 3
                },
            ]
        );
    }

    #[test]
    fn test_unsorted_input_comes_out_ordered() {
        let events = [at(2024, 5, 3, 0), at(2024, 5, 1, 0), at(2024, 5, 2, 0)];
        let window = Granularity::Monthly.window(at(2024, 5, 4, 0));

        let labels: Vec<_> = aggregate(&events, &window, Granularity::Daily)
            .into_iter()
            .map(|p| p.label)
            .collect();
        assert_eq!(labels, vec!["2024-05-01", "2024-05-02", "2024-05-03"]);
    }

    #[test]
    fn test_window_lengths() {
        assert_eq!(Granularity::Daily.window_days(), 7);
        assert_eq!(Granularity::Weekly.window_days(), 28);
        assert_eq!(Granularity::Monthly.window_days(), 90);
    }
}
