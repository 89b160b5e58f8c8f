//! Weekly resampling with weeks ending on Friday.
//!
//! Each daily observation belongs to the week ending on the Friday on or after
//! its date (Saturday and Sunday roll forward to the next Friday). The weekly
//! close is the last non-missing daily close in the bucket. Every week from the
//! first to the last observation is kept, including weeks whose days are all
//! missing or absent; those carry `close = None`.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::PriceSeries;

/// Close of one Friday-ending week.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeeklyClose {
    pub week_ending: NaiveDate,
    pub close: Option<f64>,
}

/// The Friday that closes the week containing `date`.
pub fn week_ending_friday(date: NaiveDate) -> NaiveDate {
    let from_monday = date.weekday().num_days_from_monday() as i64;
    // Friday is 4 days from Monday.
    let ahead = (4 - from_monday).rem_euclid(7);
    date + Duration::days(ahead)
}

/// Resample a daily series to Friday-ending weekly closes.
pub fn resample_weekly(daily: &PriceSeries) -> Vec<WeeklyClose> {
    let mut buckets: Vec<WeeklyClose> = Vec::new();

    for point in daily.points() {
        let week = week_ending_friday(point.date);
        let close = (!point.is_missing()).then_some(point.close);
        match buckets.last_mut() {
            Some(last) if last.week_ending == week => {
                if close.is_some() {
                    last.close = close;
                }
            }
            Some(last) => {
                let mut gap = last.week_ending + Duration::days(7);
                while gap < week {
                    buckets.push(WeeklyClose {
                        week_ending: gap,
                        close: None,
                    });
                    gap += Duration::days(7);
                }
                buckets.push(WeeklyClose {
                    week_ending: week,
                    close,
                });
            }
            None => buckets.push(WeeklyClose {
                week_ending: week,
                close,
            }),
        }
    }

    buckets
}
