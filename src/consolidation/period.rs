//! Period boundary calculation.
//!
//! Pure functions computing the windows the consolidation tiers operate
//! over: 6-hour raw windows for the basic tier, Monday-start weeks, and
//! previous calendar months. All boundaries are UTC; inputs that lack a
//! timezone offset are rejected at this boundary, never silently coerced.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::PeriodError;

/// Compaction tier of a summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsolidationLevel {
    /// Raw-window summaries.
    #[default]
    Basic,
    /// Compacted monthly output of the basic tier.
    Extensive,
    /// Budget-driven further compaction of the extensive tier.
    Profound,
}

impl std::fmt::Display for ConsolidationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsolidationLevel::Basic => write!(f, "basic"),
            ConsolidationLevel::Extensive => write!(f, "extensive"),
            ConsolidationLevel::Profound => write!(f, "profound"),
        }
    }
}

impl std::str::FromStr for ConsolidationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(ConsolidationLevel::Basic),
            "extensive" => Ok(ConsolidationLevel::Extensive),
            "profound" => Ok(ConsolidationLevel::Profound),
            _ => Err(format!("Unknown consolidation level: {}", s)),
        }
    }
}

/// One consolidation window with its tier and human-readable label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationPeriod {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub label: String,
    pub level: ConsolidationLevel,
}

impl ConsolidationPeriod {
    /// Build a period, rejecting inverted bounds.
    pub fn new(
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        label: impl Into<String>,
        level: ConsolidationLevel,
    ) -> Result<Self, PeriodError> {
        if period_start >= period_end {
            return Err(PeriodError::InvertedBounds {
                start: period_start.to_rfc3339(),
                end: period_end.to_rfc3339(),
            });
        }
        Ok(Self {
            period_start,
            period_end,
            label: label.into(),
            level,
        })
    }
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).expect("midnight is valid"))
}

fn day_end(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(23, 59, 59).expect("23:59:59 is valid"))
}

/// The most recently completed Monday-start week relative to `now`.
///
/// On a Monday the week ending yesterday is returned; any other day yields
/// the week of the Monday on or before `now`, through the following Sunday.
pub fn week_period(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now.date_naive();
    let monday = if today.weekday() == Weekday::Mon {
        today - Duration::days(7)
    } else {
        today - Duration::days(today.weekday().num_days_from_monday() as i64)
    };
    (day_start(monday), day_end(monday + Duration::days(6)))
}

/// The calendar month preceding `now`'s month, with year wraparound and
/// correct month lengths.
pub fn month_period(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let (prev_year, prev_month) = if now.month() == 1 {
        (now.year() - 1, 12)
    } else {
        (now.year(), now.month() - 1)
    };

    let first = NaiveDate::from_ymd_opt(prev_year, prev_month, 1).expect("first of month");
    let next_first = if prev_month == 12 {
        NaiveDate::from_ymd_opt(prev_year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(prev_year, prev_month + 1, 1)
    }
    .expect("first of following month");

    (day_start(first), day_end(next_first - Duration::days(1)))
}

/// The most recently completed 6-hour aligned raw window.
pub fn raw_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let aligned_hour = now.hour() - now.hour() % 6;
    let current_start = now
        .date_naive()
        .and_hms_opt(aligned_hour, 0, 0)
        .expect("aligned hour is valid");
    let start = Utc.from_utc_datetime(&current_start) - Duration::hours(6);
    (start, start + Duration::hours(6) - Duration::seconds(1))
}

/// Retention cutoff: everything strictly older than this is expendable.
///
/// Negative retention is rejected, never clamped.
pub fn retention_cutoff(
    now: DateTime<Utc>,
    retention_hours: i64,
) -> Result<DateTime<Utc>, PeriodError> {
    if retention_hours < 0 {
        return Err(PeriodError::NegativeRetention {
            hours: retention_hours,
        });
    }
    Ok(now - Duration::hours(retention_hours))
}

/// Label for a weekly period.
pub fn week_label(period_start: DateTime<Utc>) -> String {
    format!("Week of {}", period_start.format("%Y-%m-%d"))
}

/// Label for a monthly period.
pub fn month_label(period_start: DateTime<Utc>) -> String {
    period_start.format("%B %Y").to_string()
}

/// Label for a 6-hour raw window.
pub fn window_label(period_start: DateTime<Utc>) -> String {
    format!("{} +6h", period_start.format("%Y-%m-%d %H:00"))
}

/// Parse an RFC 3339 timestamp, requiring an explicit UTC offset.
///
/// A well-formed but offset-less timestamp is a construction error: it is
/// reported as naive rather than assumed to be UTC.
pub fn parse_utc_strict(value: &str) -> Result<DateTime<Utc>, PeriodError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
    for format in NAIVE_FORMATS {
        if NaiveDateTime::parse_from_str(value, format).is_ok() {
            return Err(PeriodError::NaiveTimestamp {
                value: value.to_string(),
            });
        }
    }

    Err(PeriodError::Unparseable {
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_week_period_midweek() {
        // Tuesday 2023-10-10 -> Monday 2023-10-09 through Sunday 2023-10-15.
        let (start, end) = week_period(utc(2023, 10, 10, 15, 30, 0));
        assert_eq!(start, utc(2023, 10, 9, 0, 0, 0));
        assert_eq!(end, utc(2023, 10, 15, 23, 59, 59));
    }

    #[test]
    fn test_week_period_on_monday_returns_previous_week() {
        // Monday 2023-10-09 -> the week ending yesterday.
        let (start, end) = week_period(utc(2023, 10, 9, 8, 0, 0));
        assert_eq!(start, utc(2023, 10, 2, 0, 0, 0));
        assert_eq!(end, utc(2023, 10, 8, 23, 59, 59));
    }

    #[test]
    fn test_week_period_on_sunday() {
        // Sunday 2023-10-15 still belongs to the week of Monday 2023-10-09.
        let (start, end) = week_period(utc(2023, 10, 15, 23, 0, 0));
        assert_eq!(start, utc(2023, 10, 9, 0, 0, 0));
        assert_eq!(end, utc(2023, 10, 15, 23, 59, 59));
    }

    #[test]
    fn test_month_period_non_leap_february() {
        let (start, end) = month_period(utc(2023, 3, 15, 12, 0, 0));
        assert_eq!(start, utc(2023, 2, 1, 0, 0, 0));
        assert_eq!(end, utc(2023, 2, 28, 23, 59, 59));
    }

    #[test]
    fn test_month_period_leap_february() {
        let (start, end) = month_period(utc(2024, 3, 15, 12, 0, 0));
        assert_eq!(start, utc(2024, 2, 1, 0, 0, 0));
        assert_eq!(end, utc(2024, 2, 29, 23, 59, 59));
    }

    #[test]
    fn test_month_period_january_wraps_to_previous_december() {
        let (start, end) = month_period(utc(2024, 1, 10, 0, 0, 0));
        assert_eq!(start, utc(2023, 12, 1, 0, 0, 0));
        assert_eq!(end, utc(2023, 12, 31, 23, 59, 59));
    }

    #[test]
    fn test_raw_window_is_previous_aligned_six_hours() {
        let (start, end) = raw_window(utc(2023, 10, 10, 14, 45, 0));
        assert_eq!(start, utc(2023, 10, 10, 6, 0, 0));
        assert_eq!(end, utc(2023, 10, 10, 11, 59, 59));

        // Exactly on a boundary: the window just completed.
        let (start, end) = raw_window(utc(2023, 10, 10, 12, 0, 0));
        assert_eq!(start, utc(2023, 10, 10, 6, 0, 0));
        assert_eq!(end, utc(2023, 10, 10, 11, 59, 59));

        // Early morning crosses midnight.
        let (start, _) = raw_window(utc(2023, 10, 10, 3, 0, 0));
        assert_eq!(start, utc(2023, 10, 9, 18, 0, 0));
    }

    #[test]
    fn test_retention_cutoff() {
        let now = utc(2023, 10, 10, 12, 0, 0);
        assert_eq!(retention_cutoff(now, 24).unwrap(), utc(2023, 10, 9, 12, 0, 0));
        assert_eq!(retention_cutoff(now, 0).unwrap(), now);
    }

    #[test]
    fn test_retention_cutoff_rejects_negative_hours() {
        let err = retention_cutoff(utc(2023, 10, 10, 0, 0, 0), -1).unwrap_err();
        assert!(matches!(err, PeriodError::NegativeRetention { hours: -1 }));
    }

    #[test]
    fn test_labels() {
        assert_eq!(week_label(utc(2023, 10, 9, 0, 0, 0)), "Week of 2023-10-09");
        assert_eq!(month_label(utc(2023, 2, 1, 0, 0, 0)), "February 2023");
        assert_eq!(window_label(utc(2023, 10, 10, 6, 0, 0)), "2023-10-10 06:00 +6h");
    }

    #[test]
    fn test_parse_utc_strict_accepts_offsets() {
        let parsed = parse_utc_strict("2023-10-09T00:00:00Z").unwrap();
        assert_eq!(parsed, utc(2023, 10, 9, 0, 0, 0));

        let parsed = parse_utc_strict("2023-10-09T02:00:00+02:00").unwrap();
        assert_eq!(parsed, utc(2023, 10, 9, 0, 0, 0));
    }

    #[test]
    fn test_parse_utc_strict_rejects_naive() {
        let err = parse_utc_strict("2023-10-09T00:00:00").unwrap_err();
        assert!(matches!(err, PeriodError::NaiveTimestamp { .. }));

        let err = parse_utc_strict("2023-10-09 00:00:00").unwrap_err();
        assert!(matches!(err, PeriodError::NaiveTimestamp { .. }));
    }

    #[test]
    fn test_parse_utc_strict_rejects_garbage() {
        let err = parse_utc_strict("not a timestamp").unwrap_err();
        assert!(matches!(err, PeriodError::Unparseable { .. }));
    }

    #[test]
    fn test_period_rejects_inverted_bounds() {
        let start = utc(2023, 10, 15, 0, 0, 0);
        let end = utc(2023, 10, 9, 0, 0, 0);
        let err = ConsolidationPeriod::new(start, end, "backwards", ConsolidationLevel::Basic)
            .unwrap_err();
        assert!(matches!(err, PeriodError::InvertedBounds { .. }));
    }

    #[test]
    fn test_consolidation_level_round_trip() {
        for level in [
            ConsolidationLevel::Basic,
            ConsolidationLevel::Extensive,
            ConsolidationLevel::Profound,
        ] {
            let parsed: ConsolidationLevel = level.to_string().parse().unwrap();
            assert_eq!(parsed, level);
        }
        assert!("weekly".parse::<ConsolidationLevel>().is_err());
    }
}
