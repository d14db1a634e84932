//! FILENAME: engine/src/time_bucket.rs
//! PURPOSE: Maps timestamps onto calendar periods for time-series statistics.
//! CONTEXT: A `PeriodKey` is the first day of a bucket plus its granularity.
//! Its rendered form is zero padded so that lexical order of keys matches
//! chronological order (`2024-01`, `2024-W05`, `2024-Q1`, ...).

use std::str::FromStr;
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use crate::error::ConfigError;
use crate::value::FieldValue;

// ============================================================================
// GRANULARITY
// ============================================================================

/// Size of a time bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Granularity {
    Day,
    Week,
    #[default]
    Month,
    Quarter,
    Year,
}

const GRANULARITIES: &[(&str, Granularity)] = &[
    ("day", Granularity::Day),
    ("week", Granularity::Week),
    ("month", Granularity::Month),
    ("quarter", Granularity::Quarter),
    ("year", Granularity::Year),
];

impl Granularity {
    pub fn name(self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
            Granularity::Quarter => "quarter",
            Granularity::Year => "year",
        }
    }
}

impl FromStr for Granularity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        GRANULARITIES
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, g)| *g)
            .ok_or_else(|| ConfigError::Unknown { kind: "granularity", value: s.to_string() })
    }
}

impl TryFrom<String> for Granularity {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Granularity> for String {
    fn from(value: Granularity) -> Self {
        value.name().to_string()
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// COMPARISON TYPES
// ============================================================================

/// A named offset used to compare a period against an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CompareType {
    /// The immediately preceding bucket.
    PreviousPeriod,
    PreviousWeek,
    PreviousMonth,
    PreviousQuarter,
    /// Same period one year earlier.
    PreviousYear,
}

const COMPARE_TYPES: &[(&str, CompareType)] = &[
    ("previous_period", CompareType::PreviousPeriod),
    ("previous_week", CompareType::PreviousWeek),
    ("week_over_week", CompareType::PreviousWeek),
    ("previous_month", CompareType::PreviousMonth),
    ("month_over_month", CompareType::PreviousMonth),
    ("previous_quarter", CompareType::PreviousQuarter),
    ("quarter_over_quarter", CompareType::PreviousQuarter),
    ("previous_year", CompareType::PreviousYear),
    ("year_over_year", CompareType::PreviousYear),
    ("same_period_last_year", CompareType::PreviousYear),
];

impl CompareType {
    pub fn name(self) -> &'static str {
        match self {
            CompareType::PreviousPeriod => "previous_period",
            CompareType::PreviousWeek => "previous_week",
            CompareType::PreviousMonth => "previous_month",
            CompareType::PreviousQuarter => "previous_quarter",
            CompareType::PreviousYear => "previous_year",
        }
    }

    /// Whether the offset is expressible at a granularity.
    /// An offset finer than the bucket size is not.
    pub fn supports(self, granularity: Granularity) -> bool {
        use Granularity::*;
        match self {
            CompareType::PreviousPeriod | CompareType::PreviousYear => true,
            CompareType::PreviousWeek => matches!(granularity, Day | Week),
            CompareType::PreviousMonth => matches!(granularity, Day | Month),
            CompareType::PreviousQuarter => matches!(granularity, Day | Month | Quarter),
        }
    }
}

impl FromStr for CompareType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        COMPARE_TYPES
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, c)| *c)
            .ok_or_else(|| ConfigError::Unknown { kind: "comparison", value: s.to_string() })
    }
}

impl TryFrom<String> for CompareType {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CompareType> for String {
    fn from(value: CompareType) -> Self {
        value.name().to_string()
    }
}

// ============================================================================
// PERIOD KEYS
// ============================================================================

/// A calendar bucket, identified by its first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeriodKey {
    granularity: Granularity,
    start: NaiveDate,
}

impl PeriodKey {
    /// The bucket of the given granularity that contains `date`.
    pub fn containing(date: NaiveDate, granularity: Granularity) -> Self {
        let start = match granularity {
            Granularity::Day => date,
            Granularity::Week => date - Duration::days(date.weekday().num_days_from_monday() as i64),
            Granularity::Month => month_start(date),
            Granularity::Quarter => month_start(date) - Months::new(date.month0() % 3),
            Granularity::Year => date - Duration::days(date.ordinal0() as i64),
        };
        PeriodKey { granularity, start }
    }

    /// Parses a rendered key. Only the canonical rendering is accepted.
    pub fn parse(key: &str, granularity: Granularity) -> Result<Self, ConfigError> {
        let malformed = || ConfigError::MalformedPeriod {
            key: key.to_string(),
            granularity: granularity.name().to_string(),
        };
        let text = key.trim();

        let start = match granularity {
            Granularity::Day => NaiveDate::parse_from_str(text, "%Y-%m-%d").ok(),
            Granularity::Week => text.split_once("-W").and_then(|(y, w)| {
                NaiveDate::from_isoywd_opt(y.parse().ok()?, w.parse().ok()?, Weekday::Mon)
            }),
            Granularity::Month => text.split_once('-').and_then(|(y, m)| {
                NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, 1)
            }),
            Granularity::Quarter => text.split_once("-Q").and_then(|(y, q)| {
                let q: u32 = q.parse().ok()?;
                if !(1..=4).contains(&q) {
                    return None;
                }
                NaiveDate::from_ymd_opt(y.parse().ok()?, (q - 1) * 3 + 1, 1)
            }),
            Granularity::Year => text.parse().ok().and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1)),
        }
        .ok_or_else(malformed)?;

        if !in_key_range(&start) {
            return Err(malformed());
        }
        let parsed = PeriodKey { granularity, start };
        if parsed.to_string() != text {
            return Err(malformed());
        }
        Ok(parsed)
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// First day of the bucket.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// The bucket immediately after this one.
    pub fn next(&self) -> Result<PeriodKey, ConfigError> {
        let start = match self.granularity {
            Granularity::Day => self.start.checked_add_signed(Duration::days(1)),
            Granularity::Week => self.start.checked_add_signed(Duration::days(7)),
            Granularity::Month => self.start.checked_add_months(Months::new(1)),
            Granularity::Quarter => self.start.checked_add_months(Months::new(3)),
            Granularity::Year => self.start.checked_add_months(Months::new(12)),
        };
        self.shifted(start)
    }

    /// The bucket immediately before this one, whether or not it holds data.
    pub fn previous(&self) -> Result<PeriodKey, ConfigError> {
        let start = match self.granularity {
            Granularity::Day => self.start.checked_sub_signed(Duration::days(1)),
            Granularity::Week => self.start.checked_sub_signed(Duration::days(7)),
            Granularity::Month => self.start.checked_sub_months(Months::new(1)),
            Granularity::Quarter => self.start.checked_sub_months(Months::new(3)),
            Granularity::Year => self.start.checked_sub_months(Months::new(12)),
        };
        self.shifted(start)
    }

    /// Wraps a moved start date, rejecting dates outside the renderable years.
    fn shifted(&self, start: Option<NaiveDate>) -> Result<PeriodKey, ConfigError> {
        start
            .filter(in_key_range)
            .map(|start| PeriodKey { granularity: self.granularity, start })
            .ok_or_else(|| self.out_of_range())
    }

    fn out_of_range(&self) -> ConfigError {
        ConfigError::MalformedPeriod {
            key: self.to_string(),
            granularity: self.granularity.name().to_string(),
        }
    }

    /// The bucket this one is compared against under `compare`.
    pub fn compare(&self, compare: CompareType) -> Result<PeriodKey, ConfigError> {
        if !compare.supports(self.granularity) {
            return Err(ConfigError::UnsupportedComparison {
                compare: compare.name().to_string(),
                granularity: self.granularity.name().to_string(),
            });
        }

        let shifted = match (compare, self.granularity) {
            (CompareType::PreviousPeriod, _) => return self.previous(),
            (CompareType::PreviousWeek, Granularity::Week)
            | (CompareType::PreviousMonth, Granularity::Month)
            | (CompareType::PreviousQuarter, Granularity::Quarter)
            | (CompareType::PreviousYear, Granularity::Year) => return self.previous(),
            (CompareType::PreviousWeek, _) => self.start.checked_sub_signed(Duration::days(7)),
            (CompareType::PreviousMonth, _) => self.start.checked_sub_months(Months::new(1)),
            (CompareType::PreviousQuarter, _) => self.start.checked_sub_months(Months::new(3)),
            (CompareType::PreviousYear, Granularity::Week) => {
                let iso = self.start.iso_week();
                NaiveDate::from_isoywd_opt(iso.year() - 1, iso.week(), Weekday::Mon)
                    .or_else(|| NaiveDate::from_isoywd_opt(iso.year() - 1, 52, Weekday::Mon))
            }
            (CompareType::PreviousYear, _) => self.start.checked_sub_months(Months::new(12)),
        };
        let shifted = shifted.filter(in_key_range).ok_or_else(|| self.out_of_range())?;
        Ok(PeriodKey::containing(shifted, self.granularity))
    }

    /// Human-readable period name.
    pub fn label(&self) -> String {
        match self.granularity {
            Granularity::Day => self.start.format("%Y-%m-%d").to_string(),
            Granularity::Week => {
                let iso = self.start.iso_week();
                format!("{} W{:02}", iso.year(), iso.week())
            }
            Granularity::Month => self.start.format("%b %Y").to_string(),
            Granularity::Quarter => format!("Q{} {}", self.start.month0() / 3 + 1, self.start.year()),
            Granularity::Year => format!("{}", self.start.year()),
        }
    }

    /// False while `now` falls inside this bucket or before it.
    /// The last renderable bucket never completes.
    pub fn is_complete(&self, now: NaiveDateTime) -> bool {
        self.next().map_or(false, |next| now.date() >= next.start)
    }
}

impl std::fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.granularity {
            Granularity::Day => write!(f, "{}", self.start.format("%Y-%m-%d")),
            Granularity::Week => {
                let iso = self.start.iso_week();
                write!(f, "{:04}-W{:02}", iso.year(), iso.week())
            }
            Granularity::Month => write!(f, "{:04}-{:02}", self.start.year(), self.start.month()),
            Granularity::Quarter => {
                write!(f, "{:04}-Q{}", self.start.year(), self.start.month0() / 3 + 1)
            }
            Granularity::Year => write!(f, "{:04}", self.start.year()),
        }
    }
}

/// Keys render with four-digit years; anything outside 0000-9999 would break
/// their lexical ordering.
fn in_key_range(date: &NaiveDate) -> bool {
    (0..=9999).contains(&date.year())
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.day0() as i64)
}

// ============================================================================
// TIMESTAMP PARSING
// ============================================================================

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Reads a timestamp from a record value.
/// Numbers are epoch milliseconds; offsets in RFC 3339 text keep their wall-clock time.
/// Dates outside the years 0000-9999 are rejected.
pub fn parse_timestamp(value: &FieldValue) -> Option<NaiveDateTime> {
    let parsed = match value {
        FieldValue::Number(ms) if ms.is_finite() => {
            DateTime::from_timestamp_millis(*ms as i64).map(|dt| dt.naive_utc())
        }
        FieldValue::Text(s) => parse_timestamp_text(s.trim()),
        _ => None,
    };
    parsed.filter(|ts| in_key_range(&ts.date()))
}

fn parse_timestamp_text(text: &str) -> Option<NaiveDateTime> {
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// The bucket a record value falls into, or `None` when it is not a timestamp.
pub fn bucket_key(value: &FieldValue, granularity: Granularity) -> Option<PeriodKey> {
    parse_timestamp(value).map(|ts| PeriodKey::containing(ts.date(), granularity))
}
