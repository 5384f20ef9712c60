//! Timestamp parsing and reconstruction.
//!
//! All timestamps are naive (no zone); inbound RFC 3339 values are converted
//! to UTC before the zone is dropped.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// Format accepted for separate legacy date values.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Format accepted for separate legacy time values.
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// A date half as delivered by a legacy driver: already typed, or raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatePart {
  Date(NaiveDate),
  Text(String),
}

/// A time half as delivered by a legacy driver: already typed, or raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimePart {
  Time(NaiveTime),
  Text(String),
}

impl DatePart {
  pub fn parse(&self) -> Option<NaiveDate> {
    match self {
      Self::Date(d) => Some(*d),
      Self::Text(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok(),
    }
  }
}

impl TimePart {
  pub fn parse(&self) -> Option<NaiveTime> {
    match self {
      Self::Time(t) => Some(*t),
      Self::Text(s) => NaiveTime::parse_from_str(s.trim(), TIME_FORMAT).ok(),
    }
  }
}

/// Combine separately stored date and time halves into one timestamp.
///
/// Returns `None` when either half is missing or does not parse.
pub fn combine(
  date: Option<&DatePart>,
  time: Option<&TimePart>,
) -> Option<NaiveDateTime> {
  let date = date?.parse()?;
  let time = time?.parse()?;
  Some(date.and_time(time))
}

/// Parse a datetime from a client: RFC 3339, or ISO 8601 without an offset
/// (`T` or space separated, optional fractional seconds).
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
  let s = s.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.with_timezone(&Utc).naive_utc());
  }
  ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
  NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

/// The current instant as stored by the system.
pub fn now() -> NaiveDateTime { Utc::now().naive_utc() }
