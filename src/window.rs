use chrono::{DateTime, Duration, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::InputError;

pub const DEFAULT_DAYS: u32 = 30;

static RE_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern compiles"));

/// How the window was requested; exactly one form is active per run.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum WindowSpec {
  LastDays { days: u32 },
  DateRange { from: NaiveDate, to: NaiveDate },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeWindow {
  pub from: DateTime<Utc>,
  pub to: DateTime<Utc>,
  pub spec: WindowSpec,
}

impl TimeWindow {
  /// Human label for logs: "30 days" or "2024-01-01 to 2024-01-31".
  pub fn label(&self) -> String {
    match self.spec {
      WindowSpec::LastDays { days } => format!("{} days", days),
      WindowSpec::DateRange { from, to } => format!("{} to {}", from, to),
    }
  }

  /// Suffix embedded in column titles: "<30 days" or "2024-01-01 to 2024-01-31".
  pub fn column_label(&self) -> String {
    match self.spec {
      WindowSpec::LastDays { days } => format!("<{} days", days),
      WindowSpec::DateRange { .. } => self.label(),
    }
  }

  /// Path segment for the report file name: "30days" or "2024-01-01-to-2024-01-31".
  pub fn file_label(&self) -> String {
    match self.spec {
      WindowSpec::LastDays { days } => format!("{}days", days),
      WindowSpec::DateRange { .. } => self.label().replace(' ', "-"),
    }
  }
}

/// Pick the window form from raw inputs.
///
/// Both dates must look like `YYYY-MM-DD` for the absolute form to win; anything
/// else falls back to the day count, which defaults to 30 when absent.
pub fn select_spec(days: Option<&str>, fromdate: Option<&str>, todate: Option<&str>) -> Result<WindowSpec, InputError> {
  let from_raw = fromdate.map(str::trim).filter(|s| RE_DATE.is_match(s));
  let to_raw = todate.map(str::trim).filter(|s| RE_DATE.is_match(s));

  if let (Some(f), Some(t)) = (from_raw, to_raw) {
    let from = parse_date(f)?;
    let to = parse_date(t)?;

    if from > to {
      return Err(InputError::InvertedRange {
        from: f.to_string(),
        to: t.to_string(),
      });
    }

    return Ok(WindowSpec::DateRange { from, to });
  }

  let days = match days.map(str::trim).filter(|s| !s.is_empty()) {
    Some(raw) => raw.parse::<u32>().map_err(|_| InputError::InvalidDays(raw.to_string()))?,
    None => DEFAULT_DAYS,
  };

  Ok(WindowSpec::LastDays { days })
}

/// Turn a spec into concrete instants. `now` anchors the relative form.
pub fn resolve_spec(spec: WindowSpec, now: DateTime<Utc>) -> Result<TimeWindow, InputError> {
  match spec {
    WindowSpec::LastDays { days } => {
      let from = now
        .checked_sub_signed(Duration::days(days.into()))
        .ok_or_else(|| InputError::InvalidDays(days.to_string()))?;

      Ok(TimeWindow { from, to: now, spec })
    }
    WindowSpec::DateRange { from, to } => Ok(TimeWindow {
      from: midnight_utc(from),
      to: midnight_utc(to),
      spec,
    }),
  }
}

pub fn resolve(
  days: Option<&str>,
  fromdate: Option<&str>,
  todate: Option<&str>,
  now: DateTime<Utc>,
) -> Result<TimeWindow, InputError> {
  let spec = select_spec(days, fromdate, todate)?;
  resolve_spec(spec, now)
}

fn parse_date(raw: &str) -> Result<NaiveDate, InputError> {
  NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| InputError::InvalidDate(raw.to_string()))
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
  date.and_time(chrono::NaiveTime::MIN).and_utc()
}
