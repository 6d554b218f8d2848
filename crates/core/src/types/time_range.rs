use chrono::{DateTime, NaiveDate, Utc};

use crate::error::CoreError;

/// Inclusive date window written as `start~end`; either side may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl TimeRange {
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let trimmed = input.trim();
        let invalid = || CoreError::InvalidTimeRange(trimmed.to_string());
        let (left, right) = trimmed.split_once('~').ok_or_else(invalid)?;
        let start = parse_bound(left)?;
        let end = parse_bound(right)?;
        match (start, end) {
            (None, None) => Err(invalid()),
            (Some(start), Some(end)) if start > end => Err(invalid()),
            _ => Ok(TimeRange { start, end }),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let date = at.date_naive();
        self.start.is_none_or(|start| date >= start) && self.end.is_none_or(|end| date <= end)
    }

    /// Millisecond bounds, start of the first day through the last ms of the last day.
    pub fn to_millis_bounds(&self) -> (Option<i64>, Option<i64>) {
        let start = self
            .start
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc().timestamp_millis());
        let end = self
            .end
            .and_then(|date| date.and_hms_milli_opt(23, 59, 59, 999))
            .map(|dt| dt.and_utc().timestamp_millis());
        (start, end)
    }
}

fn parse_bound(raw: &str) -> Result<Option<NaiveDate>, CoreError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| CoreError::InvalidTimeRange(raw.to_string()))
}
