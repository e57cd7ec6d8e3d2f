//! Listing filters.
//!
//! The read surface is permissive: out-of-range `limit` and `offset` values
//! are clamped rather than rejected. Timestamp bounds are normalized to the
//! stored `YYYY-MM-DDTHH:MM:SS.mmmZ` form so they compare correctly against
//! stored strings. A bare `YYYY-MM-DD` date covers the whole UTC day: it
//! starts at midnight as a `since` bound and ends at `23:59:59.999` as an
//! `until` bound.

use attest_core::Timestamp;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Page size used when no `limit` is given.
pub const DEFAULT_LIST_LIMIT: i64 = 100;

/// Largest page a single `list` call returns.
pub const MAX_LIST_LIMIT: i64 = 1000;

/// Filters for [`crate::Ledger::list()`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListFilter {
    /// Exact operation name.
    pub tool: Option<String>,
    /// Inclusive lower timestamp bound (RFC 3339 or `YYYY-MM-DD`).
    pub since: Option<String>,
    /// Inclusive upper timestamp bound (RFC 3339 or `YYYY-MM-DD`).
    pub until: Option<String>,
    /// Page size, clamped to `1..=MAX_LIST_LIMIT`.
    pub limit: Option<i64>,
    /// Rows to skip, clamped to `>= 0`.
    pub offset: Option<i64>,
}

impl ListFilter {
    /// Only receipts for `tool`.
    #[must_use]
    pub fn tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }

    /// Page bounds (builder pattern).
    #[must_use]
    pub fn page(mut self, limit: i64, offset: i64) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    /// Effective page size.
    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT)
    }

    /// Effective number of rows to skip.
    pub fn effective_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    /// Lower bound in stored form.
    pub fn since_bound(&self) -> Result<Option<String>, LedgerError> {
        normalize_bound("since", self.since.as_deref(), NaiveTime::MIN)
    }

    /// Upper bound in stored form.
    pub fn until_bound(&self) -> Result<Option<String>, LedgerError> {
        normalize_bound("until", self.until.as_deref(), end_of_day())
    }
}

fn normalize_bound(
    name: &str,
    raw: Option<&str>,
    time_of_day: NaiveTime,
) -> Result<Option<String>, LedgerError> {
    let Some(s) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let ts = Timestamp::from_utc(date.and_time(time_of_day).and_utc());
        return Ok(Some(ts.to_iso8601()));
    }
    Timestamp::parse(s)
        .map(|ts| Some(ts.to_iso8601()))
        .map_err(|e| LedgerError::InvalidFilter(format!("{name}: {e}")))
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN)
}
