//! Filter/pagination composition -- canonical cache keys for logical queries.
//!
//! Every read the orchestrator performs is keyed by a canonical string derived
//! from the resource name and its normalized parameters. Composition is pure
//! and deterministic: identical filter/pagination values (including absent
//! optionals, rendered as `*`) always produce the same key, and any changed
//! field produces a different one.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{AlertSeverity, AlertStatus, LogSeverity, LogSource};

/// Fallback cap on page size when no configuration is supplied.
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 200;

/// Default page size matching the dashboard's log table.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("page must be a positive integer, got {0}")]
    InvalidPage(u32),
    #[error("page size must be a positive integer, got {0}")]
    InvalidPageSize(u32),
}

/// Canonical identifier for one logical query against one resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The resource segment of the key, i.e. everything before the first `|`.
    pub fn resource(&self) -> &str {
        self.0.split('|').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validated 1-based pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u32,
    page_size: u32,
}

impl Pagination {
    /// Build a window, rejecting non-positive values and clamping `page_size`
    /// to `max_page_size`.
    pub fn new(page: u32, page_size: u32, max_page_size: u32) -> Result<Self, QueryError> {
        if page == 0 {
            return Err(QueryError::InvalidPage(page));
        }
        if page_size == 0 {
            return Err(QueryError::InvalidPageSize(page_size));
        }
        Ok(Self {
            page,
            page_size: page_size.min(max_page_size),
        })
    }

    /// Page 1 with the given size. Used whenever filters change, so a fresh
    /// (possibly smaller) result set is never asked for an out-of-range
    /// offset.
    pub fn first(page_size: u32) -> Self {
        Self {
            page: 1,
            page_size: page_size.clamp(1, DEFAULT_MAX_PAGE_SIZE),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Zero-based item offset for the backend's limit/offset convention.
    pub fn offset(&self) -> u32 {
        (self.page - 1) * self.page_size
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::first(DEFAULT_PAGE_SIZE)
    }
}

/// Filters for the log list view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogQuery {
    pub source: Option<LogSource>,
    pub severity: Option<LogSeverity>,
}

impl LogQuery {
    pub(crate) fn params(&self, page: &Pagination) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(4);
        if let Some(source) = self.source {
            params.push(("source", source.to_string()));
        }
        if let Some(severity) = self.severity {
            params.push(("severity", severity.to_string()));
        }
        params.push(("limit", page.page_size().to_string()));
        params.push(("offset", page.offset().to_string()));
        params
    }
}

/// Filters for the alert list view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertQuery {
    pub status: Option<AlertStatus>,
    pub severity: Option<AlertSeverity>,
    pub limit: Option<u32>,
}

impl AlertQuery {
    pub(crate) fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(3);
        if let Some(status) = self.status {
            params.push(("status", status.to_string()));
        }
        if let Some(severity) = self.severity {
            params.push(("severity", severity.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        params
    }
}

/// Time-range query for the attack timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineQuery {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub source: Option<LogSource>,
}

impl TimelineQuery {
    pub(crate) fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("start_time", self.start.to_rfc3339()),
            ("end_time", self.end.to_rfc3339()),
        ];
        if let Some(source) = self.source {
            params.push(("source", source.to_string()));
        }
        params
    }
}

/// Body for the log full-text search endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogSearch {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<LogSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<LogSeverity>,
    pub limit: u32,
    pub offset: u32,
}

impl LogSearch {
    pub fn new(query: impl Into<String>, page: &Pagination) -> Self {
        Self {
            query: query.into(),
            source: None,
            severity: None,
            limit: page.page_size(),
            offset: page.offset(),
        }
    }
}

// ---------------------------------------------------------------------------
// Key composition
// ---------------------------------------------------------------------------

/// Render `resource|field=value|...` with a fixed field order. Absent
/// optionals are rendered as `*` so that presence and absence never collide.
fn compose(resource: &str, fields: &[(&str, Option<String>)]) -> CacheKey {
    let mut key = String::from(resource);
    for (name, value) in fields {
        key.push('|');
        key.push_str(name);
        key.push('=');
        match value {
            Some(v) => key.push_str(v),
            None => key.push('*'),
        }
    }
    CacheKey(key)
}

pub fn log_list_key(q: &LogQuery, page: &Pagination) -> CacheKey {
    compose(
        "logs",
        &[
            ("source", q.source.map(|s| s.to_string())),
            ("severity", q.severity.map(|s| s.to_string())),
            ("limit", Some(page.page_size().to_string())),
            ("offset", Some(page.offset().to_string())),
        ],
    )
}

pub fn log_detail_key(id: &str) -> CacheKey {
    compose("log", &[("id", Some(id.to_string()))])
}

pub fn log_search_key(search: &LogSearch) -> CacheKey {
    compose(
        "logs-search",
        &[
            ("q", Some(search.query.clone())),
            ("source", search.source.map(|s| s.to_string())),
            ("severity", search.severity.map(|s| s.to_string())),
            ("limit", Some(search.limit.to_string())),
            ("offset", Some(search.offset.to_string())),
        ],
    )
}

pub fn alert_list_key(q: &AlertQuery) -> CacheKey {
    compose(
        "alerts",
        &[
            ("status", q.status.map(|s| s.to_string())),
            ("severity", q.severity.map(|s| s.to_string())),
            ("limit", q.limit.map(|l| l.to_string())),
        ],
    )
}

pub fn alert_detail_key(id: &str) -> CacheKey {
    compose("alert", &[("id", Some(id.to_string()))])
}

pub fn timeline_key(q: &TimelineQuery) -> CacheKey {
    compose(
        "timeline",
        &[
            ("start", Some(q.start.to_rfc3339())),
            ("end", Some(q.end.to_rfc3339())),
            ("source", q.source.map(|s| s.to_string())),
        ],
    )
}

pub fn graph_key(alert_id: &str) -> CacheKey {
    compose("graph", &[("alert", Some(alert_id.to_string()))])
}

pub fn explain_key(alert_id: &str) -> CacheKey {
    compose("explain", &[("alert", Some(alert_id.to_string()))])
}

pub fn metrics_key() -> CacheKey {
    compose("metrics", &[])
}

pub fn ip_enrichment_key(ip: &str) -> CacheKey {
    compose("enrich-ip", &[("ip", Some(ip.to_string()))])
}

pub fn threat_intel_key(indicator: &str) -> CacheKey {
    compose("threat-intel", &[("indicator", Some(indicator.to_string()))])
}
