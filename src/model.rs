//! Domain entities returned by the analytics backend.
//!
//! All types mirror the backend's JSON wire format. Entities are immutable
//! once fetched; the only server-mutable field from the client's perspective
//! is [`Alert::status`], changed via the acknowledge/update operations.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Origin platform of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSource {
    Windows,
    Android,
    Server,
    Iot,
    Cloud,
    /// Any source label this client does not recognize.
    #[serde(other)]
    Unknown,
}

impl fmt::Display for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogSource::Windows => "windows",
            LogSource::Android => "android",
            LogSource::Server => "server",
            LogSource::Iot => "iot",
            LogSource::Cloud => "cloud",
            LogSource::Unknown => "unknown",
        };
        f.pad(s)
    }
}

impl FromStr for LogSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "windows" => Ok(LogSource::Windows),
            "android" => Ok(LogSource::Android),
            "server" => Ok(LogSource::Server),
            "iot" => Ok(LogSource::Iot),
            "cloud" => Ok(LogSource::Cloud),
            other => Err(format!("unknown log source '{other}'")),
        }
    }
}

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for LogSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogSeverity::Info => "info",
            LogSeverity::Warning => "warning",
            LogSeverity::Error => "error",
            LogSeverity::Critical => "critical",
        };
        f.pad(s)
    }
}

impl FromStr for LogSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "info" => Ok(LogSeverity::Info),
            "warning" => Ok(LogSeverity::Warning),
            "error" => Ok(LogSeverity::Error),
            "critical" => Ok(LogSeverity::Critical),
            other => Err(format!("unknown log severity '{other}'")),
        }
    }
}

/// Severity of a correlated alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AlertSeverity::Low => "low",
            AlertSeverity::Medium => "medium",
            AlertSeverity::High => "high",
            AlertSeverity::Critical => "critical",
        };
        f.pad(s)
    }
}

impl FromStr for AlertSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(AlertSeverity::Low),
            "medium" => Ok(AlertSeverity::Medium),
            "high" => Ok(AlertSeverity::High),
            "critical" => Ok(AlertSeverity::Critical),
            other => Err(format!("unknown alert severity '{other}'")),
        }
    }
}

/// Triage state of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Open,
    Acknowledged,
    Investigating,
    Resolved,
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AlertStatus::Open => "open",
            AlertStatus::Acknowledged => "acknowledged",
            AlertStatus::Investigating => "investigating",
            AlertStatus::Resolved => "resolved",
        };
        f.pad(s)
    }
}

impl FromStr for AlertStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Ok(AlertStatus::Open),
            "acknowledged" => Ok(AlertStatus::Acknowledged),
            "investigating" => Ok(AlertStatus::Investigating),
            "resolved" => Ok(AlertStatus::Resolved),
            other => Err(format!("unknown alert status '{other}'")),
        }
    }
}

/// Entity class of a correlation graph node.
///
/// The backend may introduce new node types; anything unrecognized
/// deserializes to [`NodeType::Unknown`] so lookups can fall back to default
/// styling instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Ip,
    Device,
    User,
    Process,
    File,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeType::Ip => "ip",
            NodeType::Device => "device",
            NodeType::User => "user",
            NodeType::Process => "process",
            NodeType::File => "file",
            NodeType::Unknown => "unknown",
        };
        f.pad(s)
    }
}

/// A single ingested log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Log {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub source: LogSource,
    pub severity: LogSeverity,
    pub event_type: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// A correlated alert raised by the detection pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub severity: AlertSeverity,
    pub status: AlertStatus,
    pub source: String,
    pub related_logs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mitre_tactics: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// One point in an attack timeline. Derived from a time-range query and not
/// individually addressable, so it carries no id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub timestamp: DateTime<Utc>,
    pub device: String,
    pub event: String,
    /// Numeric severity 1-5.
    pub severity: u8,
    /// Free-form source label; lane assignment happens in the encoder.
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// A node in an alert's correlation graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub label: String,
    /// Normalized 0-1 assessed threat level, drives visual emphasis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
}

/// A directed relationship between two correlation nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationEdge {
    pub source: String,
    pub target: String,
    pub relationship: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// Entity graph scoped to one alert. Replaced wholesale on refetch, never
/// mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationGraph {
    pub nodes: Vec<CorrelationNode>,
    pub edges: Vec<CorrelationEdge>,
}

/// One model feature contributing to an explanation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XaiFeature {
    pub name: String,
    /// String or number on the wire.
    pub value: serde_json::Value,
    /// Signed contribution in [-1, 1]; positive pushes toward "suspicious".
    pub impact: f64,
    pub explanation: String,
}

/// Model explanation for one alert. Feature order on the wire is not
/// meaningful; display order is derived by the feature-ranking encoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XaiExplanation {
    pub alert_id: String,
    pub model: String,
    pub features: Vec<XaiFeature>,
    /// Model confidence 0-1.
    pub confidence: f64,
    pub reasoning: String,
}

/// Aggregate dashboard counters. Fully replaced on each refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardMetrics {
    pub total_logs: u64,
    pub total_alerts: u64,
    pub critical_alerts: u64,
    pub open_investigations: u64,
    pub devices_monitored: u64,
    pub threat_score: f64,
}

/// Generic page of results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    /// Authoritative total for computing available pages.
    pub total: u64,
    pub page: u32,
    pub size: u32,
    pub pages: u32,
}

/// Error body the backend attaches to non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub detail: String,
    pub status_code: u16,
}
