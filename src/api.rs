//! REST client for the analytics backend.
//!
//! Thin typed wrapper over `reqwest`: one method per backend capability, all
//! returning [`ApiError`] classified by how the orchestrator should react
//! (transport failures are retryable, 4xx are not, 5xx get one retry).

use std::time::Duration;

use anyhow::Context;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::config::ApiConfig;
use crate::model::{
    Alert, AlertStatus, ApiErrorBody, CorrelationGraph, DashboardMetrics, Log, PaginatedResponse,
    TimelineEvent, XaiExplanation,
};
use crate::query::{AlertQuery, LogQuery, LogSearch, Pagination, TimelineQuery};

/// Failure modes of a backend read, grouped by retry policy.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Network unreachable, connect failure, or timeout.
    #[error("transport failure: {0}")]
    Transport(String),
    /// 4xx -- bad filter, missing id. Never retried.
    #[error("client error {status}: {detail}")]
    Client { status: u16, detail: String },
    /// 5xx -- retried once before surfacing.
    #[error("server error {status}: {detail}")]
    Server { status: u16, detail: String },
    /// The body did not match the expected shape. Never retried.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    /// How many immediate retries this error class earns.
    /// `transport_retries` comes from configuration; server errors always get
    /// exactly one more attempt, everything else none.
    pub fn retry_budget(&self, transport_retries: u32) -> u32 {
        match self {
            ApiError::Transport(_) => transport_retries,
            ApiError::Server { .. } => 1,
            ApiError::Client { .. } | ApiError::Decode(_) => 0,
        }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

/// Cloneable handle to the backend REST surface.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(cfg: &ApiConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    // -- logs ---------------------------------------------------------------

    pub async fn list_logs(
        &self,
        query: &LogQuery,
        page: &Pagination,
    ) -> Result<PaginatedResponse<Log>, ApiError> {
        self.get_json("/api/v1/logs", &query.params(page)).await
    }

    pub async fn get_log(&self, id: &str) -> Result<Log, ApiError> {
        self.get_json(&format!("/api/v1/logs/{id}"), &[]).await
    }

    pub async fn search_logs(
        &self,
        search: &LogSearch,
    ) -> Result<PaginatedResponse<Log>, ApiError> {
        self.post_json("/api/v1/logs/search", search).await
    }

    // -- alerts -------------------------------------------------------------

    pub async fn list_alerts(
        &self,
        query: &AlertQuery,
    ) -> Result<PaginatedResponse<Alert>, ApiError> {
        self.get_json("/api/v1/alerts", &query.params()).await
    }

    pub async fn get_alert(&self, id: &str) -> Result<Alert, ApiError> {
        self.get_json(&format!("/api/v1/alerts/{id}"), &[]).await
    }

    /// Mark an alert acknowledged. The caller is responsible for invalidating
    /// cached copies of the alert afterwards.
    pub async fn acknowledge_alert(&self, id: &str) -> Result<(), ApiError> {
        let path = format!("/api/v1/alerts/{id}/acknowledge");
        let request_id = Uuid::new_v4();
        debug!(%request_id, method = "POST", %path, "api request");
        let resp = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .send()
            .await
            .map_err(ApiError::from_reqwest)?;
        Self::expect_empty(resp).await
    }

    pub async fn set_alert_status(&self, id: &str, status: AlertStatus) -> Result<(), ApiError> {
        let path = format!("/api/v1/alerts/{id}");
        let request_id = Uuid::new_v4();
        debug!(%request_id, method = "PATCH", %path, %status, "api request");
        let resp = self
            .http
            .patch(format!("{}{}", self.base_url, path))
            .json(&serde_json::json!({ "status": status }))
            .send()
            .await
            .map_err(ApiError::from_reqwest)?;
        Self::expect_empty(resp).await
    }

    // -- correlation --------------------------------------------------------

    pub async fn timeline(&self, query: &TimelineQuery) -> Result<Vec<TimelineEvent>, ApiError> {
        self.get_json("/api/v1/correlation/timeline", &query.params())
            .await
    }

    pub async fn correlation_graph(&self, alert_id: &str) -> Result<CorrelationGraph, ApiError> {
        self.get_json(&format!("/api/v1/correlation/graph/{alert_id}"), &[])
            .await
    }

    // -- explanations & metrics ---------------------------------------------

    pub async fn explain_alert(&self, alert_id: &str) -> Result<XaiExplanation, ApiError> {
        self.get_json(&format!("/api/v1/xai/explain/{alert_id}"), &[])
            .await
    }

    pub async fn dashboard_metrics(&self) -> Result<DashboardMetrics, ApiError> {
        self.get_json("/api/v1/dashboard/metrics", &[]).await
    }

    // -- enrichment ---------------------------------------------------------

    pub async fn enrich_ip(&self, ip: &str) -> Result<serde_json::Value, ApiError> {
        self.get_json(&format!("/api/v1/enrichment/ip/{ip}"), &[])
            .await
    }

    pub async fn threat_intel(&self, indicator: &str) -> Result<serde_json::Value, ApiError> {
        self.get_json(&format!("/api/v1/enrichment/threat-intel/{indicator}"), &[])
            .await
    }

    // -- plumbing -----------------------------------------------------------

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let request_id = Uuid::new_v4();
        debug!(%request_id, method = "GET", %path, "api request");
        let resp = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(params)
            .send()
            .await
            .map_err(ApiError::from_reqwest)?;
        Self::decode_json(resp).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let request_id = Uuid::new_v4();
        debug!(%request_id, method = "POST", %path, "api request");
        let resp = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(ApiError::from_reqwest)?;
        Self::decode_json(resp).await
    }

    async fn decode_json<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
        let status = resp.status();
        if !status.is_success() {
            return Err(Self::status_error(status, resp).await);
        }
        resp.json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn expect_empty(resp: Response) -> Result<(), ApiError> {
        let status = resp.status();
        if !status.is_success() {
            return Err(Self::status_error(status, resp).await);
        }
        Ok(())
    }

    /// Classify a non-2xx response, preferring the backend's structured
    /// `{detail, status_code}` body over raw text.
    async fn status_error(status: StatusCode, resp: Response) -> ApiError {
        let text = resp.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ApiErrorBody>(&text)
            .map(|body| body.detail)
            .unwrap_or(text);
        if status.is_client_error() {
            ApiError::Client {
                status: status.as_u16(),
                detail,
            }
        } else {
            ApiError::Server {
                status: status.as_u16(),
                detail,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_budget_by_error_class() {
        let transport = ApiError::Transport("connection refused".into());
        let client = ApiError::Client {
            status: 404,
            detail: "not found".into(),
        };
        let server = ApiError::Server {
            status: 503,
            detail: "unavailable".into(),
        };
        let decode = ApiError::Decode("bad json".into());

        assert_eq!(transport.retry_budget(2), 2);
        assert_eq!(client.retry_budget(2), 0);
        assert_eq!(server.retry_budget(2), 1);
        assert_eq!(decode.retry_budget(2), 0);
    }
}
