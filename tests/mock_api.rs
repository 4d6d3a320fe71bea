//! Integration tests against a mock analytics backend.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use socview::api::{ApiClient, ApiError};
use socview::cache::{FetchOptions, QueryCache};
use socview::config::{ApiConfig, SocviewConfig};
use socview::model::{AlertStatus, LogSeverity, LogSource};
use socview::query::{metrics_key, LogQuery, Pagination, TimelineQuery};
use socview::DashboardSession;

#[derive(Default)]
struct MockState {
    /// Query params seen by the last log list request.
    log_params: Mutex<HashMap<String, String>>,
    /// Triage status of alert A1.
    alert_status: Mutex<String>,
    /// Requests served by the alert detail endpoint.
    detail_hits: AtomicU32,
    /// Requests served by the flaky metrics endpoint.
    metrics_hits: AtomicU32,
}

fn alert_body(status: &str) -> Value {
    json!({
        "id": "A1",
        "timestamp": "2026-08-20T10:00:00Z",
        "title": "Beaconing to known C2",
        "description": "Periodic outbound traffic to a flagged host",
        "severity": "high",
        "status": status,
        "source": "network",
        "related_logs": ["log-1", "log-2"],
        "mitre_tactics": ["TA0011"],
        "confidence": 0.93
    })
}

fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route(
            "/api/v1/logs",
            get(
                |State(state): State<Arc<MockState>>, Query(params): Query<HashMap<String, String>>| async move {
                    *state.log_params.lock().unwrap() = params;
                    Json(json!({
                        "items": [{
                            "id": "log-1",
                            "timestamp": "2026-08-20T09:59:00Z",
                            "source": "server",
                            "severity": "error",
                            "event_type": "auth_failure",
                            "message": "failed login for root"
                        }],
                        "total": 41, "page": 3, "size": 20, "pages": 3
                    }))
                },
            ),
        )
        .route(
            "/api/v1/alerts/{id}",
            get(
                |State(state): State<Arc<MockState>>, Path(id): Path<String>| async move {
                    if id != "A1" {
                        return (
                            StatusCode::NOT_FOUND,
                            Json(json!({"detail": "alert not found", "status_code": 404})),
                        );
                    }
                    state.detail_hits.fetch_add(1, Ordering::SeqCst);
                    let status = state.alert_status.lock().unwrap().clone();
                    (StatusCode::OK, Json(alert_body(&status)))
                },
            )
            .patch(
                |State(state): State<Arc<MockState>>, Path(_id): Path<String>, Json(body): Json<Value>| async move {
                    let status = body["status"].as_str().unwrap_or("open").to_string();
                    *state.alert_status.lock().unwrap() = status;
                    StatusCode::OK
                },
            ),
        )
        .route(
            "/api/v1/alerts/{id}/acknowledge",
            post(
                |State(state): State<Arc<MockState>>, Path(_id): Path<String>| async move {
                    *state.alert_status.lock().unwrap() = "acknowledged".to_string();
                    StatusCode::OK
                },
            ),
        )
        .route(
            "/api/v1/correlation/timeline",
            get(|| async {
                Json(json!([
                    {
                        "timestamp": "2026-08-20T09:00:00Z",
                        "device": "ws-042",
                        "event": "privilege_escalation",
                        "severity": 5,
                        "source": "Windows"
                    },
                    {
                        "timestamp": "2026-08-20T09:05:00Z",
                        "device": "sensor-7",
                        "event": "port_scan",
                        "severity": 2,
                        "source": "satellite"
                    }
                ]))
            }),
        )
        .route(
            "/api/v1/dashboard/metrics",
            get(|State(state): State<Arc<MockState>>| async move {
                // First request fails, exercising the server-error retry.
                if state.metrics_hits.fetch_add(1, Ordering::SeqCst) == 0 {
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({"detail": "warming up", "status_code": 500})),
                    );
                }
                (
                    StatusCode::OK,
                    Json(json!({
                        "total_logs": 120000, "total_alerts": 64, "critical_alerts": 3,
                        "open_investigations": 9, "devices_monitored": 412, "threat_score": 71.5
                    })),
                )
            }),
        )
        .with_state(state)
}

async fn serve(state: Arc<MockState>) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    addr
}

fn api_config(addr: SocketAddr) -> ApiConfig {
    ApiConfig {
        base_url: format!("http://{addr}"),
        timeout_secs: 5,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn list_logs_sends_filters_and_offset() {
    let state = Arc::new(MockState::default());
    let addr = serve(state.clone()).await;
    let client = ApiClient::new(&api_config(addr)).unwrap();

    let query = LogQuery {
        source: Some(LogSource::Server),
        severity: Some(LogSeverity::Error),
    };
    let page = Pagination::new(3, 20, 200).unwrap();
    let logs = client.list_logs(&query, &page).await.unwrap();

    assert_eq!(logs.items.len(), 1);
    assert_eq!(logs.total, 41);
    let params = state.log_params.lock().unwrap().clone();
    assert_eq!(params.get("source").map(String::as_str), Some("server"));
    assert_eq!(params.get("severity").map(String::as_str), Some("error"));
    assert_eq!(params.get("limit").map(String::as_str), Some("20"));
    assert_eq!(params.get("offset").map(String::as_str), Some("40"));
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_alert_is_a_client_error() {
    let state = Arc::new(MockState::default());
    let addr = serve(state).await;
    let client = ApiClient::new(&api_config(addr)).unwrap();

    match client.get_alert("nope").await {
        Err(ApiError::Client { status, detail }) => {
            assert_eq!(status, 404);
            assert_eq!(detail, "alert not found");
        }
        other => panic!("expected client error, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn timeline_parses_free_form_sources() {
    let state = Arc::new(MockState::default());
    let addr = serve(state).await;
    let client = ApiClient::new(&api_config(addr)).unwrap();

    let query = TimelineQuery {
        start: "2026-08-20T00:00:00Z".parse().unwrap(),
        end: "2026-08-21T00:00:00Z".parse().unwrap(),
        source: None,
    };
    let events = client.timeline(&query).await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].severity, 5);
    // Unrecognized source survives as-is; the encoder decides its lane.
    assert_eq!(events[1].source, "satellite");
}

#[tokio::test(flavor = "multi_thread")]
async fn server_error_is_retried_once_through_the_cache() {
    let state = Arc::new(MockState::default());
    let addr = serve(state.clone()).await;
    let client = ApiClient::new(&api_config(addr)).unwrap();

    let cache = QueryCache::new();
    let loader = move || {
        let client = client.clone();
        async move { client.dashboard_metrics().await }
    };
    let fetched = cache
        .resolve(&metrics_key(), &FetchOptions::default(), loader)
        .await;

    // First attempt hit the warming-up 500, the retry succeeded.
    assert_eq!(state.metrics_hits.load(Ordering::SeqCst), 2);
    assert_eq!(fetched.data.unwrap().total_alerts, 64);
}

#[tokio::test(flavor = "multi_thread")]
async fn acknowledging_an_alert_forces_a_fresh_detail_read() {
    let state = Arc::new(MockState::default());
    *state.alert_status.lock().unwrap() = "open".to_string();
    let addr = serve(state.clone()).await;

    let cfg = SocviewConfig {
        api: api_config(addr),
        ..SocviewConfig::default()
    };
    let session = DashboardSession::new(cfg).unwrap();

    let first = session.alert("A1").await;
    assert_eq!(first.data.unwrap().status, AlertStatus::Open);
    assert_eq!(state.detail_hits.load(Ordering::SeqCst), 1);

    // Cached: no extra network read.
    session.alert("A1").await;
    assert_eq!(state.detail_hits.load(Ordering::SeqCst), 1);

    session.acknowledge_alert("A1").await.unwrap();

    // The invalidated entry goes back to the network and sees the new status.
    let after = session.alert("A1").await;
    assert_eq!(state.detail_hits.load(Ordering::SeqCst), 2);
    assert_eq!(after.data.unwrap().status, AlertStatus::Acknowledged);
}

#[tokio::test(flavor = "multi_thread")]
async fn status_update_also_invalidates() {
    let state = Arc::new(MockState::default());
    *state.alert_status.lock().unwrap() = "open".to_string();
    let addr = serve(state.clone()).await;

    let cfg = SocviewConfig {
        api: api_config(addr),
        ..SocviewConfig::default()
    };
    let session = DashboardSession::new(cfg).unwrap();

    session.alert("A1").await;
    session
        .set_alert_status("A1", AlertStatus::Investigating)
        .await
        .unwrap();

    let after = session.alert("A1").await;
    assert_eq!(after.data.unwrap().status, AlertStatus::Investigating);
}
