//! Dashboard session -- wires the API client, caches, store, and scheduler.
//!
//! One `DashboardSession` per running client. Reads flow UI state -> key
//! composer -> query cache -> API client; the resulting entities are handed
//! to the encoders by the caller. Mutations (acknowledge, status change) go
//! straight to the API and invalidate the affected cache entries on success,
//! forcing fresh reads instead of optimistic local patches.

use chrono::{Duration as ChronoDuration, Utc};
use std::time::Duration;

use crate::api::{ApiClient, ApiError};
use crate::cache::{FetchOptions, FetchState, QueryCache};
use crate::config::SocviewConfig;
use crate::model::{
    Alert, AlertStatus, CorrelationGraph, DashboardMetrics, Log, PaginatedResponse, TimelineEvent,
    XaiExplanation,
};
use crate::query::{self, AlertQuery, LogQuery, LogSearch, Pagination, TimelineQuery};
use crate::refresh::RefreshScheduler;
use crate::store::{SessionStore, UiState};

pub struct DashboardSession {
    api: ApiClient,
    pub store: SessionStore,
    cfg: SocviewConfig,
    fetch_opts: FetchOptions,
    scheduler: RefreshScheduler,

    metrics: QueryCache<DashboardMetrics>,
    alerts: QueryCache<PaginatedResponse<Alert>>,
    alert_details: QueryCache<Alert>,
    logs: QueryCache<PaginatedResponse<Log>>,
    log_details: QueryCache<Log>,
    log_search: QueryCache<PaginatedResponse<Log>>,
    timeline: QueryCache<Vec<TimelineEvent>>,
    graphs: QueryCache<CorrelationGraph>,
    explanations: QueryCache<XaiExplanation>,
    enrichment: QueryCache<serde_json::Value>,
}

impl DashboardSession {
    pub fn new(cfg: SocviewConfig) -> anyhow::Result<Self> {
        let api = ApiClient::new(&cfg.api)?;
        let fetch_opts = cfg.cache.fetch_options();
        let store = SessionStore::new();
        store.set_page(1, cfg.query.default_page_size);
        Ok(Self {
            api,
            store,
            fetch_opts,
            cfg,
            scheduler: RefreshScheduler::new(),
            metrics: QueryCache::new(),
            alerts: QueryCache::new(),
            alert_details: QueryCache::new(),
            logs: QueryCache::new(),
            log_details: QueryCache::new(),
            log_search: QueryCache::new(),
            timeline: QueryCache::new(),
            graphs: QueryCache::new(),
            explanations: QueryCache::new(),
            enrichment: QueryCache::new(),
        })
    }

    pub fn config(&self) -> &SocviewConfig {
        &self.cfg
    }

    // -- reads --------------------------------------------------------------

    pub async fn metrics(&self) -> FetchState<DashboardMetrics> {
        let api = self.api.clone();
        self.metrics
            .resolve(&query::metrics_key(), &self.fetch_opts, move || {
                let api = api.clone();
                async move { api.dashboard_metrics().await }
            })
            .await
    }

    pub async fn alerts(&self, q: AlertQuery) -> FetchState<PaginatedResponse<Alert>> {
        let api = self.api.clone();
        self.alerts
            .resolve(&query::alert_list_key(&q), &self.fetch_opts, move || {
                let api = api.clone();
                async move { api.list_alerts(&q).await }
            })
            .await
    }

    pub async fn alert(&self, id: &str) -> FetchState<Alert> {
        let api = self.api.clone();
        let owned_id = id.to_string();
        self.alert_details
            .resolve(&query::alert_detail_key(id), &self.fetch_opts, move || {
                let api = api.clone();
                let id = owned_id.clone();
                async move { api.get_alert(&id).await }
            })
            .await
    }

    pub async fn logs(&self, q: LogQuery, page: Pagination) -> FetchState<PaginatedResponse<Log>> {
        let api = self.api.clone();
        self.logs
            .resolve(&query::log_list_key(&q, &page), &self.fetch_opts, move || {
                let api = api.clone();
                async move { api.list_logs(&q, &page).await }
            })
            .await
    }

    /// Log list for the store's current filter and pagination state.
    pub async fn logs_for_view(&self) -> FetchState<PaginatedResponse<Log>> {
        let (q, page) = view_log_query(&self.store.snapshot(), self.cfg.query.max_page_size);
        self.logs(q, page).await
    }

    pub async fn log(&self, id: &str) -> FetchState<Log> {
        let api = self.api.clone();
        let owned_id = id.to_string();
        self.log_details
            .resolve(&query::log_detail_key(id), &self.fetch_opts, move || {
                let api = api.clone();
                let id = owned_id.clone();
                async move { api.get_log(&id).await }
            })
            .await
    }

    pub async fn search_logs(&self, search: LogSearch) -> FetchState<PaginatedResponse<Log>> {
        let api = self.api.clone();
        self.log_search
            .resolve(&query::log_search_key(&search), &self.fetch_opts, move || {
                let api = api.clone();
                let search = search.clone();
                async move { api.search_logs(&search).await }
            })
            .await
    }

    pub async fn timeline(&self, q: TimelineQuery) -> FetchState<Vec<TimelineEvent>> {
        let api = self.api.clone();
        self.timeline
            .resolve(&query::timeline_key(&q), &self.fetch_opts, move || {
                let api = api.clone();
                async move { api.timeline(&q).await }
            })
            .await
    }

    /// Timeline for the store's current time range, defaulting to the last
    /// 24 hours, filtered to the first selected source if any.
    pub async fn timeline_for_view(&self) -> FetchState<Vec<TimelineEvent>> {
        self.timeline(view_timeline_query(&self.store.snapshot()))
            .await
    }

    pub async fn graph(&self, alert_id: &str) -> FetchState<CorrelationGraph> {
        let api = self.api.clone();
        let owned_id = alert_id.to_string();
        self.graphs
            .resolve(&query::graph_key(alert_id), &self.fetch_opts, move || {
                let api = api.clone();
                let id = owned_id.clone();
                async move { api.correlation_graph(&id).await }
            })
            .await
    }

    pub async fn explanation(&self, alert_id: &str) -> FetchState<XaiExplanation> {
        let api = self.api.clone();
        let owned_id = alert_id.to_string();
        self.explanations
            .resolve(&query::explain_key(alert_id), &self.fetch_opts, move || {
                let api = api.clone();
                let id = owned_id.clone();
                async move { api.explain_alert(&id).await }
            })
            .await
    }

    pub async fn ip_enrichment(&self, ip: &str) -> FetchState<serde_json::Value> {
        let api = self.api.clone();
        let owned_ip = ip.to_string();
        self.enrichment
            .resolve(&query::ip_enrichment_key(ip), &self.fetch_opts, move || {
                let api = api.clone();
                let ip = owned_ip.clone();
                async move { api.enrich_ip(&ip).await }
            })
            .await
    }

    pub async fn threat_intel(&self, indicator: &str) -> FetchState<serde_json::Value> {
        let api = self.api.clone();
        let owned = indicator.to_string();
        self.enrichment
            .resolve(
                &query::threat_intel_key(indicator),
                &self.fetch_opts,
                move || {
                    let api = api.clone();
                    let indicator = owned.clone();
                    async move { api.threat_intel(&indicator).await }
                },
            )
            .await
    }

    // -- mutations ----------------------------------------------------------

    /// Acknowledge an alert. On success the alert's detail entry is
    /// invalidated and every alert list view is marked stale, so the next
    /// reads go to the network.
    pub async fn acknowledge_alert(&self, id: &str) -> Result<(), ApiError> {
        self.api.acknowledge_alert(id).await?;
        self.invalidate_alert(id);
        Ok(())
    }

    /// Move an alert to a new triage status, with the same invalidation as
    /// acknowledge.
    pub async fn set_alert_status(&self, id: &str, status: AlertStatus) -> Result<(), ApiError> {
        self.api.set_alert_status(id, status).await?;
        self.invalidate_alert(id);
        Ok(())
    }

    fn invalidate_alert(&self, id: &str) {
        self.alert_details.invalidate(&query::alert_detail_key(id));
        self.alerts.mark_stale_all();
    }

    // -- background refresh -------------------------------------------------

    /// Register the dashboard's standing refresh timers: metrics and the
    /// open-alerts feed, at their configured cadences.
    pub fn start_auto_refresh(&self) {
        let opts = self.fetch_opts;

        let api = self.api.clone();
        self.scheduler.register(
            &self.metrics,
            query::metrics_key(),
            Duration::from_secs(self.cfg.refresh.metrics_secs),
            opts,
            move || {
                let api = api.clone();
                async move { api.dashboard_metrics().await }
            },
        );

        let feed = open_alert_feed_query();
        let api = self.api.clone();
        self.scheduler.register(
            &self.alerts,
            query::alert_list_key(&feed),
            Duration::from_secs(self.cfg.refresh.alerts_secs),
            opts,
            move || {
                let api = api.clone();
                async move { api.list_alerts(&feed).await }
            },
        );
    }

    /// The open-alerts feed the auto-refresh keeps warm.
    pub async fn open_alert_feed(&self) -> FetchState<PaginatedResponse<Alert>> {
        self.alerts(open_alert_feed_query()).await
    }

    pub fn stop_auto_refresh(&self) {
        self.scheduler
            .unregister(&query::alert_list_key(&open_alert_feed_query()));
        self.scheduler.unregister(&query::metrics_key());
    }
}

/// The recent-alerts feed shown on the dashboard landing page.
fn open_alert_feed_query() -> AlertQuery {
    AlertQuery {
        status: Some(AlertStatus::Open),
        severity: None,
        limit: Some(10),
    }
}

/// Derive the log list query from UI state. The list endpoint filters on a
/// single source/severity, so the first selection wins when several are
/// checked.
fn view_log_query(state: &UiState, max_page_size: u32) -> (LogQuery, Pagination) {
    let q = LogQuery {
        source: state.selected_sources.first().copied(),
        severity: state.selected_severities.first().copied(),
    };
    let page = Pagination::new(state.page, state.page_size, max_page_size)
        .unwrap_or_else(|_| Pagination::first(state.page_size.max(1)));
    (q, page)
}

/// Derive the timeline query from UI state, defaulting to the last 24 hours.
fn view_timeline_query(state: &UiState) -> TimelineQuery {
    let (start, end) = state.time_range.unwrap_or_else(|| {
        let now = Utc::now();
        (now - ChronoDuration::hours(24), now)
    });
    TimelineQuery {
        start,
        end,
        source: state.selected_sources.first().copied(),
    }
}
