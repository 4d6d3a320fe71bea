//! Shared session state -- current selection, filters, and UI preferences.
//!
//! One injectable store per session, backed by a `tokio::sync::watch`
//! channel. The store never holds fetched domain data, only ids the user
//! selected and filter state, so cache invalidation never has to reach into
//! it. Every mutation is a single `send_modify`, which makes each change
//! atomic and gives subscribers one consistent snapshot per notification.

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::model::{LogSeverity, LogSource};
use crate::query::DEFAULT_PAGE_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

/// User-chosen selection and filter state for the whole session.
#[derive(Debug, Clone, PartialEq)]
pub struct UiState {
    pub theme: Theme,
    pub sidebar_collapsed: bool,
    /// Id of the alert the user is inspecting, if any.
    pub selected_alert: Option<String>,
    /// Id of the log the user is inspecting, if any.
    pub selected_log: Option<String>,
    pub time_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub selected_sources: Vec<LogSource>,
    pub selected_severities: Vec<LogSeverity>,
    pub page: u32,
    pub page_size: u32,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            sidebar_collapsed: false,
            selected_alert: None,
            selected_log: None,
            time_range: None,
            selected_sources: Vec::new(),
            selected_severities: Vec::new(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Process-wide mutable UI state with explicit mutation operations and
/// change notification.
pub struct SessionStore {
    tx: watch::Sender<UiState>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(UiState::default());
        Self { tx }
    }

    /// Consistent copy of the current state.
    pub fn snapshot(&self) -> UiState {
        self.tx.borrow().clone()
    }

    /// Receiver that resolves whenever any mutation lands.
    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.tx.subscribe()
    }

    pub fn set_theme(&self, theme: Theme) {
        self.tx.send_modify(|s| s.theme = theme);
    }

    pub fn toggle_sidebar(&self) {
        self.tx.send_modify(|s| s.sidebar_collapsed = !s.sidebar_collapsed);
    }

    pub fn select_alert(&self, id: Option<String>) {
        self.tx.send_modify(|s| s.selected_alert = id);
    }

    pub fn select_log(&self, id: Option<String>) {
        self.tx.send_modify(|s| s.selected_log = id);
    }

    /// Changing the time window is a filter change, so pagination rewinds.
    pub fn set_time_range(&self, range: Option<(DateTime<Utc>, DateTime<Utc>)>) {
        self.tx.send_modify(|s| {
            s.time_range = range;
            s.page = 1;
        });
    }

    pub fn set_sources(&self, sources: Vec<LogSource>) {
        self.tx.send_modify(|s| {
            s.selected_sources = sources;
            s.page = 1;
        });
    }

    pub fn set_severities(&self, severities: Vec<LogSeverity>) {
        self.tx.send_modify(|s| {
            s.selected_severities = severities;
            s.page = 1;
        });
    }

    pub fn set_page(&self, page: u32, page_size: u32) {
        self.tx.send_modify(|s| {
            s.page = page.max(1);
            s.page_size = page_size.max(1);
        });
    }

    /// Clear the time range and all selected sources/severities in one
    /// notification, rewinding to page 1. Partial reset is deliberately not
    /// exposed.
    pub fn reset_filters(&self) {
        self.tx.send_modify(|s| {
            s.time_range = None;
            s.selected_sources.clear();
            s.selected_severities.clear();
            s.page = 1;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn defaults_start_on_page_one() {
        let store = SessionStore::new();
        let state = store.snapshot();
        assert_eq!(state.page, 1);
        assert_eq!(state.theme, Theme::Light);
        assert!(state.selected_sources.is_empty());
    }

    #[test]
    fn toggle_sidebar_flips() {
        let store = SessionStore::new();
        store.toggle_sidebar();
        assert!(store.snapshot().sidebar_collapsed);
        store.toggle_sidebar();
        assert!(!store.snapshot().sidebar_collapsed);
    }

    #[test]
    fn reset_filters_clears_everything_and_rewinds_pagination() {
        let store = SessionStore::new();
        let start = Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 8, 2, 0, 0, 0).unwrap();

        store.set_time_range(Some((start, end)));
        store.set_sources(vec![LogSource::Server, LogSource::Cloud]);
        store.set_severities(vec![LogSeverity::Critical]);
        store.set_page(5, 50);

        store.reset_filters();
        let state = store.snapshot();
        assert!(state.time_range.is_none());
        assert!(state.selected_sources.is_empty());
        assert!(state.selected_severities.is_empty());
        assert_eq!(state.page, 1);
        // Page size is a preference, not a filter.
        assert_eq!(state.page_size, 50);
    }

    #[test]
    fn changing_filters_rewinds_to_page_one() {
        let store = SessionStore::new();
        store.set_page(4, 20);
        store.set_sources(vec![LogSource::Iot]);
        assert_eq!(store.snapshot().page, 1);
    }

    #[tokio::test]
    async fn subscribers_see_each_mutation() {
        let store = SessionStore::new();
        let mut rx = store.subscribe();

        store.select_alert(Some("A1".into()));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().selected_alert.as_deref(), Some("A1"));

        store.select_alert(None);
        rx.changed().await.unwrap();
        assert!(rx.borrow().selected_alert.is_none());
    }
}
