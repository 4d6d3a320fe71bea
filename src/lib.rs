//! socview -- headless synchronization client for SOC analytics dashboards.
//!
//! This crate provides the data-synchronization and visual-encoding core of a
//! security-operations dashboard: typed domain entities, a REST client for the
//! analytics backend, a deduplicating stale-while-revalidate query cache with
//! background refresh, a shared session state store, and pure transformers
//! that turn telemetry into render-ready chart models.

pub mod api;
pub mod cache;
pub mod config;
pub mod encode;
pub mod model;
pub mod query;
pub mod refresh;
pub mod session;
pub mod store;

pub use session::DashboardSession;
