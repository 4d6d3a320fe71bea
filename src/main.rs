use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use socview::cache::FetchState;
use socview::config::SocviewConfig;
use socview::encode;
use socview::model::{AlertSeverity, AlertStatus, LogSeverity, LogSource};
use socview::query::{AlertQuery, LogQuery, LogSearch, Pagination, TimelineQuery};
use socview::DashboardSession;

#[derive(Parser)]
#[command(
    name = "socview",
    about = "Headless sync and chart-encoding client for SOC analytics dashboards",
    version,
    long_about = None
)]
struct Cli {
    /// Config file path (overrides SOCVIEW_CONFIG and system locations)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show aggregate dashboard metrics
    Metrics {
        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// List alerts
    Alerts {
        /// Filter by triage status
        #[arg(long)]
        status: Option<AlertStatus>,

        /// Filter by severity
        #[arg(long)]
        severity: Option<AlertSeverity>,

        /// Maximum number of alerts
        #[arg(long, default_value = "20")]
        limit: u32,
    },

    /// Show one alert in full
    Alert {
        /// Alert id
        id: String,
    },

    /// List logs with filters and pagination
    Logs {
        /// Filter by source platform
        #[arg(long)]
        source: Option<LogSource>,

        /// Filter by severity
        #[arg(long)]
        severity: Option<LogSeverity>,

        /// 1-based page number
        #[arg(long, default_value = "1")]
        page: u32,

        /// Items per page
        #[arg(long, default_value = "20")]
        page_size: u32,
    },

    /// Full-text search over logs
    Search {
        /// Search phrase
        query: String,

        /// 1-based page number
        #[arg(long, default_value = "1")]
        page: u32,

        /// Items per page
        #[arg(long, default_value = "20")]
        page_size: u32,
    },

    /// Encoded attack timeline for a time window
    Timeline {
        /// Window start (RFC 3339), default 24h ago
        #[arg(long)]
        start: Option<DateTime<Utc>>,

        /// Window end (RFC 3339), default now
        #[arg(long)]
        end: Option<DateTime<Utc>>,

        /// Filter by source platform
        #[arg(long)]
        source: Option<LogSource>,
    },

    /// Encoded correlation graph for an alert
    Graph {
        /// Alert id
        alert_id: String,
    },

    /// Ranked model explanation for an alert
    Explain {
        /// Alert id
        alert_id: String,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Acknowledge an alert
    Ack {
        /// Alert id
        alert_id: String,
    },

    /// Move an alert to a new triage status
    SetStatus {
        /// Alert id
        alert_id: String,

        /// New status
        status: AlertStatus,
    },

    /// IP enrichment lookup
    Enrich {
        /// IP address
        ip: String,
    },

    /// Threat intel lookup for an indicator
    ThreatIntel {
        /// Indicator (hash, domain, ip)
        indicator: String,
    },

    /// Live dashboard: metrics and open alerts on an auto-refresh loop
    Watch {
        /// Seconds between screen updates
        #[arg(long, default_value = "5")]
        interval: u64,
    },
}

/// Unwrap a cache snapshot for one-shot CLI use, where stale data without a
/// successful read is not acceptable.
fn take_data<T>(state: FetchState<T>, what: &str) -> Result<Arc<T>> {
    match (state.data, state.error) {
        (Some(data), None) => Ok(data),
        (Some(_), Some(err)) | (None, Some(err)) => bail!("{what}: {err}"),
        (None, None) => bail!("{what}: no data"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(path) => SocviewConfig::load(path)?,
        None => SocviewConfig::load_or_default(),
    };
    let session = DashboardSession::new(cfg)?;

    match cli.command {
        Commands::Metrics { json } => {
            let metrics = take_data(session.metrics().await, "metrics")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&*metrics)?);
            } else {
                println!("\nSOC Dashboard Metrics");
                println!("{:<22} | Value", "Counter");
                println!("{:-<22}-|-{:-<12}", "", "");
                println!("{:<22} | {}", "total_logs", metrics.total_logs);
                println!("{:<22} | {}", "total_alerts", metrics.total_alerts);
                println!("{:<22} | {}", "critical_alerts", metrics.critical_alerts);
                println!("{:<22} | {}", "open_investigations", metrics.open_investigations);
                println!("{:<22} | {}", "devices_monitored", metrics.devices_monitored);
                println!("{:<22} | {:.1}", "threat_score", metrics.threat_score);
                println!();
            }
        }
        Commands::Alerts {
            status,
            severity,
            limit,
        } => {
            let q = AlertQuery {
                status,
                severity,
                limit: Some(limit),
            };
            let page = take_data(session.alerts(q).await, "alerts")?;
            if page.items.is_empty() {
                println!("No alerts found.");
            } else {
                println!("{:<14} | {:<8} | {:<13} | Title", "Id", "Severity", "Status");
                println!("{:-<14}-|-{:-<8}-|-{:-<13}-|-{:-<40}", "", "", "", "");
                for alert in &page.items {
                    println!(
                        "{:<14} | {:<8} | {:<13} | {}",
                        alert.id, alert.severity, alert.status, alert.title
                    );
                }
                println!("({} of {} alerts)", page.items.len(), page.total);
            }
        }
        Commands::Alert { id } => {
            let alert = take_data(session.alert(&id).await, "alert")?;
            println!("{}", serde_json::to_string_pretty(&*alert)?);
        }
        Commands::Logs {
            source,
            severity,
            page,
            page_size,
        } => {
            let q = LogQuery { source, severity };
            let max = session.config().query.max_page_size;
            let window = Pagination::new(page, page_size, max)?;
            let logs = take_data(session.logs(q, window).await, "logs")?;
            print_log_page(&logs);
        }
        Commands::Search {
            query,
            page,
            page_size,
        } => {
            let max = session.config().query.max_page_size;
            let window = Pagination::new(page, page_size, max)?;
            let search = LogSearch::new(query, &window);
            let logs = take_data(session.search_logs(search).await, "search")?;
            print_log_page(&logs);
        }
        Commands::Timeline { start, end, source } => {
            let end = end.unwrap_or_else(Utc::now);
            let start = start.unwrap_or(end - chrono::Duration::hours(24));
            let q = TimelineQuery { start, end, source };
            let events = take_data(session.timeline(q).await, "timeline")?;
            let points = encode::encode_timeline(&events);
            println!("{}", serde_json::to_string_pretty(&points)?);
        }
        Commands::Graph { alert_id } => {
            let graph = take_data(session.graph(&alert_id).await, "graph")?;
            let model = encode::encode_graph(&graph);
            if model.dropped_edges > 0 {
                tracing::warn!(
                    dropped = model.dropped_edges,
                    "graph contained edges referencing missing nodes"
                );
            }
            println!("{}", serde_json::to_string_pretty(&model)?);
        }
        Commands::Explain { alert_id, json } => {
            let explanation = take_data(session.explanation(&alert_id).await, "explanation")?;
            let ranked = encode::rank_features(&explanation.features);
            if json {
                println!("{}", serde_json::to_string_pretty(&ranked)?);
            } else {
                println!("\nModel: {}", explanation.model);
                println!("Confidence: {:.1}%", explanation.confidence * 100.0);
                println!("\n{}", explanation.reasoning);
                println!("\n{:<28} | {:>7} | {:<6} | Direction", "Feature", "Impact", "Band");
                println!("{:-<28}-|-{:-<7}-|-{:-<6}-|-{:-<10}", "", "", "", "");
                for feature in &ranked {
                    println!(
                        "{:<28} | {:>6.0}% | {:<6} | {:?}",
                        feature.name,
                        feature.impact.abs() * 100.0,
                        format!("{:?}", feature.band).to_lowercase(),
                        feature.direction
                    );
                }
                println!();
            }
        }
        Commands::Ack { alert_id } => {
            session.acknowledge_alert(&alert_id).await?;
            println!("Alert {alert_id} acknowledged.");
        }
        Commands::SetStatus { alert_id, status } => {
            session.set_alert_status(&alert_id, status).await?;
            println!("Alert {alert_id} moved to {status}.");
        }
        Commands::Enrich { ip } => {
            let value = take_data(session.ip_enrichment(&ip).await, "enrichment")?;
            println!("{}", serde_json::to_string_pretty(&*value)?);
        }
        Commands::ThreatIntel { indicator } => {
            let value = take_data(session.threat_intel(&indicator).await, "threat intel")?;
            println!("{}", serde_json::to_string_pretty(&*value)?);
        }
        Commands::Watch { interval } => {
            watch(&session, Duration::from_secs(interval.max(1))).await?;
        }
    }

    Ok(())
}

fn print_log_page(page: &socview::model::PaginatedResponse<socview::model::Log>) {
    if page.items.is_empty() {
        println!("No logs found.");
        return;
    }
    println!(
        "{:<14} | {:<20} | {:<8} | {:<8} | Message",
        "Id", "Timestamp", "Source", "Severity"
    );
    println!(
        "{:-<14}-|-{:-<20}-|-{:-<8}-|-{:-<8}-|-{:-<40}",
        "", "", "", "", ""
    );
    for log in &page.items {
        println!(
            "{:<14} | {:<20} | {:<8} | {:<8} | {}",
            log.id,
            log.timestamp.format("%Y-%m-%d %H:%M:%S"),
            log.source,
            log.severity,
            log.message
        );
    }
    println!(
        "(page {}/{}, {} total logs)",
        page.page, page.pages, page.total
    );
}

/// Refresh loop for the terminal dashboard. The scheduler keeps the metrics
/// and open-alert entries warm in the background; this loop only reads the
/// cache, so a backend outage degrades to stale data instead of a crash.
async fn watch(session: &DashboardSession, interval: Duration) -> Result<()> {
    session.start_auto_refresh();
    tracing::info!("watching; press Ctrl-C to stop");

    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                let (metrics, alerts) =
                    futures::join!(session.metrics(), session.open_alert_feed());

                match metrics.data {
                    Some(m) => println!(
                        "[{}] logs={} alerts={} critical={} open={} threat={:.1}{}",
                        Utc::now().format("%H:%M:%S"),
                        m.total_logs,
                        m.total_alerts,
                        m.critical_alerts,
                        m.open_investigations,
                        m.threat_score,
                        if metrics.error.is_some() { " (stale)" } else { "" },
                    ),
                    None => println!(
                        "[{}] metrics unavailable: {}",
                        Utc::now().format("%H:%M:%S"),
                        metrics.error.as_deref().unwrap_or("loading")
                    ),
                }

                if let Some(feed) = alerts.data {
                    for alert in &feed.items {
                        println!("  {:<8} {:<13} {}", alert.severity.to_string(), alert.status.to_string(), alert.title);
                    }
                }
            }
        }
    }

    session.stop_auto_refresh();
    Ok(())
}
