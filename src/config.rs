//! TOML configuration with compiled-in defaults.
//!
//! Layered lookup: the `SOCVIEW_CONFIG` environment variable wins, then the
//! standard system location, then defaults. A missing or broken file never
//! stops the client; it logs and falls back.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cache::FetchOptions;

/// Root configuration for the socview client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SocviewConfig {
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub refresh: RefreshConfig,
    pub query: QueryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Staleness window in seconds for cached reads.
    pub ttl_secs: u64,
    /// Immediate retries for transport failures before surfacing an error.
    pub transport_retries: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 30,
            transport_retries: 2,
        }
    }
}

impl CacheConfig {
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            ttl: Duration::from_secs(self.ttl_secs),
            transport_retries: self.transport_retries,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Background refresh cadence for dashboard metrics.
    pub metrics_secs: u64,
    /// Background refresh cadence for the open-alerts feed.
    pub alerts_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            metrics_secs: 30,
            alerts_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 200,
        }
    }
}

impl SocviewConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Try to load configuration from, in order:
    /// 1. The path in the `SOCVIEW_CONFIG` environment variable.
    /// 2. `/etc/socview/socview.toml`.
    /// 3. Compiled-in defaults.
    pub fn load_or_default() -> Self {
        if let Ok(env_path) = std::env::var("SOCVIEW_CONFIG") {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "SOCVIEW_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let system_path = Path::new("/etc/socview/socview.toml");
        if system_path.exists() {
            match Self::load(system_path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(error = %e, "system config could not be loaded, using defaults");
                }
            }
        }

        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sane() {
        let cfg = SocviewConfig::default();
        assert_eq!(cfg.api.base_url, "http://localhost:8000");
        assert_eq!(cfg.cache.ttl_secs, 30);
        assert_eq!(cfg.refresh.metrics_secs, 30);
        assert_eq!(cfg.refresh.alerts_secs, 15);
        assert_eq!(cfg.query.max_page_size, 200);
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "[api]\nbase_url = \"https://soc.example.com\"\n\n[cache]\nttl_secs = 5\n"
        )
        .unwrap();

        let cfg = SocviewConfig::load(file.path()).unwrap();
        assert_eq!(cfg.api.base_url, "https://soc.example.com");
        assert_eq!(cfg.cache.ttl_secs, 5);
        // Untouched sections keep their defaults.
        assert_eq!(cfg.api.timeout_secs, 10);
        assert_eq!(cfg.query.default_page_size, 20);
    }

    #[test]
    fn fetch_options_reflect_cache_section() {
        let cache = CacheConfig {
            ttl_secs: 7,
            transport_retries: 4,
        };
        let opts = cache.fetch_options();
        assert_eq!(opts.ttl, Duration::from_secs(7));
        assert_eq!(opts.transport_retries, 4);
    }

    #[test]
    fn broken_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "this is not toml [").unwrap();
        assert!(SocviewConfig::load(file.path()).is_err());
    }
}
