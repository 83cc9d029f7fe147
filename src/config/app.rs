// src/config/app.rs
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{extension_of, read_file, ConfigError};
use crate::ingest::cache::DEFAULT_TTL_SECS;
use crate::ingest::normalize::DIAVGEIA_DECISION_BASE;
use crate::ingest::providers::kimdis::DEFAULT_API_BASE;
use crate::ingest::providers::mock::{DEFAULT_COUNT, DEFAULT_DAYS};

pub const ENV_CONFIG_PATH: &str = "TENDER_CONFIG_PATH";
pub const DEFAULT_CONFIG_TOML: &str = "config/tender_monitor.toml";
pub const DEFAULT_CONFIG_JSON: &str = "config/tender_monitor.json";

const MAX_TIMEOUT_SECS: u64 = 300;
const MAX_MOCK_COUNT: usize = 10_000;

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_cache_ttl_secs() -> u64 {
    DEFAULT_TTL_SECS
}
fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}
fn default_disclosure_base() -> String {
    DIAVGEIA_DECISION_BASE.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockConfig {
    #[serde(default = "MockConfig::default_days")]
    pub days: u32,
    #[serde(default = "MockConfig::default_count")]
    pub count: usize,
    #[serde(default)]
    pub seed: u64,
}

impl MockConfig {
    fn default_days() -> u32 {
        DEFAULT_DAYS
    }
    fn default_count() -> usize {
        DEFAULT_COUNT
    }
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            days: DEFAULT_DAYS,
            count: DEFAULT_COUNT,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Tender API root, without the `/notice` suffix.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    /// 0 disables the query cache.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default)]
    pub org_lookup_path: Option<PathBuf>,
    #[serde(default)]
    pub mock: MockConfig,
    #[serde(default = "default_disclosure_base")]
    pub disclosure_base: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            request_timeout_secs: default_timeout_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            bind_addr: default_bind_addr(),
            org_lookup_path: None,
            mock: MockConfig::default(),
            disclosure_base: default_disclosure_base(),
        }
    }
}

impl AppConfig {
    /// Load TOML or JSON (by extension, TOML when unknown), then sanitize.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = read_file(path)?;
        let parsed: Result<AppConfig, String> = match extension_of(path).as_str() {
            "json" => serde_json::from_str(&data).map_err(|e| e.to_string()),
            _ => toml::from_str(&data).map_err(|e| e.to_string()),
        };
        let mut cfg = parsed.map_err(|reason| ConfigError::Parse {
            path: path.to_path_buf(),
            reason,
        })?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Resolve the config file:
    /// 1) $TENDER_CONFIG_PATH
    /// 2) config/tender_monitor.toml
    /// 3) config/tender_monitor.json
    ///
    /// then apply env overrides. Any file problem is logged and the defaults
    /// are used instead.
    pub fn load_default() -> Self {
        let candidate = match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) if !p.trim().is_empty() => Some(PathBuf::from(p)),
            _ => [DEFAULT_CONFIG_TOML, DEFAULT_CONFIG_JSON]
                .iter()
                .map(PathBuf::from)
                .find(|p| p.exists()),
        };

        let mut cfg = match candidate {
            Some(path) => match Self::load_from_file(&path) {
                Ok(cfg) => {
                    tracing::info!(path = %path.display(), "loaded config");
                    cfg
                }
                Err(e) => {
                    tracing::warn!(error = %e, kind = e.kind(), "config unusable, using defaults");
                    Self::default()
                }
            },
            None => Self::default(),
        };
        cfg.apply_env_overrides();
        cfg
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("TENDER_API_BASE") {
            self.api_base = v;
        }
        if let Some(v) = env_parse::<u64>("TENDER_TIMEOUT_SECS") {
            self.request_timeout_secs = v;
        }
        if let Some(v) = env_parse::<u64>("TENDER_CACHE_TTL_SECS") {
            self.cache_ttl_secs = v;
        }
        if let Ok(v) = std::env::var("TENDER_BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Ok(v) = std::env::var("TENDER_ORG_LOOKUP_PATH") {
            if !v.trim().is_empty() {
                self.org_lookup_path = Some(PathBuf::from(v));
            }
        }
        self.sanitize();
    }

    /// Put out-of-range values back to their defaults.
    pub fn sanitize(&mut self) {
        self.api_base = self.api_base.trim().trim_end_matches('/').to_string();
        if !(self.api_base.starts_with("http://") || self.api_base.starts_with("https://")) {
            self.api_base = default_api_base();
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > MAX_TIMEOUT_SECS {
            self.request_timeout_secs = default_timeout_secs();
        }
        if self.bind_addr.trim().is_empty() {
            self.bind_addr = default_bind_addr();
        }
        self.disclosure_base = self.disclosure_base.trim().trim_end_matches('/').to_string();
        if self.disclosure_base.is_empty() {
            self.disclosure_base = default_disclosure_base();
        }
        if self.mock.count == 0 || self.mock.count > MAX_MOCK_COUNT {
            self.mock.count = DEFAULT_COUNT;
        }
        if self.mock.days == 0 {
            self.mock.days = DEFAULT_DAYS;
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable env override");
            None
        }
    }
}
