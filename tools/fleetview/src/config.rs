use crate::classifier::ClassifierPolicy;
use crate::errors::FleetviewError;
use crate::runtime::FileSystem;
use crate::types::FetchErrorPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

pub const ENDPOINTS_ENV: &str = "FLEETVIEW_ENDPOINTS";

#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub endpoints: Vec<String>,
    pub refresh_interval_seconds: Option<u64>,
    pub fetch_timeout_seconds: Option<u64>,
    pub route_unhealthy: bool,
    pub on_fetch_error: Option<FetchErrorPolicy>,
    pub log_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub endpoints: Vec<EndpointConfig>,
    pub refresh: RefreshConfig,
    pub classifier: ClassifierConfig,
    pub ui: UiConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointConfig {
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password_env: Option<String>,
    #[serde(default)]
    pub insecure_skip_verify: bool,
    /// Resolved from `password_env` by [`load_config`]; never read from or
    /// written to the config file.
    #[serde(skip)]
    pub password: Option<String>,
}

impl EndpointConfig {
    pub fn from_url(url: &str) -> Self {
        Self {
            url: url.trim().to_string(),
            username: None,
            password_env: None,
            insecure_skip_verify: false,
            password: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshConfig {
    pub interval_seconds: u64,
    pub fetch_timeout_seconds: u64,
    pub on_fetch_error: FetchErrorPolicy,
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassifierConfig {
    pub route_unhealthy: bool,
}

impl ClassifierConfig {
    pub fn policy(&self) -> ClassifierPolicy {
        ClassifierPolicy {
            route_unhealthy: self.route_unhealthy,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UiConfig {
    pub tick_millis: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    pub path: PathBuf,
    pub max_payload_bytes: usize,
    pub budget_bytes: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            refresh: RefreshConfig {
                interval_seconds: 10,
                fetch_timeout_seconds: 10,
                on_fetch_error: FetchErrorPolicy::Stale,
            },
            classifier: ClassifierConfig {
                route_unhealthy: false,
            },
            ui: UiConfig { tick_millis: 1000 },
            logging: LoggingConfig {
                path: PathBuf::from(".cache/fleetview/fleetview.jsonl"),
                max_payload_bytes: 4096,
                budget_bytes: crate::logging::DEFAULT_DISK_BUDGET_BYTES,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialAppConfig {
    endpoints: Option<Vec<EndpointConfig>>,
    refresh: Option<PartialRefreshConfig>,
    classifier: Option<PartialClassifierConfig>,
    ui: Option<PartialUiConfig>,
    logging: Option<PartialLoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialRefreshConfig {
    interval_seconds: Option<u64>,
    fetch_timeout_seconds: Option<u64>,
    on_fetch_error: Option<FetchErrorPolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialClassifierConfig {
    route_unhealthy: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialUiConfig {
    tick_millis: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialLoggingConfig {
    path: Option<PathBuf>,
    max_payload_bytes: Option<usize>,
    budget_bytes: Option<u64>,
}

pub type EnvMap = BTreeMap<String, String>;

/// Layers defaults, the TOML file, the environment and CLI flags, in that
/// order, then validates the result.
pub fn load_config(
    overrides: &CliOverrides,
    env: &EnvMap,
    fs: &dyn FileSystem,
) -> Result<AppConfig, FleetviewError> {
    let mut cfg = AppConfig::default();

    if let Some(path) = &overrides.config_path {
        let file_contents = fs.read_to_string(path)?;
        let partial: PartialAppConfig = toml::from_str(&file_contents)
            .map_err(|e| FleetviewError::ConfigParse(e.to_string()))?;
        merge_partial_config(&mut cfg, partial);
    }

    apply_env(&mut cfg, env);
    apply_cli_overrides(&mut cfg, overrides);
    validate_config(&cfg)?;
    resolve_passwords(&mut cfg, env)?;
    Ok(cfg)
}

fn merge_partial_config(cfg: &mut AppConfig, partial: PartialAppConfig) {
    if let Some(endpoints) = partial.endpoints {
        cfg.endpoints = endpoints;
    }

    if let Some(refresh) = partial.refresh {
        if let Some(value) = refresh.interval_seconds {
            cfg.refresh.interval_seconds = value;
        }
        if let Some(value) = refresh.fetch_timeout_seconds {
            cfg.refresh.fetch_timeout_seconds = value;
        }
        if let Some(value) = refresh.on_fetch_error {
            cfg.refresh.on_fetch_error = value;
        }
    }

    if let Some(classifier) = partial.classifier {
        if let Some(value) = classifier.route_unhealthy {
            cfg.classifier.route_unhealthy = value;
        }
    }

    if let Some(ui) = partial.ui {
        if let Some(value) = ui.tick_millis {
            cfg.ui.tick_millis = value;
        }
    }

    if let Some(logging) = partial.logging {
        if let Some(value) = logging.path {
            cfg.logging.path = value;
        }
        if let Some(value) = logging.max_payload_bytes {
            cfg.logging.max_payload_bytes = value;
        }
        if let Some(value) = logging.budget_bytes {
            cfg.logging.budget_bytes = value;
        }
    }
}

fn apply_env(cfg: &mut AppConfig, env: &EnvMap) {
    if !cfg.endpoints.is_empty() {
        return;
    }
    if let Some(value) = env.get(ENDPOINTS_ENV) {
        cfg.endpoints = split_endpoints(value);
    }
}

fn apply_cli_overrides(cfg: &mut AppConfig, overrides: &CliOverrides) {
    if !overrides.endpoints.is_empty() {
        cfg.endpoints = overrides
            .endpoints
            .iter()
            .flat_map(|value| split_endpoints(value))
            .collect();
    }
    if let Some(value) = overrides.refresh_interval_seconds {
        cfg.refresh.interval_seconds = value;
    }
    if let Some(value) = overrides.fetch_timeout_seconds {
        cfg.refresh.fetch_timeout_seconds = value;
    }
    if overrides.route_unhealthy {
        cfg.classifier.route_unhealthy = true;
    }
    if let Some(value) = overrides.on_fetch_error {
        cfg.refresh.on_fetch_error = value;
    }
    if let Some(path) = &overrides.log_path {
        cfg.logging.path = path.clone();
    }
}

fn split_endpoints(value: &str) -> Vec<EndpointConfig> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(EndpointConfig::from_url)
        .collect()
}

fn resolve_passwords(cfg: &mut AppConfig, env: &EnvMap) -> Result<(), FleetviewError> {
    for endpoint in &mut cfg.endpoints {
        let Some(var) = &endpoint.password_env else {
            continue;
        };
        let password = env.get(var).ok_or_else(|| {
            FleetviewError::InvalidConfig(format!(
                "password env var {var} for {} is not set",
                endpoint.url
            ))
        })?;
        endpoint.password = Some(password.clone());
    }
    Ok(())
}

fn validate_config(cfg: &AppConfig) -> Result<(), FleetviewError> {
    if cfg.endpoints.is_empty() {
        return Err(FleetviewError::InvalidConfig(format!(
            "at least one endpoint is required (--endpoint, [[endpoints]] or {ENDPOINTS_ENV})"
        )));
    }

    for endpoint in &cfg.endpoints {
        let url = endpoint.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(FleetviewError::InvalidConfig(format!(
                "endpoint url must start with http:// or https://: {url:?}"
            )));
        }
        if endpoint.password_env.is_some() && endpoint.username.is_none() {
            return Err(FleetviewError::InvalidConfig(format!(
                "endpoint {url} sets password_env without username"
            )));
        }
    }

    if cfg.refresh.interval_seconds == 0 {
        return Err(FleetviewError::InvalidConfig(
            "refresh.interval_seconds must be greater than zero".to_string(),
        ));
    }

    if cfg.refresh.fetch_timeout_seconds == 0 {
        return Err(FleetviewError::InvalidConfig(
            "refresh.fetch_timeout_seconds must be greater than zero".to_string(),
        ));
    }

    if cfg.ui.tick_millis == 0 {
        return Err(FleetviewError::InvalidConfig(
            "ui.tick_millis must be greater than zero".to_string(),
        ));
    }

    Ok(())
}
