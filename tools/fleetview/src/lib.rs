pub mod classifier;
pub mod config;
pub mod controller;
pub mod cursor;
pub mod dashboard;
pub mod errors;
pub mod fetch;
pub mod hotkeys;
pub mod log_retention;
pub mod logging;
pub mod pane_store;
pub mod refresh;
pub mod runtime;
pub mod tui;
pub mod types;

use clap::{error::ErrorKind, CommandFactory, Parser, ValueEnum};
use classifier::classify;
use config::{load_config, AppConfig, CliOverrides, EnvMap};
use controller::Controller;
use dashboard::DashboardState;
use errors::FleetviewError;
use fetch::{MarathonSource, WorkloadSource};
use logging::{structured_fallback_line, JsonlLogger};
use refresh::{RefreshEvent, RefreshLoop};
use runtime::{Canvas, Clock, EventSource, ProductionRuntime};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tui::{CrosstermEvents, TerminalCanvas};

/// `--list` label for records that match no pane.
pub const DROPPED_LABEL: &str = "dropped";
use types::FetchErrorPolicy;

#[derive(Debug, Clone, Parser)]
#[command(name = "fleetview", version)]
#[command(about = "Live terminal dashboard for Marathon application status")]
pub struct Cli {
    #[arg(long)]
    pub config: Option<std::path::PathBuf>,
    /// Marathon base URL; repeat or comma-separate for several clusters.
    #[arg(long = "endpoint")]
    pub endpoints: Vec<String>,
    #[arg(long = "refresh-interval")]
    pub refresh_interval: Option<u64>,
    #[arg(long = "fetch-timeout")]
    pub fetch_timeout: Option<u64>,
    #[arg(long, default_value_t = false)]
    pub route_unhealthy: bool,
    #[arg(long, value_enum)]
    pub on_fetch_error: Option<CliFetchErrorPolicy>,
    #[arg(long)]
    pub log_path: Option<std::path::PathBuf>,
    /// Fetch once, print every classified application and exit.
    #[arg(long, default_value_t = false)]
    pub list: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliFetchErrorPolicy {
    Stale,
    Fatal,
}

impl From<CliFetchErrorPolicy> for FetchErrorPolicy {
    fn from(value: CliFetchErrorPolicy) -> Self {
        match value {
            CliFetchErrorPolicy::Stale => FetchErrorPolicy::Stale,
            CliFetchErrorPolicy::Fatal => FetchErrorPolicy::Fatal,
        }
    }
}

pub fn run() -> Result<i32, FleetviewError> {
    let args = std::env::args_os().collect::<Vec<_>>();
    let env = std::env::vars_os().collect::<Vec<_>>();
    let runtime = ProductionRuntime::new();
    run_with_runtime(&args, &env, &runtime)
}

pub fn run_with_runtime(
    args: &[std::ffi::OsString],
    env: &[(std::ffi::OsString, std::ffi::OsString)],
    runtime: &ProductionRuntime,
) -> Result<i32, FleetviewError> {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{error}");
                return Ok(0);
            }
            _ => return Err(FleetviewError::Cli(error.to_string())),
        },
    };

    let overrides = CliOverrides {
        config_path: cli.config.clone(),
        endpoints: cli.endpoints.clone(),
        refresh_interval_seconds: cli.refresh_interval,
        fetch_timeout_seconds: cli.fetch_timeout,
        route_unhealthy: cli.route_unhealthy,
        on_fetch_error: cli.on_fetch_error.map(Into::into),
        log_path: cli.log_path.clone(),
    };
    let cfg = load_config(&overrides, &env_to_map(env), runtime.file_system.as_ref())?;
    let sources = build_sources(&cfg)?;

    if cli.list {
        let mut stdout = std::io::stdout();
        run_list(&cfg, sources, &mut stdout)?;
        return Ok(0);
    }

    if !std::io::IsTerminal::is_terminal(&std::io::stdout()) {
        return Err(FleetviewError::Render(
            "the dashboard needs an interactive terminal; use --list for plain output".to_string(),
        ));
    }

    let logger = JsonlLogger::from_config(&cfg.logging);
    let canvas = TerminalCanvas::enter()?;
    run_dashboard(&cfg, sources, runtime.clock.clone(), canvas, CrosstermEvents, Some(logger))?;
    Ok(0)
}

pub fn build_sources(cfg: &AppConfig) -> Result<Vec<Arc<dyn WorkloadSource>>, FleetviewError> {
    cfg.endpoints
        .iter()
        .map(|endpoint| {
            MarathonSource::new(endpoint, cfg.refresh.fetch_timeout())
                .map(|source| Arc::new(source) as Arc<dyn WorkloadSource>)
        })
        .collect()
}

/// Wires the refresh worker to the UI loop and blocks until the operator
/// quits or a fatal error arrives.
pub fn run_dashboard<C: Canvas, E: EventSource>(
    cfg: &AppConfig,
    sources: Vec<Arc<dyn WorkloadSource>>,
    clock: Arc<dyn Clock>,
    canvas: C,
    events: E,
    logger: Option<JsonlLogger>,
) -> Result<(), FleetviewError> {
    let (width, height) = canvas.size()?;
    let state = DashboardState::shared(width, height);
    let endpoints = sources
        .iter()
        .map(|source| source.endpoint().to_string())
        .collect::<Vec<_>>();

    if let Some(logger) = &logger {
        logger.info(
            "startup",
            json!({
                "endpoints": endpoints,
                "interval_seconds": cfg.refresh.interval_seconds,
                "on_fetch_error": cfg.refresh.on_fetch_error.as_str(),
            }),
        )?;
    }

    let mut refresh = RefreshLoop::new(sources, state.clone(), clock, cfg.refresh.interval())
        .with_classifier(cfg.classifier.policy())
        .with_fetch_error_policy(cfg.refresh.on_fetch_error);
    if let Some(logger) = &logger {
        refresh = refresh.with_logger(logger.clone());
    }

    let (tx, rx) = crossbeam_channel::unbounded::<RefreshEvent>();
    let _worker = refresh.spawn(tx)?;

    let mut controller = Controller::new(
        state,
        canvas,
        events,
        rx,
        Duration::from_millis(cfg.ui.tick_millis),
    );
    let result = controller.run();

    if let Some(logger) = &logger {
        let payload = match &result {
            Ok(()) => json!({"reason": "quit"}),
            Err(err) => json!({"reason": "error", "error": err.to_string()}),
        };
        logger.info("shutdown", payload)?;
    }
    result
}

/// Fetches every endpoint once and prints each record in fetch order as
/// `{pane}\t{record}`. Records no pane accepts are printed under `dropped`.
/// The first fetch failure aborts the listing.
pub fn run_list(
    cfg: &AppConfig,
    sources: Vec<Arc<dyn WorkloadSource>>,
    out: &mut dyn Write,
) -> Result<(), FleetviewError> {
    let policy = cfg.classifier.policy();
    let mut dropped = 0usize;
    for source in &sources {
        for record in source.fetch_workloads()? {
            let label = match classify(&record, policy) {
                Some(pane) => pane.as_str(),
                None => {
                    dropped += 1;
                    DROPPED_LABEL
                }
            };
            writeln!(out, "{label}\t{}", record.display_line())
                .map_err(|e| FleetviewError::Io(e.to_string()))?;
        }
    }
    if dropped > 0 {
        writeln!(
            out,
            "{}",
            structured_fallback_line("classifier", "dropped", &format!("{dropped} unrouted"))
        )
        .map_err(|e| FleetviewError::Io(e.to_string()))?;
    }
    Ok(())
}

pub fn render_help() -> String {
    let mut cmd = Cli::command();
    cmd.render_long_help().to_string()
}

fn env_to_map(env: &[(std::ffi::OsString, std::ffi::OsString)]) -> EnvMap {
    let mut map = EnvMap::new();
    for (key, value) in env {
        if let (Some(key), Some(value)) = (key.to_str(), value.to_str()) {
            map.insert(key.to_string(), value.to_string());
        }
    }
    map
}
