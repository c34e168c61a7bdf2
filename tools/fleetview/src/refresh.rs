use crate::classifier::{classify_batch, ClassifierPolicy};
use crate::dashboard::{RefreshStamp, SharedDashboard};
use crate::errors::FleetviewError;
use crate::fetch::WorkloadSource;
use crate::logging::JsonlLogger;
use crate::runtime::Clock;
use crate::types::{FetchErrorPolicy, WorkloadRecord, PANE_COUNT};
use chrono::{DateTime, Local};
use crossbeam_channel::Sender;
use serde_json::json;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    pub cycle: u64,
    pub counts: [usize; PANE_COUNT],
    pub dropped: usize,
    pub duration: Duration,
    pub failures: Vec<FleetviewError>,
    pub applied: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshEvent {
    Completed(RefreshReport),
    Fatal(FleetviewError),
}

pub struct RefreshLoop {
    sources: Vec<Arc<dyn WorkloadSource>>,
    state: SharedDashboard,
    clock: Arc<dyn Clock>,
    classifier: ClassifierPolicy,
    on_fetch_error: FetchErrorPolicy,
    interval: Duration,
    logger: Option<JsonlLogger>,
    last_good: Vec<Option<Vec<WorkloadRecord>>>,
    cycle: u64,
}

impl RefreshLoop {
    pub fn new(
        sources: Vec<Arc<dyn WorkloadSource>>,
        state: SharedDashboard,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> Self {
        let last_good = vec![None; sources.len()];
        Self {
            sources,
            state,
            clock,
            classifier: ClassifierPolicy::default(),
            on_fetch_error: FetchErrorPolicy::Stale,
            interval,
            logger: None,
            last_good,
            cycle: 0,
        }
    }

    pub fn with_classifier(mut self, classifier: ClassifierPolicy) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_fetch_error_policy(mut self, policy: FetchErrorPolicy) -> Self {
        self.on_fetch_error = policy;
        self
    }

    pub fn with_logger(mut self, logger: JsonlLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// One fetch → classify → replace pass. Fetching and classification run
    /// without the lock; the lock is held only while every pane is replaced.
    ///
    /// Under [`FetchErrorPolicy::Fatal`] the first failing endpoint aborts the
    /// cycle before any state is touched. Under [`FetchErrorPolicy::Stale`] a
    /// failing endpoint contributes its last good batch and is listed as
    /// stale.
    pub fn run_cycle(&mut self) -> Result<RefreshReport, FleetviewError> {
        self.cycle += 1;
        let started = self.clock.now();
        let mut records = Vec::new();
        let mut failures = Vec::new();
        let mut stale = Vec::new();

        for (idx, source) in self.sources.iter().enumerate() {
            match source.fetch_workloads() {
                Ok(batch) => {
                    records.extend(batch.iter().cloned());
                    self.last_good[idx] = Some(batch);
                }
                Err(err) => {
                    if self.on_fetch_error == FetchErrorPolicy::Fatal {
                        self.log_error("refresh_fatal", json!({
                            "cycle": self.cycle,
                            "endpoint": source.endpoint(),
                            "error": err.to_string(),
                        }));
                        return Err(err);
                    }
                    self.log_warn("fetch_failed", json!({
                        "cycle": self.cycle,
                        "endpoint": source.endpoint(),
                        "error": err.to_string(),
                    }));
                    if let Some(previous) = &self.last_good[idx] {
                        records.extend(previous.iter().cloned());
                    }
                    stale.push(source.endpoint().to_string());
                    failures.push(err);
                }
            }
        }

        let nothing_fresh = !self.sources.is_empty() && failures.len() == self.sources.len();
        let batch = classify_batch(records, self.classifier);
        let counts = batch.counts();
        let dropped = batch.dropped;

        let duration = {
            let mut state = self.state.lock();
            let finished = self.clock.now();
            let duration = finished.duration_since(started).unwrap_or_default();
            let stamp = RefreshStamp {
                finished_at: format_stamp(finished),
                duration,
            };
            if nothing_fresh {
                state.mark_stale(stamp, stale);
            } else {
                state.apply_batch(batch, stamp, stale);
            }
            duration
        };

        self.log_info("refresh_completed", json!({
            "cycle": self.cycle,
            "counts": counts,
            "dropped": dropped,
            "failed": failures.len(),
            "duration_ms": duration.as_millis() as u64,
        }));

        Ok(RefreshReport {
            cycle: self.cycle,
            counts,
            dropped,
            duration,
            failures,
            applied: !nothing_fresh,
        })
    }

    /// Runs cycles on a fixed cadence until the receiver goes away, a fatal
    /// error occurs, or `max_cycles` is reached.
    pub fn run(mut self, events: &Sender<RefreshEvent>, max_cycles: Option<u64>) {
        let mut completed = 0u64;
        loop {
            let started = self.clock.now();
            let event = match self.run_cycle() {
                Ok(report) => RefreshEvent::Completed(report),
                Err(err) => RefreshEvent::Fatal(err),
            };
            let fatal = matches!(event, RefreshEvent::Fatal(_));
            if events.send(event).is_err() || fatal {
                return;
            }
            completed += 1;
            if max_cycles.is_some_and(|max| completed >= max) {
                return;
            }
            if let Err(err) = self.clock.sleep_until(started + self.interval) {
                let _ = events.send(RefreshEvent::Fatal(err));
                return;
            }
        }
    }

    pub fn spawn(self, events: Sender<RefreshEvent>) -> Result<JoinHandle<()>, FleetviewError> {
        std::thread::Builder::new()
            .name("fleetview-refresh".to_string())
            .spawn(move || self.run(&events, None))
            .map_err(|e| FleetviewError::Io(e.to_string()))
    }

    fn log_info(&self, event_type: &str, payload: serde_json::Value) {
        let result = self.logger.as_ref().map(|l| l.info(event_type, payload));
        self.note_log_result(result);
    }

    fn log_warn(&self, event_type: &str, payload: serde_json::Value) {
        let result = self.logger.as_ref().map(|l| l.warn(event_type, payload));
        self.note_log_result(result);
    }

    fn log_error(&self, event_type: &str, payload: serde_json::Value) {
        let result = self.logger.as_ref().map(|l| l.error(event_type, payload));
        self.note_log_result(result);
    }

    // Log write failures surface in the status line; the refresh itself goes on.
    fn note_log_result(&self, result: Option<Result<(), FleetviewError>>) {
        if let Some(Err(err)) = result {
            self.state.lock().set_warning(Some(format!("log: {err}")));
        }
    }
}

/// `Jan _2 15:04:05` in local time.
pub fn format_stamp(at: SystemTime) -> String {
    DateTime::<Local>::from(at).format("%b %e %H:%M:%S").to_string()
}
