use crate::config::EndpointConfig;
use crate::errors::FleetviewError;
use crate::types::{Counters, WorkloadRecord};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

pub trait WorkloadSource: Send + Sync {
    fn endpoint(&self) -> &str;
    fn fetch_workloads(&self) -> Result<Vec<WorkloadRecord>, FleetviewError>;
}

#[derive(Debug, Deserialize)]
struct AppsResponse {
    #[serde(default)]
    apps: Vec<MarathonApp>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarathonApp {
    id: String,
    #[serde(default)]
    instances: Option<u32>,
    #[serde(default)]
    tasks_staged: u32,
    #[serde(default)]
    tasks_running: u32,
    #[serde(default)]
    tasks_healthy: u32,
    #[serde(default)]
    tasks_unhealthy: u32,
    #[serde(default)]
    version: String,
    #[serde(default)]
    version_info: Option<VersionInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionInfo {
    #[serde(default)]
    last_config_change_at: Option<String>,
}

impl MarathonApp {
    fn into_record(self, endpoint: &str) -> WorkloadRecord {
        WorkloadRecord {
            id: self.id,
            counters: Counters {
                staged: self.tasks_staged,
                running: self.tasks_running,
                healthy: self.tasks_healthy,
                unhealthy: self.tasks_unhealthy,
                desired_instances: self.instances.unwrap_or(0),
            },
            version: self.version,
            last_changed: self
                .version_info
                .and_then(|info| info.last_config_change_at)
                .unwrap_or_default(),
            endpoint: endpoint.to_string(),
        }
    }
}

/// Parses a `/v2/apps` response body.
pub fn parse_apps_response(body: &str, endpoint: &str) -> Result<Vec<WorkloadRecord>, FleetviewError> {
    let response: AppsResponse =
        serde_json::from_str(body).map_err(|e| FleetviewError::fetch(endpoint, e.to_string()))?;
    Ok(response
        .apps
        .into_iter()
        .map(|app| app.into_record(endpoint))
        .collect())
}

pub struct MarathonSource {
    url: String,
    username: Option<String>,
    password: Option<String>,
    client: reqwest::blocking::Client,
}

impl MarathonSource {
    pub fn new(endpoint: &EndpointConfig, timeout: Duration) -> Result<Self, FleetviewError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .danger_accept_invalid_certs(endpoint.insecure_skip_verify)
            .build()
            .map_err(|e| FleetviewError::fetch(&endpoint.url, e.to_string()))?;
        Ok(Self {
            url: endpoint.url.trim_end_matches('/').to_string(),
            username: endpoint.username.clone(),
            password: endpoint.password.clone(),
            client,
        })
    }
}

impl WorkloadSource for MarathonSource {
    fn endpoint(&self) -> &str {
        &self.url
    }

    fn fetch_workloads(&self) -> Result<Vec<WorkloadRecord>, FleetviewError> {
        let mut request = self.client.get(format!("{}/v2/apps", self.url));
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }
        let response = request
            .send()
            .map_err(|e| FleetviewError::fetch(&self.url, e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FleetviewError::fetch(&self.url, format!("http status {status}")));
        }
        let body = response
            .text()
            .map_err(|e| FleetviewError::fetch(&self.url, e.to_string()))?;
        parse_apps_response(&body, &self.url)
    }
}

/// Scripted source for tests: each fetch pops the next queued response, and
/// repeats the last one once the queue runs dry.
#[derive(Clone)]
pub struct FakeWorkloadSource {
    endpoint: String,
    responses: Arc<Mutex<VecDeque<Result<Vec<WorkloadRecord>, FleetviewError>>>>,
    last: Arc<Mutex<Option<Result<Vec<WorkloadRecord>, FleetviewError>>>>,
    calls: Arc<Mutex<usize>>,
}

impl FakeWorkloadSource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            responses: Arc::new(Mutex::new(VecDeque::new())),
            last: Arc::new(Mutex::new(None)),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn push_response(&self, response: Result<Vec<WorkloadRecord>, FleetviewError>) {
        self.responses.lock().push_back(response);
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

impl WorkloadSource for FakeWorkloadSource {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn fetch_workloads(&self) -> Result<Vec<WorkloadRecord>, FleetviewError> {
        *self.calls.lock() += 1;
        let next = self.responses.lock().pop_front();
        let mut last = self.last.lock();
        if let Some(response) = next {
            *last = Some(response);
        }
        match last.as_ref() {
            Some(response) => response.clone().map(|records| {
                records
                    .into_iter()
                    .map(|mut record| {
                        record.endpoint = self.endpoint.clone();
                        record
                    })
                    .collect()
            }),
            None => Err(FleetviewError::fetch(&self.endpoint, "no fake response queued")),
        }
    }
}
