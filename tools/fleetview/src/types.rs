use serde::{Deserialize, Serialize};

pub const PANE_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub staged: u32,
    pub running: u32,
    pub healthy: u32,
    pub unhealthy: u32,
    pub desired_instances: u32,
}

/// One workload as reported by a single fetch. Never patched in place; every
/// refresh cycle builds a fresh batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadRecord {
    pub id: String,
    pub counters: Counters,
    pub version: String,
    pub last_changed: String,
    #[serde(default)]
    pub endpoint: String,
}

impl WorkloadRecord {
    pub fn new(id: impl Into<String>, counters: Counters) -> Self {
        Self {
            id: id.into(),
            counters,
            version: String::new(),
            last_changed: String::new(),
            endpoint: String::new(),
        }
    }

    pub fn display_line(&self) -> String {
        format!(
            "{} Staged:{} Running:{} Healthy:{} Unhealthy:{} v:{} changed:{}",
            self.id,
            self.counters.staged,
            self.counters.running,
            self.counters.healthy,
            self.counters.unhealthy,
            self.version,
            self.last_changed,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pane {
    Staged,
    RunningHealthy,
    UnhealthyDeclined,
}

impl Pane {
    pub const ALL: [Pane; PANE_COUNT] = [Pane::Staged, Pane::RunningHealthy, Pane::UnhealthyDeclined];

    pub fn index(self) -> usize {
        match self {
            Self::Staged => 0,
            Self::RunningHealthy => 1,
            Self::UnhealthyDeclined => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Cyclic successor, used by pane switching.
    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % PANE_COUNT]
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Staged => "Apps Staged",
            Self::RunningHealthy => "Apps Running / Healthy",
            Self::UnhealthyDeclined => "Apps Declined / Unhealthy",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Staged => "staged",
            Self::RunningHealthy => "running_healthy",
            Self::UnhealthyDeclined => "unhealthy_declined",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchErrorPolicy {
    Stale,
    Fatal,
}

impl FetchErrorPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stale => "stale",
            Self::Fatal => "fatal",
        }
    }
}
