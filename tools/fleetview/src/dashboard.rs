use crate::classifier::ClassifiedBatch;
use crate::cursor::{Navigation, SelectionCursor};
use crate::pane_store::{page_size_for_height, PaneStore};
use crate::types::{Pane, WorkloadRecord, PANE_COUNT};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

pub type SharedDashboard = Arc<Mutex<DashboardState>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshStamp {
    /// Wall-clock time the refresh finished, already formatted for display.
    pub finished_at: String,
    pub duration: Duration,
}

/// Everything the UI and the refresh worker share. Callers hold the
/// [`SharedDashboard`] lock for every mutation.
#[derive(Debug, Clone)]
pub struct DashboardState {
    panes: [PaneStore; PANE_COUNT],
    cursor: SelectionCursor,
    viewport: (u16, u16),
    last_refresh: Option<RefreshStamp>,
    stale_endpoints: Vec<String>,
    warning: Option<String>,
    refresh_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneSnapshot {
    pub pane: Pane,
    pub rows: Vec<WorkloadRecord>,
    pub highlight: Option<usize>,
    pub active: bool,
    pub page_index: usize,
    pub page_count: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSnapshot {
    pub panes: Vec<PaneSnapshot>,
    pub last_refresh: Option<RefreshStamp>,
    pub stale_endpoints: Vec<String>,
    pub warning: Option<String>,
    pub loaded: bool,
}

impl DashboardState {
    pub fn new(width: u16, height: u16) -> Self {
        let page_size = page_size_for_height(height);
        Self {
            panes: [
                PaneStore::new(page_size),
                PaneStore::new(page_size),
                PaneStore::new(page_size),
            ],
            cursor: SelectionCursor::default(),
            viewport: (width, height),
            last_refresh: None,
            stale_endpoints: Vec::new(),
            warning: None,
            refresh_count: 0,
        }
    }

    pub fn shared(width: u16, height: u16) -> SharedDashboard {
        Arc::new(Mutex::new(Self::new(width, height)))
    }

    /// Replaces every pane from one classified batch in a single step, then
    /// brings the cursor back inside the new data.
    pub fn apply_batch(&mut self, batch: ClassifiedBatch, stamp: RefreshStamp, stale_endpoints: Vec<String>) {
        for (store, records) in self.panes.iter_mut().zip(batch.panes) {
            store.replace(records);
        }
        self.cursor.reconcile(&mut self.panes);
        self.last_refresh = Some(stamp);
        self.stale_endpoints = stale_endpoints;
        self.refresh_count += 1;
    }

    /// Records a cycle in which no data could be applied at all.
    pub fn mark_stale(&mut self, stamp: RefreshStamp, stale_endpoints: Vec<String>) {
        self.last_refresh = Some(stamp);
        self.stale_endpoints = stale_endpoints;
    }

    pub fn set_warning(&mut self, warning: Option<String>) {
        self.warning = warning;
    }

    pub fn navigate(&mut self, nav: Navigation) {
        self.cursor.apply(nav, &mut self.panes);
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.viewport = (width, height);
        let page_size = page_size_for_height(height);
        for store in &mut self.panes {
            store.set_page_size(page_size);
        }
        self.cursor.reconcile(&mut self.panes);
    }

    pub fn pane(&self, pane: Pane) -> &PaneStore {
        &self.panes[pane.index()]
    }

    pub fn cursor(&self) -> SelectionCursor {
        self.cursor
    }

    pub fn selected(&self) -> Option<&WorkloadRecord> {
        self.cursor.selected(&self.panes)
    }

    pub fn viewport(&self) -> (u16, u16) {
        self.viewport
    }

    pub fn refresh_count(&self) -> u64 {
        self.refresh_count
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        let active = self.cursor.active_pane();
        let panes = Pane::ALL
            .iter()
            .map(|&pane| {
                let store = &self.panes[pane.index()];
                PaneSnapshot {
                    pane,
                    rows: store.current_page().to_vec(),
                    highlight: store.highlight(),
                    active: pane == active,
                    page_index: store.page_index(),
                    page_count: store.page_count(),
                    total: store.len(),
                }
            })
            .collect();
        DashboardSnapshot {
            panes,
            last_refresh: self.last_refresh.clone(),
            stale_endpoints: self.stale_endpoints.clone(),
            warning: self.warning.clone(),
            loaded: self.refresh_count > 0,
        }
    }
}

impl DashboardSnapshot {
    pub fn status_line(&self) -> String {
        let mut status = match &self.last_refresh {
            Some(stamp) => format!("{} ({}ms)", stamp.finished_at, stamp.duration.as_millis()),
            None => "Loading...".to_string(),
        };
        if !self.stale_endpoints.is_empty() {
            status.push_str(&format!(" | stale: {}", self.stale_endpoints.join(", ")));
        }
        if let Some(warning) = &self.warning {
            status.push_str(&format!(" | {warning}"));
        }
        status
    }
}
