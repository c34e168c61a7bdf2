use crate::types::{Pane, WorkloadRecord, PANE_COUNT};

/// Routing knobs for [`classify`].
///
/// `route_unhealthy` is off by default: the unhealthy/declined rule is still
/// evaluated in priority order, but a record that only matches it is dropped
/// instead of being placed in [`Pane::UnhealthyDeclined`]. That pane then
/// always renders empty, matching the upstream dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifierPolicy {
    pub route_unhealthy: bool,
}

pub fn classify(record: &WorkloadRecord, policy: ClassifierPolicy) -> Option<Pane> {
    let c = &record.counters;
    if c.staged > 0 {
        return Some(Pane::Staged);
    }
    if c.healthy > 0 || c.desired_instances >= c.running {
        return Some(Pane::RunningHealthy);
    }
    if c.unhealthy > 0 || c.desired_instances < c.running {
        return policy.route_unhealthy.then_some(Pane::UnhealthyDeclined);
    }
    None
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedBatch {
    pub panes: [Vec<WorkloadRecord>; PANE_COUNT],
    pub dropped: usize,
}

impl ClassifiedBatch {
    pub fn records(&self, pane: Pane) -> &[WorkloadRecord] {
        &self.panes[pane.index()]
    }

    pub fn counts(&self) -> [usize; PANE_COUNT] {
        [self.panes[0].len(), self.panes[1].len(), self.panes[2].len()]
    }
}

/// Buckets a batch, keeping fetch order within each pane.
pub fn classify_batch(records: Vec<WorkloadRecord>, policy: ClassifierPolicy) -> ClassifiedBatch {
    let mut batch = ClassifiedBatch::default();
    for record in records {
        match classify(&record, policy) {
            Some(pane) => batch.panes[pane.index()].push(record),
            None => batch.dropped += 1,
        }
    }
    batch
}
