use crate::pane_store::PaneStore;
use crate::types::{Pane, WorkloadRecord, PANE_COUNT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    MoveUp,
    MoveDown,
    SwitchPane,
}

/// The single highlighted row, scoped to one pane at a time.
///
/// Every transition re-reads the live page of the active store: a refresh may
/// have replaced the records since the last frame was drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionCursor {
    active_pane: Pane,
    row_in_page: usize,
}

impl Default for SelectionCursor {
    fn default() -> Self {
        Self {
            active_pane: Pane::Staged,
            row_in_page: 0,
        }
    }
}

impl SelectionCursor {
    pub fn active_pane(&self) -> Pane {
        self.active_pane
    }

    pub fn row_in_page(&self) -> usize {
        self.row_in_page
    }

    pub fn apply(&mut self, nav: Navigation, panes: &mut [PaneStore; PANE_COUNT]) {
        match nav {
            Navigation::MoveUp => self.move_up(panes),
            Navigation::MoveDown => self.move_down(panes),
            Navigation::SwitchPane => self.switch_pane(panes),
        }
    }

    pub fn move_down(&mut self, panes: &mut [PaneStore; PANE_COUNT]) {
        let store = &mut panes[self.active_pane.index()];
        store.clear_mark();
        let rows = store.current_page().len();
        self.row_in_page = clamp_row(self.row_in_page, rows);
        if self.row_in_page + 1 >= rows {
            if store.current_page_is_full() && store.next_page() {
                self.row_in_page = 0;
            }
        } else {
            self.row_in_page += 1;
        }
        store.mark(self.row_in_page);
    }

    pub fn move_up(&mut self, panes: &mut [PaneStore; PANE_COUNT]) {
        let store = &mut panes[self.active_pane.index()];
        store.clear_mark();
        self.row_in_page = clamp_row(self.row_in_page, store.current_page().len());
        if self.row_in_page == 0 {
            if store.prev_page() {
                self.row_in_page = store.current_page().len().saturating_sub(1);
            }
        } else {
            self.row_in_page -= 1;
        }
        store.mark(self.row_in_page);
    }

    pub fn switch_pane(&mut self, panes: &mut [PaneStore; PANE_COUNT]) {
        panes[self.active_pane.index()].clear_mark();
        self.active_pane = self.active_pane.next();
        self.row_in_page = 0;
        panes[self.active_pane.index()].mark(0);
    }

    /// Pulls the row back inside the active page after its records or page
    /// size changed, and re-applies the marker.
    pub fn reconcile(&mut self, panes: &mut [PaneStore; PANE_COUNT]) {
        for (idx, store) in panes.iter_mut().enumerate() {
            if idx != self.active_pane.index() {
                store.clear_mark();
            }
        }
        let store = &mut panes[self.active_pane.index()];
        self.row_in_page = clamp_row(self.row_in_page, store.current_page().len());
        store.mark(self.row_in_page);
    }

    pub fn selected<'a>(&self, panes: &'a [PaneStore; PANE_COUNT]) -> Option<&'a WorkloadRecord> {
        panes[self.active_pane.index()]
            .current_page()
            .get(self.row_in_page)
    }
}

fn clamp_row(row: usize, rows: usize) -> usize {
    row.min(rows.saturating_sub(1))
}
