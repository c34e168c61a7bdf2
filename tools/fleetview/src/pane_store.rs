use crate::types::{WorkloadRecord, PANE_COUNT};

/// Rows reserved above the panes for the header/status line.
pub const HEADER_HEIGHT: u16 = 1;

/// Rows per page for a viewport of `height`, shared by every pane. Each pane
/// loses one row to its border.
pub fn page_size_for_height(height: u16) -> usize {
    let panes = PANE_COUNT as u16;
    let usable = height.saturating_sub(HEADER_HEIGHT).saturating_sub(panes);
    usize::from(usable / panes).max(1)
}

/// Ordered buffer of one pane's records plus its pagination state.
///
/// `page_index * page_size < records.len()` holds whenever `records` is
/// non-empty; anything that could break it clamps instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneStore {
    records: Vec<WorkloadRecord>,
    page_size: usize,
    page_index: usize,
    highlight: Option<usize>,
}

impl PaneStore {
    pub fn new(page_size: usize) -> Self {
        Self {
            records: Vec::new(),
            page_size: page_size.max(1),
            page_index: 0,
            highlight: None,
        }
    }

    /// Swaps in a new batch. The page index is kept so an operator deep in a
    /// long list stays put across refreshes; it only moves back when the new
    /// batch is too short for it. The marker is dropped until the cursor
    /// re-applies it.
    pub fn replace(&mut self, records: Vec<WorkloadRecord>) {
        self.records = records;
        self.highlight = None;
        self.clamp_page();
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.clamp_page();
    }

    pub fn current_page(&self) -> &[WorkloadRecord] {
        let start = self.page_index.saturating_mul(self.page_size);
        if start >= self.records.len() {
            return &[];
        }
        let end = start.saturating_add(self.page_size).min(self.records.len());
        &self.records[start..end]
    }

    pub fn next_page(&mut self) -> bool {
        if self.page_index + 1 >= self.page_count() {
            return false;
        }
        self.page_index += 1;
        true
    }

    pub fn prev_page(&mut self) -> bool {
        if self.page_index == 0 {
            return false;
        }
        self.page_index -= 1;
        true
    }

    /// Always at least one page, even when empty.
    pub fn page_count(&self) -> usize {
        self.records.len().div_ceil(self.page_size).max(1)
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn records(&self) -> &[WorkloadRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn current_page_is_full(&self) -> bool {
        self.current_page().len() == self.page_size
    }

    pub fn highlight(&self) -> Option<usize> {
        self.highlight
    }

    /// Places the selection marker on `row` of the current page. A row past
    /// the end of the page leaves no marker.
    pub fn mark(&mut self, row: usize) {
        self.highlight = (row < self.current_page().len()).then_some(row);
    }

    pub fn clear_mark(&mut self) {
        self.highlight = None;
    }

    fn clamp_page(&mut self) {
        let last = self.page_count() - 1;
        if self.page_index > last {
            self.page_index = last;
        }
        if let Some(row) = self.highlight {
            if row >= self.current_page().len() {
                self.highlight = None;
            }
        }
    }
}
