use crate::dashboard::{DashboardSnapshot, PaneSnapshot};
use crate::errors::FleetviewError;
use crate::hotkeys::{action_for_key, dashboard_controls_legend};
use crate::pane_store::{page_size_for_height, HEADER_HEIGHT};
use crate::runtime::{Canvas, EventSource, InputEvent};
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::{CrosstermBackend, TestBackend};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use ratatui::{Frame, Terminal};
use std::io::Stdout;
use std::time::Duration;

pub const LOADING_TEXT: &str = "Loading...";

/// Draws the full dashboard into `frame`. Pure function of the snapshot, so
/// repeated draws of the same snapshot are identical.
pub fn draw_dashboard(frame: &mut Frame<'_>, snapshot: &DashboardSnapshot) {
    let area = frame.area();
    let pane_height = page_size_for_height(area.height) as u16 + 1;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_HEIGHT),
            Constraint::Length(pane_height),
            Constraint::Length(pane_height),
            Constraint::Length(pane_height),
            Constraint::Min(0),
        ])
        .split(area);

    let header = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[0]);
    frame.render_widget(
        Paragraph::new(dashboard_controls_legend()).style(Style::default().fg(Color::White)),
        header[0],
    );
    frame.render_widget(
        Paragraph::new(snapshot.status_line()).style(Style::default().fg(Color::White)),
        header[1],
    );

    for (pane, chunk) in snapshot.panes.iter().zip(chunks.iter().skip(1)) {
        frame.render_widget(pane_list(pane, snapshot.loaded), *chunk);
    }
}

fn pane_list(pane: &PaneSnapshot, loaded: bool) -> List<'static> {
    let border = if pane.active { Color::Red } else { Color::White };
    let title = if pane.page_count > 1 {
        format!(
            "{} [{}/{}] ({})",
            pane.pane.title(),
            pane.page_index + 1,
            pane.page_count,
            pane.total
        )
    } else {
        format!("{} ({})", pane.pane.title(), pane.total)
    };
    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(border))
        .title(title);

    let items = if loaded {
        pane.rows
            .iter()
            .enumerate()
            .map(|(row, record)| {
                let item = ListItem::new(Line::from(record.display_line()));
                if pane.active && pane.highlight == Some(row) {
                    item.style(Style::default().bg(Color::Green))
                } else {
                    item.style(Style::default().fg(Color::White))
                }
            })
            .collect::<Vec<_>>()
    } else {
        vec![ListItem::new(LOADING_TEXT).style(Style::default().fg(Color::Black).bg(Color::White))]
    };

    List::new(items).block(block)
}

/// Renders to an off-screen buffer and returns the frame as text, one line
/// per terminal row.
pub fn render_dashboard(snapshot: &DashboardSnapshot, width: u16, height: u16) -> Result<String, FleetviewError> {
    if width == 0 || height == 0 {
        return Ok(String::new());
    }
    let backend = TestBackend::new(width, height);
    let mut terminal = Terminal::new(backend).map_err(|e| FleetviewError::Render(e.to_string()))?;
    terminal
        .draw(|frame| draw_dashboard(frame, snapshot))
        .map_err(|e| FleetviewError::Render(e.to_string()))?;

    let buffer = terminal.backend().buffer();
    let mut out = String::new();
    for y in 0..height {
        for x in 0..width {
            out.push_str(buffer[(x, y)].symbol());
        }
        out.push('\n');
    }
    Ok(out)
}

/// The live terminal: raw mode plus alternate screen for as long as the value
/// lives.
pub struct TerminalCanvas {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    restored: bool,
}

impl TerminalCanvas {
    pub fn enter() -> Result<Self, FleetviewError> {
        enable_raw_mode().map_err(|e| FleetviewError::Render(format!("enable raw mode: {e}")))?;
        let mut stdout = std::io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(FleetviewError::Render(format!("enter alternate screen: {e}")));
        }
        let mut canvas = Self {
            terminal: Terminal::new(CrosstermBackend::new(stdout))
                .map_err(|e| FleetviewError::Render(e.to_string()))?,
            restored: false,
        };
        canvas
            .terminal
            .clear()
            .map_err(|e| FleetviewError::Render(e.to_string()))?;
        canvas
            .terminal
            .hide_cursor()
            .map_err(|e| FleetviewError::Render(e.to_string()))?;
        Ok(canvas)
    }

    pub fn restore(&mut self) -> Result<(), FleetviewError> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        disable_raw_mode().map_err(|e| FleetviewError::Render(format!("disable raw mode: {e}")))?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)
            .map_err(|e| FleetviewError::Render(format!("leave alternate screen: {e}")))?;
        self.terminal
            .show_cursor()
            .map_err(|e| FleetviewError::Render(e.to_string()))
    }
}

impl Drop for TerminalCanvas {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

impl Canvas for TerminalCanvas {
    fn size(&self) -> Result<(u16, u16), FleetviewError> {
        let size = self
            .terminal
            .size()
            .map_err(|e| FleetviewError::Render(e.to_string()))?;
        Ok((size.width, size.height))
    }

    fn render(&mut self, snapshot: &DashboardSnapshot) -> Result<(), FleetviewError> {
        self.terminal
            .draw(|frame| draw_dashboard(frame, snapshot))
            .map(|_| ())
            .map_err(|e| FleetviewError::Render(e.to_string()))
    }
}

pub struct CrosstermEvents;

impl EventSource for CrosstermEvents {
    fn next_event(&mut self, timeout: Duration) -> Result<Option<InputEvent>, FleetviewError> {
        let ready = event::poll(timeout).map_err(|e| FleetviewError::Io(e.to_string()))?;
        if !ready {
            return Ok(None);
        }
        let event = event::read().map_err(|e| FleetviewError::Io(e.to_string()))?;
        Ok(match event {
            Event::Key(key) => action_for_key(&key).map(InputEvent::from),
            Event::Resize(width, height) => Some(InputEvent::Resize(width, height)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{render_dashboard, LOADING_TEXT};
    use crate::classifier::{classify_batch, ClassifierPolicy};
    use crate::cursor::Navigation;
    use crate::dashboard::{DashboardState, RefreshStamp};
    use crate::types::{Counters, WorkloadRecord};
    use std::time::Duration;

    fn loaded_state(height: u16, count: usize) -> DashboardState {
        let mut state = DashboardState::new(120, height);
        let records = (0..count)
            .map(|i| {
                WorkloadRecord::new(
                    format!("/app-{i:02}"),
                    Counters {
                        staged: 1,
                        ..Counters::default()
                    },
                )
            })
            .collect();
        state.apply_batch(
            classify_batch(records, ClassifierPolicy::default()),
            RefreshStamp {
                finished_at: "Jan  2 15:04:05".to_string(),
                duration: Duration::from_millis(12),
            },
            Vec::new(),
        );
        state
    }

    #[test]
    fn loading_placeholder_before_first_refresh() {
        let state = DashboardState::new(120, 31);
        let frame = render_dashboard(&state.snapshot(), 120, 31).expect("render");
        assert_eq!(frame.matches(LOADING_TEXT).count(), 4);
        assert!(frame.contains("Apps Staged"));
        assert!(frame.contains("Apps Declined / Unhealthy"));
    }

    #[test]
    fn renders_only_current_page_rows() {
        let mut state = loaded_state(13, 7);
        let frame = render_dashboard(&state.snapshot(), 120, 13).expect("render");
        assert!(frame.contains("/app-00"));
        assert!(frame.contains("/app-02"));
        assert!(!frame.contains("/app-03"));
        assert!(frame.contains("[1/3]"));
        assert!(frame.contains("Jan  2 15:04:05 (12ms)"));

        for _ in 0..3 {
            state.navigate(Navigation::MoveDown);
        }
        let frame = render_dashboard(&state.snapshot(), 120, 13).expect("render");
        assert!(!frame.contains("/app-00"));
        assert!(frame.contains("/app-03"));
        assert!(frame.contains("[2/3]"));
    }

    #[test]
    fn redraw_is_idempotent() {
        let state = loaded_state(31, 20);
        let snapshot = state.snapshot();
        let first = render_dashboard(&snapshot, 100, 31).expect("render");
        let second = render_dashboard(&snapshot, 100, 31).expect("render");
        assert_eq!(first, second);
    }

    #[test]
    fn zero_sized_viewport_renders_nothing() {
        let state = loaded_state(31, 3);
        assert!(render_dashboard(&state.snapshot(), 0, 0).expect("render").is_empty());
        assert!(!render_dashboard(&state.snapshot(), 1, 1).expect("render").is_empty());
    }
}
