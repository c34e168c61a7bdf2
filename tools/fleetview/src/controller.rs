use crate::cursor::Navigation;
use crate::dashboard::SharedDashboard;
use crate::errors::FleetviewError;
use crate::refresh::RefreshEvent;
use crate::runtime::{Canvas, EventSource, InputEvent};
use crossbeam_channel::Receiver;
use std::time::{Duration, Instant};

/// Upper bound on a single input poll, so refresh results reach the screen
/// promptly even with a long tick.
const INPUT_POLL_CAP: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlow {
    Continue,
    Quit,
}

pub struct Controller<C: Canvas, E: EventSource> {
    state: SharedDashboard,
    canvas: C,
    events: E,
    refresh_rx: Receiver<RefreshEvent>,
    tick: Duration,
    redraws: u64,
}

impl<C: Canvas, E: EventSource> Controller<C, E> {
    pub fn new(
        state: SharedDashboard,
        canvas: C,
        events: E,
        refresh_rx: Receiver<RefreshEvent>,
        tick: Duration,
    ) -> Self {
        Self {
            state,
            canvas,
            events,
            refresh_rx,
            tick: tick.max(Duration::from_millis(1)),
            redraws: 0,
        }
    }

    pub fn redraws(&self) -> u64 {
        self.redraws
    }

    /// The only path to the screen. The lock is held just long enough to take
    /// a snapshot; painting happens outside it.
    pub fn redraw(&mut self) -> Result<(), FleetviewError> {
        let snapshot = self.state.lock().snapshot();
        self.canvas.render(&snapshot)?;
        self.redraws += 1;
        Ok(())
    }

    pub fn handle_input(&mut self, event: InputEvent) -> Result<ControlFlow, FleetviewError> {
        let nav = match event {
            InputEvent::Quit => return Ok(ControlFlow::Quit),
            InputEvent::SwitchPane => Navigation::SwitchPane,
            InputEvent::MoveUp => Navigation::MoveUp,
            InputEvent::MoveDown => Navigation::MoveDown,
            InputEvent::Resize(width, height) => {
                self.state.lock().resize(width, height);
                self.redraw()?;
                return Ok(ControlFlow::Continue);
            }
            InputEvent::Tick => {
                self.redraw()?;
                return Ok(ControlFlow::Continue);
            }
        };
        self.state.lock().navigate(nav);
        self.redraw()?;
        Ok(ControlFlow::Continue)
    }

    /// Drains the refresh events already waiting, without chasing ones that
    /// arrive meanwhile, and redraws once if any cycle completed.
    pub fn pump_refresh(&mut self) -> Result<(), FleetviewError> {
        let pending = self.refresh_rx.len();
        let mut completed = false;
        for event in self.refresh_rx.try_iter().take(pending) {
            match event {
                RefreshEvent::Completed(_) => completed = true,
                RefreshEvent::Fatal(err) => return Err(err),
            }
        }
        if completed {
            self.redraw()?;
        }
        Ok(())
    }

    /// Runs the UI loop until a quit event or a fatal error.
    pub fn run(&mut self) -> Result<(), FleetviewError> {
        let (width, height) = self.canvas.size()?;
        self.state.lock().resize(width, height);
        self.redraw()?;

        let mut next_tick = Instant::now() + self.tick;
        loop {
            self.pump_refresh()?;

            let timeout = next_tick
                .saturating_duration_since(Instant::now())
                .min(INPUT_POLL_CAP);
            if let Some(event) = self.events.next_event(timeout)? {
                if self.handle_input(event)? == ControlFlow::Quit {
                    return Ok(());
                }
            }

            let now = Instant::now();
            if now >= next_tick {
                self.handle_input(InputEvent::Tick)?;
                next_tick = now + self.tick;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ControlFlow, Controller};
    use crate::classifier::{classify_batch, ClassifierPolicy};
    use crate::dashboard::{DashboardState, RefreshStamp};
    use crate::errors::FleetviewError;
    use crate::refresh::RefreshEvent;
    use crate::runtime::{FakeCanvas, FakeEventSource, InputEvent};
    use crate::types::{Counters, Pane, WorkloadRecord};
    use std::time::Duration;

    fn staged(id: &str) -> WorkloadRecord {
        WorkloadRecord::new(
            id,
            Counters {
                staged: 1,
                ..Counters::default()
            },
        )
    }

    fn stamp() -> RefreshStamp {
        RefreshStamp {
            finished_at: "Jan  2 15:04:05".to_string(),
            duration: Duration::from_millis(5),
        }
    }

    #[test]
    fn quit_event_ends_run_with_success() {
        let state = DashboardState::shared(80, 24);
        let canvas = FakeCanvas::new(100, 31);
        let events = FakeEventSource::scripted([InputEvent::MoveDown, InputEvent::Quit]);
        let (_tx, rx) = crossbeam_channel::unbounded();
        let mut controller = Controller::new(state.clone(), canvas.clone(), events, rx, Duration::from_secs(1));

        controller.run().expect("run");
        assert_eq!(state.lock().viewport(), (100, 31));
        assert_eq!(canvas.drawn_frames().len(), 2);
    }

    #[test]
    fn fatal_refresh_event_stops_the_loop_with_error() {
        let state = DashboardState::shared(80, 24);
        let events = FakeEventSource::default();
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(RefreshEvent::Fatal(FleetviewError::fetch("http://a", "refused")))
            .expect("send");
        let mut controller = Controller::new(state, FakeCanvas::new(80, 24), events, rx, Duration::from_secs(1));
        let err = controller.run().expect_err("fatal");
        assert!(matches!(err, FleetviewError::Fetch { .. }));
    }

    #[test]
    fn navigation_redraws_with_new_highlight() {
        let state = DashboardState::shared(120, 13);
        state.lock().apply_batch(
            classify_batch(vec![staged("/a"), staged("/b")], ClassifierPolicy::default()),
            stamp(),
            Vec::new(),
        );
        let canvas = FakeCanvas::new(120, 13);
        let (_tx, rx) = crossbeam_channel::unbounded();
        let mut controller = Controller::new(state.clone(), canvas.clone(), FakeEventSource::default(), rx, Duration::from_secs(1));

        assert_eq!(controller.handle_input(InputEvent::MoveDown).expect("down"), ControlFlow::Continue);
        assert_eq!(state.lock().selected().map(|r| r.id.clone()).as_deref(), Some("/b"));
        controller.handle_input(InputEvent::SwitchPane).expect("switch");
        assert_eq!(state.lock().cursor().active_pane(), Pane::RunningHealthy);
        assert_eq!(controller.redraws(), 2);
        assert_eq!(controller.handle_input(InputEvent::Quit).expect("quit"), ControlFlow::Quit);
    }

    #[test]
    fn resize_event_recomputes_pages() {
        let state = DashboardState::shared(120, 31);
        let (_tx, rx) = crossbeam_channel::unbounded();
        let mut controller = Controller::new(state.clone(), FakeCanvas::new(120, 31), FakeEventSource::default(), rx, Duration::from_secs(1));
        controller.handle_input(InputEvent::Resize(120, 13)).expect("resize");
        assert_eq!(state.lock().pane(Pane::Staged).page_size(), 3);
    }

    #[test]
    fn completed_refresh_triggers_redraw() {
        let state = DashboardState::shared(120, 31);
        let (tx, rx) = crossbeam_channel::unbounded();
        let canvas = FakeCanvas::new(120, 31);
        let mut controller = Controller::new(state.clone(), canvas.clone(), FakeEventSource::default(), rx, Duration::from_secs(1));
        state.lock().apply_batch(
            classify_batch(vec![staged("/fresh")], ClassifierPolicy::default()),
            stamp(),
            Vec::new(),
        );
        tx.send(RefreshEvent::Completed(crate::refresh::RefreshReport {
            cycle: 1,
            counts: [1, 0, 0],
            dropped: 0,
            duration: Duration::from_millis(5),
            failures: Vec::new(),
            applied: true,
        }))
        .expect("send");
        controller.pump_refresh().expect("pump");
        assert!(canvas.last_frame().expect("frame").contains("/fresh"));
        assert_eq!(controller.redraws(), 1);
        controller.pump_refresh().expect("idle pump");
        assert_eq!(controller.redraws(), 1);
    }

    #[test]
    fn render_failure_propagates() {
        let state = DashboardState::shared(120, 31);
        let canvas = FakeCanvas::new(120, 31);
        canvas.set_fail_next(FleetviewError::Render("tty gone".to_string()));
        let (_tx, rx) = crossbeam_channel::unbounded();
        let mut controller = Controller::new(state, canvas, FakeEventSource::default(), rx, Duration::from_secs(1));
        assert!(matches!(controller.redraw(), Err(FleetviewError::Render(_))));
    }

    #[test]
    fn tick_repaints_without_touching_the_cursor() {
        let state = DashboardState::shared(120, 31);
        let (_tx, rx) = crossbeam_channel::unbounded();
        let canvas = FakeCanvas::new(120, 31);
        let mut controller = Controller::new(state.clone(), canvas.clone(), FakeEventSource::default(), rx, Duration::from_secs(1));
        let before = state.lock().cursor();
        assert_eq!(controller.handle_input(InputEvent::Tick).expect("tick"), ControlFlow::Continue);
        assert_eq!(state.lock().cursor(), before);
        assert_eq!(canvas.drawn_frames().len(), 1);
    }
}
