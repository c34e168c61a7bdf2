use crate::dashboard::DashboardSnapshot;
use crate::errors::FleetviewError;
use crate::tui::render_dashboard;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Quit,
    SwitchPane,
    MoveUp,
    MoveDown,
    Resize(u16, u16),
    Tick,
}

pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
    fn sleep_until(&self, deadline: SystemTime) -> Result<(), FleetviewError>;
}

pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> Result<String, FleetviewError>;
}

/// Full-screen painter. Every call repaints the whole frame from the
/// snapshot; there is no partial update.
pub trait Canvas {
    fn size(&self) -> Result<(u16, u16), FleetviewError>;
    fn render(&mut self, snapshot: &DashboardSnapshot) -> Result<(), FleetviewError>;
}

pub trait EventSource {
    /// Waits at most `timeout` for the next event.
    fn next_event(&mut self, timeout: Duration) -> Result<Option<InputEvent>, FleetviewError>;
}

pub struct ProductionClock;

impl Clock for ProductionClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn sleep_until(&self, deadline: SystemTime) -> Result<(), FleetviewError> {
        let now = SystemTime::now();
        if let Ok(duration) = deadline.duration_since(now) {
            std::thread::sleep(duration);
        }
        Ok(())
    }
}

pub struct ProductionFileSystem;

impl FileSystem for ProductionFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, FleetviewError> {
        std::fs::read_to_string(path)
            .map_err(|e| FleetviewError::Io(format!("{}: {e}", path.display())))
    }
}

pub struct ProductionRuntime {
    pub clock: Arc<dyn Clock>,
    pub file_system: Arc<dyn FileSystem>,
}

impl ProductionRuntime {
    pub fn new() -> Self {
        Self {
            clock: Arc::new(ProductionClock),
            file_system: Arc::new(ProductionFileSystem),
        }
    }
}

impl Default for ProductionRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct FakeClock {
    now: Arc<Mutex<SystemTime>>,
    sleeps: Arc<Mutex<Vec<SystemTime>>>,
}

impl FakeClock {
    pub fn new(now: SystemTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
            sleeps: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn sleeps(&self) -> Vec<SystemTime> {
        self.sleeps.lock().clone()
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new(SystemTime::UNIX_EPOCH)
    }
}

impl Clock for FakeClock {
    fn now(&self) -> SystemTime {
        *self.now.lock()
    }

    fn sleep_until(&self, deadline: SystemTime) -> Result<(), FleetviewError> {
        self.sleeps.lock().push(deadline);
        let mut now = self.now.lock();
        if deadline > *now {
            *now = deadline;
        }
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct FakeFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, String>>>,
}

impl FakeFileSystem {
    pub fn with_file(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        let fs = Self::default();
        fs.files.lock().insert(path.into(), contents.into());
        fs
    }
}

impl FileSystem for FakeFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, FleetviewError> {
        self.files
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| FleetviewError::Io(format!("missing file {}", path.display())))
    }
}

/// Renders each frame through [`render_dashboard`] and keeps the text.
#[derive(Clone)]
pub struct FakeCanvas {
    width: u16,
    height: u16,
    frames: Arc<Mutex<Vec<String>>>,
    fail_render: Arc<Mutex<Option<FleetviewError>>>,
}

impl FakeCanvas {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            frames: Arc::new(Mutex::new(Vec::new())),
            fail_render: Arc::new(Mutex::new(None)),
        }
    }

    pub fn set_fail_next(&self, error: FleetviewError) {
        *self.fail_render.lock() = Some(error);
    }

    pub fn drawn_frames(&self) -> Vec<String> {
        self.frames.lock().clone()
    }

    pub fn last_frame(&self) -> Option<String> {
        self.frames.lock().last().cloned()
    }
}

impl Canvas for FakeCanvas {
    fn size(&self) -> Result<(u16, u16), FleetviewError> {
        Ok((self.width, self.height))
    }

    fn render(&mut self, snapshot: &DashboardSnapshot) -> Result<(), FleetviewError> {
        if let Some(err) = self.fail_render.lock().take() {
            return Err(err);
        }
        let frame = render_dashboard(snapshot, self.width, self.height)?;
        self.frames.lock().push(frame);
        Ok(())
    }
}

/// Replays queued events; yields `None` once the script is exhausted.
#[derive(Default, Clone)]
pub struct FakeEventSource {
    events: Arc<Mutex<VecDeque<Option<InputEvent>>>>,
    polls: Arc<Mutex<Vec<Duration>>>,
}

impl FakeEventSource {
    pub fn scripted(events: impl IntoIterator<Item = InputEvent>) -> Self {
        let source = Self::default();
        source.events.lock().extend(events.into_iter().map(Some));
        source
    }

    /// Queues a poll that times out without an event.
    pub fn push_idle(&self) {
        self.events.lock().push_back(None);
    }

    pub fn push(&self, event: InputEvent) {
        self.events.lock().push_back(Some(event));
    }

    pub fn polls(&self) -> Vec<Duration> {
        self.polls.lock().clone()
    }
}

impl EventSource for FakeEventSource {
    fn next_event(&mut self, timeout: Duration) -> Result<Option<InputEvent>, FleetviewError> {
        self.polls.lock().push(timeout);
        Ok(self.events.lock().pop_front().flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::{Clock, EventSource, FakeClock, FakeEventSource, FakeFileSystem, FileSystem, InputEvent};
    use std::path::Path;
    use std::time::{Duration, SystemTime};

    #[test]
    fn fake_clock_sleep_moves_time_forward_only() {
        let clock = FakeClock::default();
        let later = SystemTime::UNIX_EPOCH + Duration::from_secs(10);
        clock.sleep_until(later).expect("sleep");
        clock.sleep_until(SystemTime::UNIX_EPOCH).expect("sleep");
        assert_eq!(clock.now(), later);
        assert_eq!(clock.sleeps().len(), 2);
    }

    #[test]
    fn fake_file_system_reports_missing_files() {
        let fs = FakeFileSystem::with_file("/a.toml", "x = 1");
        assert_eq!(fs.read_to_string(Path::new("/a.toml")).expect("read"), "x = 1");
        assert!(fs.read_to_string(Path::new("/b.toml")).is_err());
    }

    #[test]
    fn fake_event_source_replays_script_then_idles() {
        let mut source = FakeEventSource::scripted([InputEvent::MoveDown]);
        source.push_idle();
        source.push(InputEvent::Quit);
        let timeout = Duration::from_millis(5);
        assert_eq!(source.next_event(timeout).expect("event"), Some(InputEvent::MoveDown));
        assert_eq!(source.next_event(timeout).expect("event"), None);
        assert_eq!(source.next_event(timeout).expect("event"), Some(InputEvent::Quit));
        assert_eq!(source.next_event(timeout).expect("event"), None);
        assert_eq!(source.polls().len(), 4);
    }
}
