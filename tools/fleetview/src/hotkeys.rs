use crate::runtime::InputEvent;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyBinding {
    pub key: &'static str,
    pub action: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
    Quit,
    SwitchPane,
    MoveUp,
    MoveDown,
}

impl From<HotkeyAction> for InputEvent {
    fn from(value: HotkeyAction) -> Self {
        match value {
            HotkeyAction::Quit => InputEvent::Quit,
            HotkeyAction::SwitchPane => InputEvent::SwitchPane,
            HotkeyAction::MoveUp => InputEvent::MoveUp,
            HotkeyAction::MoveDown => InputEvent::MoveDown,
        }
    }
}

pub const DASHBOARD_BINDINGS: [HotkeyBinding; 4] = [
    HotkeyBinding {
        key: "tab",
        action: "switch",
    },
    HotkeyBinding {
        key: "up/k",
        action: "up",
    },
    HotkeyBinding {
        key: "down/j",
        action: "down",
    },
    HotkeyBinding {
        key: "ctrl+q",
        action: "quit",
    },
];

pub fn dashboard_controls_legend() -> String {
    let parts = DASHBOARD_BINDINGS
        .iter()
        .map(|binding| format!("({}) {}", binding.key, binding.action))
        .collect::<Vec<_>>();
    format!("FLEETVIEW | {}", parts.join(" | "))
}

pub fn action_for_key(key: &KeyEvent) -> Option<HotkeyAction> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('c') if ctrl => Some(HotkeyAction::Quit),
        KeyCode::Char('q') | KeyCode::Esc => Some(HotkeyAction::Quit),
        KeyCode::Tab => Some(HotkeyAction::SwitchPane),
        KeyCode::Up | KeyCode::Char('k') => Some(HotkeyAction::MoveUp),
        KeyCode::Down | KeyCode::Char('j') => Some(HotkeyAction::MoveDown),
        _ => None,
    }
}
