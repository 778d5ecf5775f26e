//! Keyboard translation.
//!
//! Turns crossterm key events into the bridge's input events, using the
//! browser key-code numbering the interpreter expects (Enter = 13,
//! ArrowLeft = 37, letters as their upper-case ASCII code, ...).
//!
//! Ctrl+C quits. Ctrl+G cancels a pending line read and any network calls.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tether_core::InputEvent;

/// What the host should do with one key event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    /// Queue these events, in order.
    Forward(Vec<InputEvent>),
    /// Release whatever the interpreter is waiting on.
    Cancel,
    Quit,
    Ignore,
}

/// Browser-style key code for a key, if it has one.
pub fn key_code(code: &KeyCode) -> Option<u32> {
    let n = match code {
        KeyCode::Backspace => 8,
        KeyCode::Tab | KeyCode::BackTab => 9,
        KeyCode::Enter => 13,
        KeyCode::Esc => 27,
        KeyCode::PageUp => 33,
        KeyCode::PageDown => 34,
        KeyCode::End => 35,
        KeyCode::Home => 36,
        KeyCode::Left => 37,
        KeyCode::Up => 38,
        KeyCode::Right => 39,
        KeyCode::Down => 40,
        KeyCode::Insert => 45,
        KeyCode::Delete => 46,
        KeyCode::F(n @ 1..=12) => 111 + u32::from(*n),
        KeyCode::Char(' ') => 32,
        KeyCode::Char(c) if c.is_ascii_alphanumeric() => c.to_ascii_uppercase() as u32,
        _ => return None,
    };
    Some(n)
}

/// The character a key types, if it types one. Backspace, Tab and Escape
/// only ever produce key-downs.
fn typed_char(code: &KeyCode) -> Option<char> {
    match code {
        KeyCode::Enter => Some('\r'),
        KeyCode::Char(c) => Some(*c),
        _ => None,
    }
}

pub fn map_key(event: &KeyEvent) -> KeyAction {
    if event.modifiers.contains(KeyModifiers::CONTROL) {
        match event.code {
            KeyCode::Char('c') | KeyCode::Char('C') if event.kind != KeyEventKind::Release => {
                return KeyAction::Quit;
            }
            KeyCode::Char('g') | KeyCode::Char('G') if event.kind != KeyEventKind::Release => {
                return KeyAction::Cancel;
            }
            _ => {}
        }
    }

    let code = key_code(&event.code);
    let mut events = Vec::with_capacity(2);

    match event.kind {
        KeyEventKind::Press | KeyEventKind::Repeat => {
            events.extend(code.and_then(InputEvent::down));
            // Control chords reach the interpreter as key-downs only.
            if !event.modifiers.contains(KeyModifiers::CONTROL) {
                events.extend(typed_char(&event.code).map(InputEvent::press));
            }
        }
        KeyEventKind::Release => {
            events.extend(code.and_then(InputEvent::up));
        }
    }

    if events.is_empty() {
        KeyAction::Ignore
    } else {
        KeyAction::Forward(events)
    }
}
