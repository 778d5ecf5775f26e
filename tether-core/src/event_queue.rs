//! Raw input event capture.
//!
//! Every key interaction is stored as a single code point. The phase of the
//! interaction is folded into the value by a fixed offset, which is also the
//! form the interpreter receives when it pulls events:
//!
//! ```text
//!   press  : code           (0..256, or any code point >= 768)
//!   down   : code + 256     (256..512)
//!   up     : code + 512     (512..768)
//! ```

use std::collections::VecDeque;

pub const DOWN_OFFSET: u32 = 256;
pub const UP_OFFSET: u32 = 512;
const CLASS_END: u32 = 768;

pub const BACKSPACE: u32 = 8;
pub const CARRIAGE_RETURN: u32 = 13;

/// Phase of a key interaction, recovered from the code point range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventClass {
    Press,
    Down,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputEvent(char);

impl InputEvent {
    /// A key press carrying the produced character.
    pub fn press(ch: char) -> Self {
        Self(ch)
    }

    /// A key going down. `None` if the offset code is not a scalar value.
    pub fn down(key_code: u32) -> Option<Self> {
        key_code
            .checked_add(DOWN_OFFSET)
            .and_then(char::from_u32)
            .map(Self)
    }

    /// A key being released.
    pub fn up(key_code: u32) -> Option<Self> {
        key_code
            .checked_add(UP_OFFSET)
            .and_then(char::from_u32)
            .map(Self)
    }

    /// Reinterpret a code point taken off the wire.
    pub fn from_code_point(ch: char) -> Self {
        Self(ch)
    }

    pub fn code(&self) -> u32 {
        self.0 as u32
    }

    pub fn as_char(&self) -> char {
        self.0
    }

    pub fn class(&self) -> EventClass {
        match self.code() {
            c if c < DOWN_OFFSET => EventClass::Press,
            c if c < UP_OFFSET => EventClass::Down,
            c if c < CLASS_END => EventClass::Up,
            _ => EventClass::Press,
        }
    }

    /// The key code with the class offset removed.
    pub fn key_code(&self) -> u32 {
        match self.class() {
            EventClass::Press => self.code(),
            EventClass::Down => self.code() - DOWN_OFFSET,
            EventClass::Up => self.code() - UP_OFFSET,
        }
    }

    pub fn is_backspace(&self) -> bool {
        self.code() == BACKSPACE || self.code() == BACKSPACE + DOWN_OFFSET
    }

    pub fn is_carriage_return(&self) -> bool {
        self.code() == CARRIAGE_RETURN
    }

    pub fn is_printable(&self) -> bool {
        (0x20..=0x7E).contains(&self.code())
    }
}

/// FIFO of captured events, owned by one session.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: VecDeque<InputEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, event: InputEvent) {
        self.events.push_back(event);
    }

    /// Queue clipboard text as press events. Returns how many were queued.
    pub fn append_paste(&mut self, text: &str) -> usize {
        let before = self.events.len();
        self.events
            .extend(normalize_paste(text).chars().map(InputEvent::press));
        self.events.len() - before
    }

    /// Remove the head event. Underflow is not an error.
    pub fn pop_one(&mut self) -> Option<InputEvent> {
        self.events.pop_front()
    }

    /// Remove every queued event and return them as one ordered blob.
    pub fn drain_all(&mut self) -> String {
        self.events.drain(..).map(|e| e.as_char()).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InputEvent> {
        self.events.iter()
    }
}

/// Clipboard text as the line editor expects it: em spaces become spaces,
/// carriage returns are dropped and every newline ends a line.
pub fn normalize_paste(text: &str) -> String {
    text.chars()
        .filter(|c| *c != '\r')
        .map(|c| match c {
            '\u{2003}' => ' ',
            '\n' => '\r',
            other => other,
        })
        .collect()
}
