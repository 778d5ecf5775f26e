use crate::event_queue::{EventQueue, InputEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorState {
    #[default]
    Idle,
    Reading,
}

/// Result of one drain pass over the event queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The editor is idle; the queue was left alone.
    Skipped,
    /// Every queued event was consumed and the line is still open.
    Pending,
    /// A carriage return closed the line. Events after it stay queued.
    Completed(String),
}

/// Line-buffered text entry on top of the raw event queue.
#[derive(Debug, Clone, Default)]
pub struct LineEditor {
    state: EditorState,
    buffer: String,
}

impl LineEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn is_reading(&self) -> bool {
        self.state == EditorState::Reading
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn activate(&mut self) {
        self.state = EditorState::Reading;
        self.buffer.clear();
    }

    /// Apply one event to the buffer. Returns the finished line on carriage
    /// return; everything outside printable ASCII and backspace is ignored.
    pub fn apply(&mut self, event: InputEvent) -> Option<String> {
        if event.is_backspace() {
            self.buffer.pop();
        } else if event.is_carriage_return() {
            self.state = EditorState::Idle;
            return Some(std::mem::take(&mut self.buffer));
        } else if event.is_printable() {
            self.buffer.push(event.as_char());
        }
        None
    }

    /// Consume queued events in order until the line completes or the queue
    /// runs dry.
    pub fn drain(&mut self, queue: &mut EventQueue) -> DrainOutcome {
        if !self.is_reading() {
            return DrainOutcome::Skipped;
        }
        while let Some(event) = queue.pop_one() {
            if let Some(line) = self.apply(event) {
                return DrainOutcome::Completed(line);
            }
        }
        DrainOutcome::Pending
    }

    /// Abandon a pending read. Returns the discarded partial line, or `None`
    /// when nothing was being read.
    pub fn cancel(&mut self) -> Option<String> {
        if !self.is_reading() {
            return None;
        }
        self.state = EditorState::Idle;
        Some(std::mem::take(&mut self.buffer))
    }
}
