//! The per-bridge context object.
//!
//! A `Session` owns every piece of mutable bridge state: the event queue, the
//! line editor, the output surface and the script registry. It is purely
//! synchronous; the `Dispatcher` drives it and performs the channel writes
//! and network calls it asks for.

use crate::event_queue::{EventQueue, InputEvent};
use crate::line_editor::{DrainOutcome, LineEditor};
use crate::network::NetworkRequest;
use crate::protocol::{Command, CommandParser};
use crate::registry::ScriptRegistry;
use crate::renderer::Renderer;

use tracing::{debug, warn};
use uuid::Uuid;

/// What the dispatcher has to do after a command was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Write exactly this reply.
    Reply(String),
    /// Fire-and-forget command, or a read that is still pending.
    NoReply,
    /// Issue the call; its result becomes the reply.
    Network(NetworkRequest),
}

#[derive(Debug)]
pub struct Session<R: Renderer> {
    id: Uuid,
    queue: EventQueue,
    editor: LineEditor,
    renderer: R,
    scripts: ScriptRegistry,
}

impl<R: Renderer> Session<R> {
    pub fn new(renderer: R) -> Self {
        Self::with_scripts(renderer, ScriptRegistry::with_builtins())
    }

    pub fn with_scripts(renderer: R, scripts: ScriptRegistry) -> Self {
        Self {
            id: Uuid::new_v4(),
            queue: EventQueue::new(),
            editor: LineEditor::new(),
            renderer,
            scripts,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    pub fn editor(&self) -> &LineEditor {
        &self.editor
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn scripts_mut(&mut self) -> &mut ScriptRegistry {
        &mut self.scripts
    }

    pub fn into_renderer(self) -> R {
        self.renderer
    }

    // ────────────────────────────────────────────────────────────────
    // Host input
    // ────────────────────────────────────────────────────────────────

    /// Queue a captured event. Returns a completed line when the event
    /// finished a pending read.
    pub fn push_event(&mut self, event: InputEvent) -> Option<String> {
        self.queue.append(event);
        self.pump()
    }

    /// Queue pasted text. Same contract as `push_event`.
    pub fn push_paste(&mut self, text: &str) -> Option<String> {
        self.queue.append_paste(text);
        self.pump()
    }

    /// Abandon a pending read. Returns the reply owed to the module (the
    /// empty line), or `None` if no read was pending.
    pub fn cancel_read_line(&mut self) -> Option<String> {
        let discarded = self.editor.cancel()?;
        debug!(session = %self.id, discarded = %discarded, "line read cancelled");
        self.renderer.refresh_prompt("");
        Some(String::new())
    }

    /// One editor pass over the queue, with its echo and prompt effects.
    fn pump(&mut self) -> Option<String> {
        match self.editor.drain(&mut self.queue) {
            DrainOutcome::Skipped => None,
            DrainOutcome::Pending => {
                self.renderer.refresh_prompt(self.editor.buffer());
                None
            }
            DrainOutcome::Completed(line) => {
                self.renderer.append_escaped(&format!("{}\n", line));
                self.renderer.refresh_prompt(self.editor.buffer());
                Some(line)
            }
        }
    }

    // ────────────────────────────────────────────────────────────────
    // Channel input
    // ────────────────────────────────────────────────────────────────

    pub fn handle_message(&mut self, message: &str) -> Dispatch {
        self.dispatch(CommandParser::parse(message))
    }

    pub fn dispatch(&mut self, command: Command) -> Dispatch {
        debug!(session = %self.id, command = command.name(), "dispatch");

        match command {
            Command::Sync => Dispatch::Reply(String::new()),

            Command::Alert(text) => {
                self.renderer.alert(&text);
                Dispatch::NoReply
            }

            Command::Script(script) => {
                if let Err(e) = self.scripts.invoke(&script, &mut self.renderer) {
                    warn!(session = %self.id, error = %e, "script operation failed");
                    self.renderer.error_line(&e.to_string());
                }
                Dispatch::NoReply
            }

            Command::SetCursor(markup) => {
                self.renderer.set_cursor(&markup);
                Dispatch::NoReply
            }

            Command::Page(markup) => {
                self.renderer.set_page(&markup);
                Dispatch::NoReply
            }

            Command::Type(text) => {
                self.renderer.append_escaped(&text);
                Dispatch::NoReply
            }

            Command::RawType(markup) => {
                self.renderer.append_raw(&markup);
                Dispatch::NoReply
            }

            Command::GetEvent => Dispatch::Reply(
                self.queue
                    .pop_one()
                    .map(|e| e.as_char().to_string())
                    .unwrap_or_default(),
            ),

            Command::GetEvents => Dispatch::Reply(self.queue.drain_all()),

            Command::ReadLine => {
                self.editor.activate();
                match self.pump() {
                    Some(line) => Dispatch::Reply(line),
                    None => Dispatch::NoReply,
                }
            }

            Command::Http(request) => Dispatch::Network(request),

            Command::Unsupported(unsupported) => {
                warn!(session = %self.id, prefix = ?unsupported.prefix, "unsupported command");
                self.renderer.error_line(&unsupported.to_string());
                Dispatch::NoReply
            }
        }
    }
}
