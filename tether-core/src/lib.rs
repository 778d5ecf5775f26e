pub mod channel;
pub mod dispatcher;
pub mod error;
pub mod event_queue;
pub mod line_editor;
pub mod network;
pub mod protocol;
pub mod registry;
pub mod renderer;
pub mod session;

// Re-export the main types so hosts can just use `tether_core::Dispatcher`
pub use channel::{ChannelEnd, channel};
pub use dispatcher::{DispatchOptions, Dispatcher, HostInput, StopReason};
pub use error::{BridgeError, ScriptError, UnsupportedCommand};
pub use event_queue::{EventClass, EventQueue, InputEvent};
pub use line_editor::{DrainOutcome, EditorState, LineEditor};
pub use network::{FormField, NetworkReply, NetworkRequest, Transport};
pub use protocol::{Command, CommandParser};
pub use registry::ScriptRegistry;
pub use renderer::{Renderer, Transcript, html_escape};
pub use session::{Dispatch, Session};
