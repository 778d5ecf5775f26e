use thiserror::Error;

/// Failures of the bridge plumbing itself. Command-level problems never
/// surface here; they are rendered and the bridge keeps running.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("channel to the interpreter module is closed")]
    ChannelClosed,
}

/// A channel message whose prefix is not part of the command alphabet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown message prefix \"{}\"", .prefix.map(String::from).unwrap_or_default())]
pub struct UnsupportedCommand {
    /// `None` when the message was empty.
    pub prefix: Option<char>,
}

/// Failures of a named script operation.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("empty script operation")]
    Empty,

    #[error("unknown script operation \"{0}\"")]
    Unknown(String),

    #[error("script operation \"{name}\" failed: {source}")]
    Failed {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}
