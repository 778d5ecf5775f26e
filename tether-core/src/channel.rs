//! The text-only message link between the bridge and the interpreter module.
//!
//! Posting never blocks, like a page posting to an embedded module. Either
//! side may drop its end; the other then sees the channel as closed.

use crate::error::BridgeError;
use tokio::sync::mpsc;

#[derive(Debug)]
pub struct ChannelEnd {
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<String>,
}

/// Create a linked pair: `(host_end, module_end)`.
pub fn channel() -> (ChannelEnd, ChannelEnd) {
    let (to_module, from_host) = mpsc::unbounded_channel();
    let (to_host, from_module) = mpsc::unbounded_channel();
    (
        ChannelEnd {
            tx: to_module,
            rx: from_module,
        },
        ChannelEnd {
            tx: to_host,
            rx: from_host,
        },
    )
}

impl ChannelEnd {
    pub fn post(&self, message: impl Into<String>) -> Result<(), BridgeError> {
        self.tx
            .send(message.into())
            .map_err(|_| BridgeError::ChannelClosed)
    }

    /// Next message from the other side, or `None` once it hung up.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Split into the raw sender/receiver halves, for pumps that need to
    /// move each half into its own task.
    pub fn into_parts(self) -> (mpsc::UnboundedSender<String>, mpsc::UnboundedReceiver<String>) {
        (self.tx, self.rx)
    }
}
