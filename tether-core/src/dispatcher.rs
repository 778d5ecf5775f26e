//! The bridge event loop.
//!
//! One task owns the `Session` and reacts to three sources, one event at a
//! time: host input, inbound channel messages and finished network calls.
//! The dispatcher is the only writer onto the channel.

use crate::channel::ChannelEnd;
use crate::error::BridgeError;
use crate::event_queue::InputEvent;
use crate::network::{NetworkReply, NetworkRequest, Transport};
use crate::renderer::Renderer;
use crate::session::{Dispatch, Session};

use futures::FutureExt;
use futures::future::{AbortHandle, Abortable, BoxFuture};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Opt-in bounds on the states that otherwise wait forever.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOptions {
    pub readline_timeout: Option<Duration>,
    pub network_timeout: Option<Duration>,
}

/// Everything the host surface can feed into the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostInput {
    Event(InputEvent),
    Paste(String),
    CancelReadLine,
    CancelNetwork,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Shutdown,
    HostClosed,
    ChannelClosed,
}

pub struct Dispatcher<R: Renderer> {
    session: Session<R>,
    channel: ChannelEnd,
    transport: Arc<dyn Transport>,
    options: DispatchOptions,
    in_flight: FuturesUnordered<BoxFuture<'static, (u64, NetworkReply)>>,
    abort_handles: HashMap<u64, AbortHandle>,
    next_call: u64,
    readline_deadline: Option<Instant>,
}

impl<R: Renderer> std::fmt::Debug for Dispatcher<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("session", &self.session.id())
            .field("options", &self.options)
            .field("in_flight", &self.in_flight.len())
            .field("readline_deadline", &self.readline_deadline)
            .finish()
    }
}

impl<R: Renderer> Dispatcher<R> {
    pub fn new(
        session: Session<R>,
        channel: ChannelEnd,
        transport: Arc<dyn Transport>,
        options: DispatchOptions,
    ) -> Self {
        Self {
            session,
            channel,
            transport,
            options,
            in_flight: FuturesUnordered::new(),
            abort_handles: HashMap::new(),
            next_call: 0,
            readline_deadline: None,
        }
    }

    pub fn session(&self) -> &Session<R> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<R> {
        &mut self.session
    }

    pub fn into_session(self) -> Session<R> {
        self.session
    }

    pub fn pending_network(&self) -> usize {
        self.in_flight.len()
    }

    /// Calls started and neither finished nor cancelled.
    pub fn abortable_calls(&self) -> usize {
        self.abort_handles.len()
    }

    /// Send the module its first message.
    pub fn boot(&self, text: &str) -> Result<(), BridgeError> {
        info!(session = %self.session.id(), bytes = text.len(), "booting module");
        self.post(text.to_string())
    }

    /// The single outbound write point.
    fn post(&self, message: String) -> Result<(), BridgeError> {
        debug!(session = %self.session.id(), bytes = message.len(), "reply");
        self.channel.post(message)
    }

    // ────────────────────────────────────────────────────────────────
    // Handlers
    // ────────────────────────────────────────────────────────────────

    pub fn handle_message(&mut self, message: &str) -> Result<(), BridgeError> {
        match self.session.handle_message(message) {
            Dispatch::Reply(reply) => self.post(reply)?,
            Dispatch::NoReply => {}
            Dispatch::Network(request) => self.start_network(request),
        }
        self.sync_deadline();
        Ok(())
    }

    pub fn handle_host_input(&mut self, input: HostInput) -> Result<(), BridgeError> {
        let completed = match input {
            HostInput::Event(event) => self.session.push_event(event),
            HostInput::Paste(text) => self.session.push_paste(&text),
            HostInput::CancelReadLine => self.session.cancel_read_line(),
            HostInput::CancelNetwork => {
                self.cancel_network();
                None
            }
            HostInput::Shutdown => None,
        };
        if let Some(line) = completed {
            self.post(line)?;
        }
        self.sync_deadline();
        Ok(())
    }

    /// Abandon the pending line read, replying with the empty line.
    pub fn cancel_read_line(&mut self) -> Result<(), BridgeError> {
        if let Some(reply) = self.session.cancel_read_line() {
            self.post(reply)?;
        }
        self.sync_deadline();
        Ok(())
    }

    /// Abort every in-flight call. Each still produces its one reply,
    /// with the unreachable status.
    pub fn cancel_network(&mut self) {
        if !self.abort_handles.is_empty() {
            info!(
                session = %self.session.id(),
                calls = self.abort_handles.len(),
                "cancelling network calls"
            );
        }
        for (_, handle) in self.abort_handles.drain() {
            handle.abort();
        }
    }

    fn start_network(&mut self, request: NetworkRequest) {
        debug!(
            session = %self.session.id(),
            method = %request.method,
            url = %request.url,
            fields = request.fields.len(),
            "network call"
        );

        let transport = Arc::clone(&self.transport);
        let timeout = self.options.network_timeout;
        let call = async move {
            let send = transport.send(&request);
            match timeout {
                Some(limit) => tokio::time::timeout(limit, send).await.unwrap_or_else(|_| {
                    warn!(url = %request.url, "network call timed out");
                    NetworkReply::unreachable()
                }),
                None => send.await,
            }
        };

        let id = self.next_call;
        self.next_call += 1;

        let (handle, registration) = AbortHandle::new_pair();
        let call = Abortable::new(call, registration)
            .map(move |result| (id, result.unwrap_or_else(|_| NetworkReply::unreachable())));

        self.in_flight.push(call.boxed());
        self.abort_handles.insert(id, handle);
    }

    fn finish_network(&mut self, id: u64, reply: NetworkReply) -> Result<(), BridgeError> {
        self.abort_handles.remove(&id);
        debug!(session = %self.session.id(), call = id, status = reply.status, "network reply");
        self.post(reply.encode())
    }

    fn sync_deadline(&mut self) {
        if !self.session.editor().is_reading() {
            self.readline_deadline = None;
        } else if self.readline_deadline.is_none() {
            self.readline_deadline = self.options.readline_timeout.map(|t| Instant::now() + t);
        }
    }

    // ────────────────────────────────────────────────────────────────
    // Event loop
    // ────────────────────────────────────────────────────────────────

    /// React until shutdown or until either side goes away.
    pub async fn run(
        &mut self,
        host: &mut mpsc::Receiver<HostInput>,
    ) -> Result<StopReason, BridgeError> {
        info!(session = %self.session.id(), "dispatcher started");

        let reason = loop {
            let deadline = self.readline_deadline;

            // Host input first: keys typed before a module message are queued
            // before that message sees the queue.
            tokio::select! {
                biased;

                input = host.recv() => match input {
                    None => break StopReason::HostClosed,
                    Some(HostInput::Shutdown) => break StopReason::Shutdown,
                    Some(input) => self.handle_host_input(input)?,
                },

                message = self.channel.recv() => match message {
                    None => break StopReason::ChannelClosed,
                    Some(message) => self.handle_message(&message)?,
                },

                Some((id, reply)) = self.in_flight.next(), if !self.in_flight.is_empty() => {
                    self.finish_network(id, reply)?;
                }

                _ = sleep_until(deadline), if deadline.is_some() => {
                    debug!(session = %self.session.id(), "line read timed out");
                    self.cancel_read_line()?;
                }
            }
        };

        self.cancel_network();
        info!(session = %self.session.id(), ?reason, "dispatcher stopped");
        Ok(reason)
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
