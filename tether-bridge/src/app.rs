//! Wires the terminal, the dispatcher, the network transport and the
//! interpreter module together.

use crate::config::BridgeConfig;
use crate::keyboard::{KeyAction, map_key};
use crate::surface::TerminalSurface;

use anyhow::{Context, Result};
use crossterm::event::{
    DisableBracketedPaste, EnableBracketedPaste, Event, EventStream, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement};
use futures::StreamExt;
use std::io::{self, Stdout};
use std::sync::Arc;
use tether_core::{ChannelEnd, Dispatcher, HostInput, Session, StopReason, channel};
use tether_net::HttpTransport;
use tether_script::{Loopback, ModuleProcess};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Host inputs waiting for the dispatcher.
const HOST_QUEUE_DEPTH: usize = 256;

// ────────────────────────────────────────────────────────────────
// Terminal mode
// ────────────────────────────────────────────────────────────────

/// Raw mode and bracketed paste for as long as it lives.
pub struct TerminalGuard {
    enhanced: bool,
}

impl TerminalGuard {
    pub fn enter() -> Result<Self> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut out = io::stdout();
        execute!(out, EnableBracketedPaste).context("Failed to enable bracketed paste")?;

        // Key releases are only reported with enhancement flags.
        let enhanced = supports_keyboard_enhancement().unwrap_or(false);
        if enhanced {
            execute!(
                out,
                PushKeyboardEnhancementFlags(
                    KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                        | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                )
            )
            .context("Failed to push keyboard enhancement flags")?;
        }
        debug!(enhanced, "terminal in raw mode");
        Ok(Self { enhanced })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let mut out = io::stdout();
        if self.enhanced {
            let _ = execute!(out, PopKeyboardEnhancementFlags);
        }
        let _ = execute!(out, DisableBracketedPaste);
        let _ = disable_raw_mode();
    }
}

// ────────────────────────────────────────────────────────────────
// Terminal events
// ────────────────────────────────────────────────────────────────

/// Translate one terminal event into host inputs for the dispatcher.
pub fn host_inputs(event: Event) -> Vec<HostInput> {
    match event {
        Event::Key(key) => match map_key(&key) {
            KeyAction::Forward(events) => events.into_iter().map(HostInput::Event).collect(),
            KeyAction::Cancel => vec![HostInput::CancelReadLine, HostInput::CancelNetwork],
            KeyAction::Quit => vec![HostInput::Shutdown],
            KeyAction::Ignore => Vec::new(),
        },
        Event::Paste(text) => vec![HostInput::Paste(text)],
        _ => Vec::new(),
    }
}

async fn pump_terminal(tx: mpsc::Sender<HostInput>) {
    let mut events = EventStream::new();
    while let Some(event) = events.next().await {
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                warn!("terminal input failed: {}", e);
                break;
            }
        };
        for input in host_inputs(event) {
            if tx.send(input).await.is_err() {
                return;
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────
// Interpreter module
// ────────────────────────────────────────────────────────────────

enum ModuleLink {
    Process(ModuleProcess),
    Loopback(JoinHandle<Result<()>>),
}

impl ModuleLink {
    fn start(config: &BridgeConfig, end: ChannelEnd) -> Result<Self> {
        match &config.interpreter {
            Some(command) => Ok(Self::Process(ModuleProcess::spawn(command, end)?)),
            None => {
                info!("no interpreter configured, using loopback");
                Ok(Self::Loopback(Loopback::spawn(end)))
            }
        }
    }

    async fn shutdown(self) {
        match self {
            Self::Process(mut process) => {
                if let Err(e) = process.kill().await {
                    debug!("interpreter already gone: {:#}", e);
                }
            }
            Self::Loopback(task) => task.abort(),
        }
    }
}

// ────────────────────────────────────────────────────────────────
// Entry
// ────────────────────────────────────────────────────────────────

pub async fn run(config: BridgeConfig) -> Result<StopReason> {
    let transport =
        HttpTransport::new(config.body_encoding).context("Failed to build HTTP client")?;
    let (host_end, module_end) = channel();
    let module = ModuleLink::start(&config, module_end)?;

    let surface: TerminalSurface<Stdout> =
        TerminalSurface::new(io::stdout(), config.max_output_bytes);
    let session = Session::new(surface);
    info!(session = %session.id(), "bridge starting");

    let mut dispatcher = Dispatcher::new(
        session,
        host_end,
        Arc::new(transport),
        config.dispatch_options(),
    );

    let guard = TerminalGuard::enter()?;
    let (host_tx, mut host_rx) = mpsc::channel(HOST_QUEUE_DEPTH);
    let keys = tokio::spawn(pump_terminal(host_tx));

    let outcome = match dispatcher.boot(&config.boot_text) {
        Ok(()) => dispatcher.run(&mut host_rx).await,
        Err(e) => Err(e),
    };

    keys.abort();
    drop(guard);
    module.shutdown().await;

    let reason = outcome.context("Bridge stopped unexpectedly")?;
    info!(?reason, "bridge stopped");
    Ok(reason)
}
