use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Default filters when `RUST_LOG` is unset. Lifecycle chatter on stderr
/// would land in the middle of the raw-mode screen.
pub const DEFAULT_FILTER: &str = "info";
pub const DEFAULT_STDERR_FILTER: &str = "warn";

pub fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    // RUST_LOG=tether_core=debug,tether_net=debug
    let default = if log_file.is_some() {
        DEFAULT_FILTER
    } else {
        DEFAULT_STDERR_FILTER
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .compact();

    // Raw mode owns the terminal, so a log file keeps stderr quiet.
    let _ = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    Ok(())
}

pub fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        // Leave raw mode first so the report is readable.
        let _ = crossterm::terminal::disable_raw_mode();

        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| info.payload().downcast_ref::<String>().map(|s| s.as_str()))
            .unwrap_or("<non-string panic payload>");

        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "<unknown>".to_string());

        tracing::error!(%location, %payload, "panic");
        previous(info);
    }));
}
