//! A small in-process interpreter, used when no external one is configured.
//!
//! It reads lines through the bridge and answers a handful of commands,
//! which makes it a handy end-to-end check of the whole protocol.

use anyhow::Result;
use tether_core::{ChannelEnd, NetworkReply, NetworkRequest, html_escape};
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub const HELP: &str =
    "commands: help, get <url>, post <url> <text>, alert <text>, keys, clear, quit\n";

pub struct Loopback {
    end: ChannelEnd,
}

impl Loopback {
    pub fn new(end: ChannelEnd) -> Self {
        Self { end }
    }

    pub fn spawn(end: ChannelEnd) -> JoinHandle<Result<()>> {
        tokio::spawn(Self::new(end).run())
    }

    /// Post a request and wait for its reply. `None` once the bridge hung up.
    async fn ask(&mut self, message: &str) -> Result<Option<String>> {
        self.end.post(message)?;
        Ok(self.end.recv().await)
    }

    pub async fn run(mut self) -> Result<()> {
        let Some(boot) = self.end.recv().await else {
            return Ok(());
        };
        info!(bytes = boot.len(), "loopback interpreter booted");
        if !boot.is_empty() {
            self.end.post(format!("o{}\n", boot))?;
        }
        self.end.post(format!("o{}", HELP))?;

        loop {
            self.end.post("c&gt; ")?;
            let Some(line) = self.ask("r").await? else {
                break;
            };
            debug!(line = %line, "loopback line");
            if !self.respond(line.trim()).await? {
                break;
            }
        }

        info!("loopback interpreter stopped");
        Ok(())
    }

    /// Answer one line. `false` ends the session.
    async fn respond(&mut self, line: &str) -> Result<bool> {
        let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
        match word {
            "" => {}
            "quit" | "exit" => return Ok(false),
            "help" => self.end.post(format!("o{}", HELP))?,
            "clear" => self.end.post("jclear")?,
            "alert" => self.end.post(format!("a{}", rest))?,
            "keys" => {
                let Some(events) = self.ask("I").await? else {
                    return Ok(false);
                };
                let codes: Vec<String> = events.chars().map(|c| (c as u32).to_string()).collect();
                self.end.post(format!("o[{}]\n", codes.join(" ")))?;
            }
            "get" | "post" => {
                let (url, text) = rest.split_once(' ').unwrap_or((rest, ""));
                let request = if word == "get" {
                    NetworkRequest::new("GET", url)
                } else {
                    NetworkRequest::new("POST", url).tail("text", text)
                };
                let Some(reply) = self.ask(&format!("h{}", request.encode())).await? else {
                    return Ok(false);
                };
                let summary = match NetworkReply::decode(&reply) {
                    Some(reply) => {
                        format!("status {} ({} chars)", reply.status, reply.body.chars().count())
                    }
                    None => "malformed reply".to_string(),
                };
                self.end.post(format!("O<i>{}</i>\n", html_escape(&summary)))?;
            }
            _ => self.end.post(format!("o= {}\n", line))?,
        }
        Ok(true)
    }
}
