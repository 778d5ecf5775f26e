use crate::frame::{decode_frame, encode_frame};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::process::{ExitStatus, Stdio};
use tether_core::ChannelEnd;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How to launch an external interpreter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl ModuleCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// A child interpreter wired to the module end of a channel.
///
/// Messages from the bridge are written to the child's stdin as frames;
/// frames the child prints on stdout are posted back. When the child closes
/// stdout the module end is dropped and the bridge sees the channel close.
pub struct ModuleProcess {
    child: Child,
    pumps: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for ModuleProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleProcess")
            .field("pid", &self.child.id())
            .field("pumps", &self.pumps.len())
            .finish()
    }
}

impl ModuleProcess {
    pub fn spawn(command: &ModuleCommand, module_end: ChannelEnd) -> Result<Self> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start interpreter {:?}", command.program))?;

        let stdin = child.stdin.take().context("interpreter stdin unavailable")?;
        let stdout = child.stdout.take().context("interpreter stdout unavailable")?;
        let stderr = child.stderr.take().context("interpreter stderr unavailable")?;

        info!(program = %command.program, pid = ?child.id(), "interpreter started");

        let (to_bridge, mut from_bridge) = module_end.into_parts();

        // Bridge -> child stdin
        let writer = tokio::spawn(async move {
            let mut stdin = stdin;
            while let Some(message) = from_bridge.recv().await {
                let mut line = match encode_frame(&message) {
                    Ok(line) => line,
                    Err(e) => {
                        warn!("dropping outbound message: {}", e);
                        continue;
                    }
                };
                line.push('\n');
                if let Err(e) = stdin.write_all(line.as_bytes()).await {
                    debug!("interpreter stdin closed: {}", e);
                    break;
                }
                if stdin.flush().await.is_err() {
                    break;
                }
            }
        });

        // Child stdout -> bridge
        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => match decode_frame(&line) {
                        Ok(message) => {
                            if to_bridge.send(message).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!(line = %line, "skipping interpreter output: {}", e),
                    },
                    Ok(None) => break,
                    Err(e) => {
                        warn!("interpreter stdout failed: {}", e);
                        break;
                    }
                }
            }
            debug!("interpreter stdout closed");
        });

        // Diagnostics only; never reaches the channel.
        let diagnostics = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                warn!(target: "interpreter", "{}", line);
            }
        });

        Ok(Self {
            child,
            pumps: vec![writer, reader, diagnostics],
        })
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    pub async fn wait(&mut self) -> Result<ExitStatus> {
        let status = self.child.wait().await.context("Failed to wait on interpreter")?;
        info!(?status, "interpreter exited");
        Ok(status)
    }

    pub async fn kill(&mut self) -> Result<()> {
        for pump in &self.pumps {
            pump.abort();
        }
        self.child.kill().await.context("Failed to kill interpreter")
    }
}

impl Drop for ModuleProcess {
    fn drop(&mut self) {
        for pump in &self.pumps {
            pump.abort();
        }
    }
}
