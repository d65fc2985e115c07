use super::Clipboard;
use crate::{Error, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Writes to the OS clipboard by piping into the platform's copy utility.
pub struct SystemClipboard {
    commands: Vec<(&'static str, Vec<&'static str>)>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self {
            commands: platform_commands(),
        }
    }

    /// Uses the given commands, tried in order, instead of the platform list.
    pub fn with_commands(commands: Vec<(&'static str, Vec<&'static str>)>) -> Self {
        Self { commands }
    }

    async fn pipe_to(program: &str, args: &[&str], text: &str) -> Result<()> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes()).await?;
        }

        let status = child.wait().await?;
        if status.success() {
            Ok(())
        } else {
            Err(Error::Clipboard(format!("{} exited with {}", program, status)))
        }
    }
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::new()
    }
}

fn platform_commands() -> Vec<(&'static str, Vec<&'static str>)> {
    if cfg!(target_os = "macos") {
        vec![("pbcopy", vec![])]
    } else if cfg!(windows) {
        vec![("clip", vec![])]
    } else {
        let mut commands = Vec::new();
        if std::env::var_os("WAYLAND_DISPLAY").is_some() {
            commands.push(("wl-copy", vec![]));
        }
        commands.push(("xclip", vec!["-selection", "clipboard"]));
        commands.push(("xsel", vec!["--clipboard", "--input"]));
        commands
    }
}

#[async_trait]
impl Clipboard for SystemClipboard {
    fn name(&self) -> &'static str {
        "system"
    }

    async fn write_text(&self, text: &str) -> Result<()> {
        let mut last_error = None;

        for (program, args) in &self.commands {
            match Self::pipe_to(program, args, text).await {
                Ok(()) => {
                    tracing::debug!("Copied {} chars via {}", text.len(), program);
                    return Ok(());
                }
                Err(e) => {
                    tracing::debug!("Clipboard command {} failed: {}", program, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| Error::Clipboard("no clipboard command available".to_string())))
    }
}
