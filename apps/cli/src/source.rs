use anyhow::{Context, Result};
use async_trait::async_trait;
use qobuz_rpc_core::{parse_window_title, TrackSource, TrackState};
use qobuz_rpc_delivery::ArtworkLookup;
use std::process::Stdio;
use tokio::process::Command;

/// Track source backed by a user-supplied shell command
///
/// The command prints either a JSON track state (`{"title": ..., "isPlaying": ...}`)
/// or a player window title such as `"Song - Artist"`. Empty output, or a
/// non-zero exit, means nothing is playing; a title equal to the service name
/// means the player is idle.
pub struct CommandSource {
    command: String,
    service: String,
    artwork: Option<ArtworkLookup>,
}

impl CommandSource {
    pub fn new(command: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            service: service.into(),
            artwork: None,
        }
    }

    /// Fill in cover art and duration for title-only output
    pub fn with_artwork(mut self, artwork: ArtworkLookup) -> Self {
        self.artwork = Some(artwork);
        self
    }

    async fn run(&self) -> Result<Option<String>> {
        let output = shell(&self.command)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("spawn `{}`", self.command))?;

        if !output.status.success() {
            tracing::debug!("`{}` exited with {}", self.command, output.status);
            return Ok(None);
        }

        Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
    }
}

#[async_trait]
impl TrackSource for CommandSource {
    fn name(&self) -> &str {
        &self.command
    }

    async fn current_track(&self) -> Result<Option<TrackState>> {
        let Some(stdout) = self.run().await? else {
            return Ok(None);
        };

        let Some(track) = parse_output(&stdout, &self.service)? else {
            return Ok(None);
        };

        match &self.artwork {
            Some(artwork) => Ok(Some(artwork.enrich(track).await)),
            None => Ok(Some(track)),
        }
    }
}

/// Interpret command output as a track
pub fn parse_output(stdout: &str, service: &str) -> Result<Option<TrackState>> {
    let text = stdout.trim();
    if text.is_empty() {
        return Ok(None);
    }

    if text.starts_with('{') {
        let track = serde_json::from_str(text).context("Invalid track JSON")?;
        return Ok(Some(track));
    }

    Ok(text
        .lines()
        .next()
        .and_then(|line| parse_window_title(line, service)))
}

#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}
