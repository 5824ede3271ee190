//! One subprocess per work item: spawn the tool, scrape its output, drive
//! the item's state machine to a terminal state.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::cmdline;
use crate::config::Settings;
use crate::error::DownloadError;
use crate::item::{DownloadItem, ItemUpdate};
use crate::progress::EventSink;
use crate::tool;

fn progress_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(-?\d{1,3}(?:\.\d+)?)%").expect("progress regex"))
}

fn destination_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Case-sensitive on purpose; the tool prints the label verbatim.
    RE.get_or_init(|| Regex::new(r"Destination:\s*(.+)").expect("destination regex"))
}

/// Extracts a percentage from one output line, clamped to [0, 100].
/// The first `%` token in the line wins.
pub fn parse_progress(line: &str) -> Option<f64> {
    let caps = progress_re().captures(line)?;
    let value: f64 = caps[1].parse().ok()?;
    Some(value.clamp(0.0, 100.0))
}

/// Extracts the destination path from a `Destination: <path>` line,
/// trailing content taken verbatim.
pub fn parse_destination(line: &str) -> Option<&str> {
    destination_re()
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Runs one external download process for one work item, end to end.
pub struct DownloadWorker {
    tool: PathBuf,
}

impl DownloadWorker {
    pub fn new(tool: impl Into<PathBuf>) -> Self {
        Self { tool: tool.into() }
    }

    /// Worker bound to the executable the tool locator resolves.
    pub fn from_locator() -> Self {
        Self::new(tool::resolve_path())
    }

    pub fn tool(&self) -> &Path {
        &self.tool
    }

    /// Runs `item` to a terminal state.
    ///
    /// Every failure mode is resolved into the item's own state; nothing
    /// escapes to abort the scheduling loop or sibling workers.
    pub async fn run(
        &self,
        item: &mut DownloadItem,
        index: usize,
        settings: &Settings,
        sink: &EventSink,
        cancel: &CancellationToken,
    ) {
        if let Err(err) = self.supervise(item, index, settings, sink, cancel).await {
            let message = err.to_string();
            tracing::error!(url = item.url(), error = %message, "download worker fault");
            sink.log(format!("{}: {}", item.url(), message));
            fail(item, index, sink, message);
        }
    }

    async fn supervise(
        &self,
        item: &mut DownloadItem,
        index: usize,
        settings: &Settings,
        sink: &EventSink,
        cancel: &CancellationToken,
    ) -> Result<(), DownloadError> {
        let mut child = match self.build_command(item.url(), settings).spawn() {
            Ok(child) => child,
            Err(source) => {
                let err = DownloadError::Spawn {
                    tool: self.tool.display().to_string(),
                    source,
                };
                let message = err.to_string();
                sink.log(message.clone());
                fail(item, index, sink, message);
                return Ok(());
            }
        };

        emit(item, index, sink, ItemUpdate::Running);

        // Merge stdout and stderr into one line stream; the tool interleaves
        // progress and diagnostics across both.
        let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(forward_lines(stdout, line_tx.clone())));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(forward_lines(stderr, line_tx.clone())));
        }
        drop(line_tx);

        loop {
            tokio::select! {
                maybe_line = line_rx.recv() => match maybe_line {
                    Some(line) => self.handle_line(&line, item, index, sink),
                    // Both pipes closed: the process is exiting.
                    None => break,
                },
                _ = cancel.cancelled() => {
                    // A kill attempt on an already-exited process is ignored.
                    let _ = child.start_kill();
                    break;
                }
            }
        }
        for reader in readers {
            let _ = reader.await;
        }

        // The pipes closing does not mean the process exited; a daemonizing
        // tool can hold the wait open forever, so the wait itself stays
        // interruptible too.
        let status = tokio::select! {
            status = child.wait() => status,
            _ = cancel.cancelled() => {
                let _ = child.start_kill();
                child.wait().await
            }
        }
        .map_err(|e| {
            DownloadError::Unexpected(format!("wait on {}: {}", self.tool.display(), e))
        })?;

        if cancel.is_cancelled() {
            // Exit code is meaningless after a forced kill.
            fail(item, index, sink, DownloadError::Cancelled.to_string());
            return Ok(());
        }

        if status.success() {
            emit(item, index, sink, ItemUpdate::Completed);
            return Ok(());
        }

        let message = match status.code() {
            Some(code) => DownloadError::ExitCode(code).to_string(),
            None => DownloadError::Unexpected("terminated by signal".into()).to_string(),
        };
        fail(item, index, sink, message);
        Ok(())
    }

    /// `<tool> [-P <dir>]? [<extra options>...] --newline <url>`
    fn build_command(&self, url: &str, settings: &Settings) -> Command {
        let mut cmd = Command::new(&self.tool);
        if !settings.output_directory.trim().is_empty() {
            cmd.arg("-P").arg(&settings.output_directory);
        }
        if !settings.additional_options.trim().is_empty() {
            cmd.args(cmdline::split(&settings.additional_options));
        }
        cmd.arg("--newline").arg(url);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn handle_line(&self, line: &str, item: &mut DownloadItem, index: usize, sink: &EventSink) {
        if line.trim().is_empty() {
            return;
        }
        sink.log(line);
        if let Some(percent) = parse_progress(line) {
            emit(item, index, sink, ItemUpdate::Progress { percent });
        }
        if let Some(path) = parse_destination(line) {
            emit(item, index, sink, ItemUpdate::OutputFile { path: path.to_string() });
        }
    }
}

fn emit(item: &mut DownloadItem, index: usize, sink: &EventSink, update: ItemUpdate) {
    item.apply(&update);
    sink.item(index, update);
}

fn fail(item: &mut DownloadItem, index: usize, sink: &EventSink, message: String) {
    emit(item, index, sink, ItemUpdate::Failed { message });
}

async fn forward_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(line).is_err() {
            break;
        }
    }
}
