//! Per-item failure taxonomy for the download engine.

use thiserror::Error;

/// Why a single work item ended in the Error state.
///
/// Every variant is resolved inside the worker that owns the item; none of
/// them aborts the scheduling loop or a sibling item. The `Display` text is
/// what ends up in the item's `error_message`.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The external tool could not be started (missing binary, permissions).
    #[error("failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The subprocess ran but exited with a non-zero code.
    #[error("download failed (exit code {0})")]
    ExitCode(i32),

    /// The run was stopped by the user; the process was killed.
    #[error("stopped by user")]
    Cancelled,

    /// Any other fault during supervision (pipe I/O, wait failure, ...).
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}
