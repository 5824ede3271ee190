//! Locates or fetches the external download tool (yt-dlp).
//!
//! Resolution prefers a managed install under the XDG data dir and falls
//! back to whatever `yt-dlp` the PATH provides. The one-time fetch is
//! single-flight across the whole process: concurrent callers queue on one
//! lock and the late ones find the binary already in place.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::DownloadError;
use crate::progress::EventSink;

/// Command name of the external download tool.
pub const TOOL_NAME: &str = "yt-dlp";

const RELEASE_URL: &str = "https://github.com/yt-dlp/yt-dlp/releases/latest/download/yt-dlp";

static FETCH_LOCK: Mutex<()> = Mutex::const_new(());

/// Where the managed copy of the tool lives (`~/.local/share/bvd/yt-dlp`).
pub fn local_install_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("bvd")?;
    Ok(xdg_dirs.get_data_home().join(TOOL_NAME))
}

/// Path to spawn: the managed install when present, otherwise the bare
/// command name so the OS searches the PATH.
pub fn resolve_path() -> PathBuf {
    match local_install_path() {
        Ok(path) if path.exists() => path,
        _ => PathBuf::from(TOOL_NAME),
    }
}

fn is_available() -> bool {
    local_install_path().map(|p| p.exists()).unwrap_or(false)
        || which::which(TOOL_NAME).is_ok()
}

/// Makes sure the tool exists, fetching it into the managed location if not.
///
/// Returns `Ok(true)` when the tool is usable, `Ok(false)` when the fetch
/// failed (already logged to the sink). The only error this propagates is
/// cancellation.
pub async fn ensure_available(sink: &EventSink, cancel: &CancellationToken) -> Result<bool> {
    if is_available() {
        return Ok(true);
    }

    let _guard = tokio::select! {
        _ = cancel.cancelled() => return Err(DownloadError::Cancelled.into()),
        guard = FETCH_LOCK.lock() => guard,
    };
    // Someone else may have finished the fetch while we queued on the lock.
    if is_available() {
        return Ok(true);
    }

    sink.log(format!("{TOOL_NAME} not found; fetching it"));
    match fetch_into_place(cancel).await {
        Ok(path) => {
            sink.log(format!("fetched {TOOL_NAME} to {}", path.display()));
            tracing::info!(path = %path.display(), "tool installed");
            Ok(true)
        }
        Err(err) => {
            if matches!(err.downcast_ref::<DownloadError>(), Some(DownloadError::Cancelled)) {
                return Err(err);
            }
            sink.log(format!("could not fetch {TOOL_NAME}: {err:#}"));
            tracing::warn!(error = %err, "tool bootstrap failed");
            Ok(false)
        }
    }
}

async fn fetch_into_place(cancel: &CancellationToken) -> Result<PathBuf> {
    let target = local_install_path()?;
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let staging = target.with_extension("part");

    let url = RELEASE_URL.to_string();
    let staging_copy = staging.clone();
    let fetch = tokio::task::spawn_blocking(move || fetch_blocking(&url, &staging_copy));
    let fetched = tokio::select! {
        _ = cancel.cancelled() => {
            // The blocking transfer runs to completion on its own; the
            // staging file gets overwritten on the next attempt.
            return Err(DownloadError::Cancelled.into());
        }
        result = fetch => result.context("tool fetch task join")?,
    };
    if let Err(err) = fetched {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(err);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&staging, std::fs::Permissions::from_mode(0o755)).await?;
    }
    tokio::fs::rename(&staging, &target).await?;
    Ok(target)
}

/// Single GET of the tool binary, written straight to `dest`.
fn fetch_blocking(url: &str, dest: &Path) -> Result<()> {
    use std::io::Write;

    let mut file = std::fs::File::create(dest)
        .with_context(|| format!("create {}", dest.display()))?;

    let mut easy = curl::easy::Easy::new();
    easy.url(url).context("invalid tool URL")?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(Duration::from_secs(30))?;
    easy.low_speed_limit(1024)?;
    easy.low_speed_time(Duration::from_secs(60))?;

    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| match file.write_all(data) {
            Ok(()) => Ok(data.len()),
            Err(e) => {
                tracing::warn!("tool fetch write failed: {}", e);
                Ok(0) // abort transfer
            }
        })?;
        transfer.perform().context("GET request failed")?;
    }

    let code = easy.response_code().context("no response code")?;
    if !(200..300).contains(&code) {
        bail!("GET {} returned HTTP {}", url, code);
    }
    file.flush()?;
    Ok(())
}
