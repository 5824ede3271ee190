//! `bvd run` – download every URL in a list file.

use anyhow::{bail, Context, Result};
use bvd_core::config::Settings;
use bvd_core::item::{DownloadItem, ItemStatus, ItemUpdate};
use bvd_core::progress::{EventSink, RunEvent};
use bvd_core::queue::DownloadQueue;
use bvd_core::{tool, url_expand};
use std::path::Path;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;

pub async fn run_batch(list: &Path, settings: &Settings) -> Result<()> {
    let urls = read_url_list(list)?;
    if urls.is_empty() {
        println!("No URLs in {}.", list.display());
        return Ok(());
    }
    tracing::info!(count = urls.len(), list = %list.display(), "loaded url list");

    let (sink, rx) = EventSink::channel();
    let consumer = tokio::spawn(render_events(rx, urls.clone()));

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nstopping: no new downloads will start, running ones are killed");
            ctrl_c_cancel.cancel();
        }
    });

    if !tool::ensure_available(&sink, &cancel).await? {
        drop(sink);
        let _ = consumer.await;
        bail!("{} is not available and could not be fetched", tool::TOOL_NAME);
    }

    let items: Vec<DownloadItem> = urls.into_iter().map(DownloadItem::new).collect();
    let queue = DownloadQueue::new();
    let items = queue.run(items, settings, &sink, &cancel).await;
    drop(sink);
    let _ = consumer.await;

    summarize(&items)
}

/// Single consumer of the run's event stream: prints the consolidated log
/// and per-item transitions, with progress throttled to 10-point steps.
async fn render_events(mut rx: UnboundedReceiver<RunEvent>, urls: Vec<String>) {
    let mut last_step: Vec<i64> = vec![-1; urls.len()];
    while let Some(event) = rx.recv().await {
        match event {
            RunEvent::Log(line) => println!("{line}"),
            RunEvent::Item { index, update } => {
                let tag = format!("[{}/{}]", index + 1, urls.len());
                match update {
                    ItemUpdate::Reset => last_step[index] = -1,
                    ItemUpdate::Running => println!("{tag} started {}", urls[index]),
                    ItemUpdate::Completed => println!("{tag} completed"),
                    ItemUpdate::Failed { message } => println!("{tag} error: {message}"),
                    ItemUpdate::OutputFile { path } => println!("{tag} -> {path}"),
                    ItemUpdate::Progress { percent } => {
                        let step = (percent / 10.0) as i64;
                        if step > last_step[index] {
                            last_step[index] = step;
                            println!("{tag} {percent:.1}%");
                        }
                    }
                }
            }
        }
    }
}

fn summarize(items: &[DownloadItem]) -> Result<()> {
    let completed = items
        .iter()
        .filter(|i| i.status() == ItemStatus::Completed)
        .count();
    let failed = items
        .iter()
        .filter(|i| i.status() == ItemStatus::Error)
        .count();
    let skipped = items.len() - completed - failed;

    if skipped > 0 {
        println!("{completed} completed, {failed} failed, {skipped} not started.");
    } else {
        println!("{completed} completed, {failed} failed.");
    }
    if failed > 0 {
        bail!("{failed} download(s) failed");
    }
    Ok(())
}

/// Reads the URL list: one URL per line, blanks and `#` comments skipped,
/// bracketed ranges expanded in place.
fn read_url_list(path: &Path) -> Result<Vec<String>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("read url list {}", path.display()))?;
    let mut urls = Vec::new();
    for line in data.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        urls.extend(url_expand::expand(line));
    }
    Ok(urls)
}
