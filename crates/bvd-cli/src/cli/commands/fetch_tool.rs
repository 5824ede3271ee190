//! `bvd fetch-tool` – bootstrap the yt-dlp binary explicitly.

use anyhow::{bail, Result};
use bvd_core::progress::{EventSink, RunEvent};
use bvd_core::tool;
use tokio_util::sync::CancellationToken;

pub async fn run_fetch_tool() -> Result<()> {
    let (sink, mut rx) = EventSink::channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let RunEvent::Log(line) = event {
                println!("{line}");
            }
        }
    });

    let available = tool::ensure_available(&sink, &CancellationToken::new()).await?;
    drop(sink);
    let _ = printer.await;

    if !available {
        bail!("could not fetch {}", tool::TOOL_NAME);
    }
    println!(
        "{} available at {}",
        tool::TOOL_NAME,
        tool::resolve_path().display()
    );
    Ok(())
}
