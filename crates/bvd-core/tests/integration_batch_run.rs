//! End-to-end batch runs against a stub tool script.
//!
//! The stub decides its behavior from the URL it is handed (the last
//! argument, exactly where the real tool gets it), so one script covers
//! successful, failing, and slow downloads.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::Duration;

use bvd_core::config::Settings;
use bvd_core::item::{DownloadItem, ItemStatus, ItemUpdate};
use bvd_core::progress::{EventSink, RunEvent};
use bvd_core::queue::DownloadQueue;
use bvd_core::worker::DownloadWorker;
use tokio_util::sync::CancellationToken;

const STUB_SCRIPT: &str = r#"#!/bin/sh
url=""
for a in "$@"; do url="$a"; done
case "$url" in
  *slow*)
    echo "[download]   0.0% of 10MiB"
    sleep 30
    exit 0
    ;;
  *pause*)
    echo "[download]  10.0% of 10MiB"
    sleep 0.4
    echo "[download]  90.0% of 10MiB"
    exit 0
    ;;
  *fail*)
    echo "ERROR: unable to download"
    exit 1
    ;;
  *)
    echo "[download] Destination: /tmp/ok.mp4"
    echo "[download]  87.0% of 10MiB"
    exit 0
    ;;
esac
"#;

fn stub_tool(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("fake-yt-dlp");
    std::fs::write(&path, STUB_SCRIPT).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn settings(parallelism: u32) -> Settings {
    Settings {
        parallelism,
        ..Settings::default()
    }
}

#[tokio::test]
async fn mixed_outcomes_all_end_terminal() {
    let dir = tempfile::tempdir().unwrap();
    let queue = DownloadQueue::with_worker(DownloadWorker::new(stub_tool(&dir)));
    let items = vec![
        DownloadItem::new("http://x/ok/1"),
        DownloadItem::new("http://x/fail/2"),
        DownloadItem::new("http://x/ok/3"),
    ];
    let (sink, _rx) = EventSink::channel();

    let items = queue
        .run(items, &settings(2), &sink, &CancellationToken::new())
        .await;

    assert_eq!(items[0].status(), ItemStatus::Completed);
    assert_eq!(items[0].progress(), 100.0);
    assert_eq!(items[0].output_file(), "/tmp/ok.mp4");

    assert_eq!(items[1].status(), ItemStatus::Error);
    assert!(items[1].error_message().contains('1'));

    assert_eq!(items[2].status(), ItemStatus::Completed);

    // No item is ever left Running after a full run.
    assert!(items.iter().all(|i| i.status() != ItemStatus::Running));
}

#[tokio::test]
async fn running_items_never_exceed_parallelism() {
    let dir = tempfile::tempdir().unwrap();
    let queue = DownloadQueue::with_worker(DownloadWorker::new(stub_tool(&dir)));
    let items: Vec<_> = (0..5)
        .map(|i| DownloadItem::new(format!("http://x/pause/{i}")))
        .collect();
    let (sink, mut rx) = EventSink::channel();

    let cancel = CancellationToken::new();
    let run_settings = settings(2);
    let handle = tokio::spawn(async move {
        queue.run(items, &run_settings, &sink, &cancel).await
    });

    // Workers emit Running right after spawn and a terminal update before
    // releasing their slot, so the high-water mark of Running items in
    // event order bounds the true concurrency.
    let mut running = 0usize;
    let mut high_water = 0usize;
    while let Some(event) = rx.recv().await {
        if let RunEvent::Item { update, .. } = event {
            match update {
                ItemUpdate::Running => {
                    running += 1;
                    high_water = high_water.max(running);
                }
                ItemUpdate::Completed | ItemUpdate::Failed { .. } => running -= 1,
                _ => {}
            }
        }
    }

    let items = handle.await.unwrap();
    assert!(high_water <= 2, "saw {high_water} items running at once");
    assert!(items.iter().all(|i| i.status() == ItemStatus::Completed));
}

#[tokio::test]
async fn cancellation_stops_scheduling_and_kills_in_flight_work() {
    let dir = tempfile::tempdir().unwrap();
    let queue = DownloadQueue::with_worker(DownloadWorker::new(stub_tool(&dir)));
    let items = vec![
        DownloadItem::new("http://x/slow/1"),
        DownloadItem::new("http://x/ok/2"),
        DownloadItem::new("http://x/ok/3"),
    ];
    let (sink, mut rx) = EventSink::channel();
    let cancel = CancellationToken::new();

    let run_settings = settings(1);
    let run_cancel = cancel.clone();
    let started = std::time::Instant::now();
    let handle = tokio::spawn(async move {
        queue.run(items, &run_settings, &sink, &run_cancel).await
    });

    // Cancel as soon as the first (never-finishing) item starts.
    while let Some(event) = rx.recv().await {
        if matches!(
            event,
            RunEvent::Item { update: ItemUpdate::Running, .. }
        ) {
            cancel.cancel();
            break;
        }
    }
    while rx.recv().await.is_some() {}

    let items = handle.await.unwrap();
    assert!(
        started.elapsed() < Duration::from_secs(10),
        "cancellation must interrupt the 30s stub sleep"
    );

    assert_eq!(items[0].status(), ItemStatus::Error);
    assert_eq!(items[0].error_message(), "stopped by user");
    assert_eq!(items[1].status(), ItemStatus::Waiting);
    assert_eq!(items[2].status(), ItemStatus::Waiting);
}

#[tokio::test]
async fn rerun_after_reset_recovers_failed_items() {
    // A batch can be re-run: the queue resets every item it schedules, so a
    // previously failed item goes back through the whole lifecycle.
    let dir = tempfile::tempdir().unwrap();
    let tool = stub_tool(&dir);
    let queue = DownloadQueue::with_worker(DownloadWorker::new(&tool));
    let (sink, _rx) = EventSink::channel();
    let run_settings = settings(1);

    let items = vec![DownloadItem::new("http://x/fail/1")];
    let items = queue
        .run(items, &run_settings, &sink, &CancellationToken::new())
        .await;
    assert_eq!(items[0].status(), ItemStatus::Error);

    // Second run with a stub that now succeeds for the same URL.
    let ok_script = "#!/bin/sh\necho '[download] 100%'\nexit 0\n";
    std::fs::write(&tool, ok_script).unwrap();
    let items = queue
        .run(items, &run_settings, &sink, &CancellationToken::new())
        .await;
    assert_eq!(items[0].status(), ItemStatus::Completed);
    assert_eq!(items[0].error_message(), "");
}
