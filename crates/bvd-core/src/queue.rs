//! Bounded-concurrency scheduler: fans a batch of items out to workers and
//! fans their events back to the run's single consumer.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::item::{DownloadItem, ItemUpdate};
use crate::progress::EventSink;
use crate::worker::DownloadWorker;

/// Schedules one batch of download items across a fixed pool of workers.
pub struct DownloadQueue {
    worker: Arc<DownloadWorker>,
}

impl DownloadQueue {
    /// Queue whose workers run the executable the tool locator resolves.
    pub fn new() -> Self {
        Self::with_worker(DownloadWorker::from_locator())
    }

    /// Queue with an explicit worker (tests point this at a stub tool).
    pub fn with_worker(worker: DownloadWorker) -> Self {
        Self {
            worker: Arc::new(worker),
        }
    }

    /// Runs the batch and returns the items in their original order, each in
    /// a terminal state — or still Waiting if cancellation stopped
    /// scheduling before the item was reached.
    ///
    /// At most `settings.effective_parallelism()` subprocesses run at once.
    /// Cancellation halts scheduling of new items and signals the in-flight
    /// workers; every already-launched worker is awaited before this
    /// returns, so no subprocess outlives the call.
    pub async fn run(
        &self,
        items: Vec<DownloadItem>,
        settings: &Settings,
        sink: &EventSink,
        cancel: &CancellationToken,
    ) -> Vec<DownloadItem> {
        let parallelism = settings.effective_parallelism();
        let gate = Arc::new(Semaphore::new(parallelism));
        let settings = Arc::new(settings.clone());
        tracing::info!(items = items.len(), parallelism, "starting batch run");

        let urls: Vec<String> = items.iter().map(|i| i.url().to_string()).collect();
        let mut slots: Vec<Option<DownloadItem>> = items.into_iter().map(Some).collect();
        let mut tasks: JoinSet<(usize, DownloadItem)> = JoinSet::new();

        for index in 0..slots.len() {
            if cancel.is_cancelled() {
                tracing::info!(next = index, "run cancelled; scheduling stopped");
                break;
            }

            let Some(mut item) = slots[index].take() else {
                continue;
            };
            let reset = ItemUpdate::Reset;
            item.apply(&reset);
            sink.item(index, reset);

            // The scheduler's only suspension point: wait for a free slot,
            // unless cancellation arrives first. Biased so that when both a
            // permit and cancellation are ready, no further item launches.
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    slots[index] = Some(item);
                    tracing::info!(next = index, "run cancelled while waiting for a slot");
                    break;
                }
                permit = Arc::clone(&gate).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    // The gate is never closed; treat a closed gate like cancellation.
                    Err(_) => {
                        slots[index] = Some(item);
                        break;
                    }
                },
            };

            let worker = Arc::clone(&self.worker);
            let settings = Arc::clone(&settings);
            let sink = sink.clone();
            let cancel = cancel.clone();
            tasks.spawn(async move {
                // Hold the permit for the worker's whole lifetime; dropped on
                // every exit path, including panics.
                let _permit = permit;
                worker.run(&mut item, index, &settings, &sink, &cancel).await;
                (index, item)
            });
        }

        // Await everything already launched, cancelled or not.
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, item)) => slots[index] = Some(item),
                Err(err) => {
                    // A panicking worker loses its item; log once and keep the
                    // rest of the batch alive.
                    tracing::error!(error = %err, "download task failed to join");
                    sink.log(format!("internal error in a download task: {err}"));
                }
            }
        }

        slots
            .into_iter()
            .zip(urls)
            .map(|(slot, url)| {
                slot.unwrap_or_else(|| {
                    let mut item = DownloadItem::new(url);
                    item.apply(&ItemUpdate::Failed {
                        message: "unexpected failure: download task panicked".into(),
                    });
                    item
                })
            })
            .collect()
    }
}

impl Default for DownloadQueue {
    fn default() -> Self {
        Self::new()
    }
}
