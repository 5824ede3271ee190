//! Per-URL work item: the observable state of one download.
//!
//! An item is only ever mutated through [`DownloadItem::apply`], and every
//! mutation has a matching [`ItemUpdate`] value that the owner forwards to
//! the run's event sink. A consumer holding its own copy of the items can
//! replay the updates and always sees the same state the engine sees.

/// Lifecycle state of one download item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    /// Created or reset; not yet scheduled.
    Waiting,
    /// A subprocess is running for this item.
    Running,
    /// The subprocess exited cleanly. Terminal until reset.
    Completed,
    /// Spawn failure, non-zero exit, cancellation, or fault. Terminal until reset.
    Error,
}

impl ItemStatus {
    /// Short label for list views.
    pub fn label(self) -> &'static str {
        match self {
            ItemStatus::Waiting => "waiting",
            ItemStatus::Running => "running",
            ItemStatus::Completed => "completed",
            ItemStatus::Error => "error",
        }
    }
}

/// One mutation of a [`DownloadItem`].
#[derive(Debug, Clone, PartialEq)]
pub enum ItemUpdate {
    /// Back to Waiting with progress/output/error cleared.
    Reset,
    /// The subprocess started.
    Running,
    /// Clean exit; forces progress to 100 regardless of the last printed value.
    Completed,
    /// Terminal failure with a human-readable message.
    Failed { message: String },
    /// New progress percentage, already clamped to [0, 100] by the parser.
    Progress { percent: f64 },
    /// Destination path reported by the tool; last one wins.
    OutputFile { path: String },
}

/// One URL's download task and its observable state.
#[derive(Debug, Clone)]
pub struct DownloadItem {
    url: String,
    status: ItemStatus,
    progress: f64,
    output_file: String,
    error_message: String,
}

impl DownloadItem {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: ItemStatus::Waiting,
            progress: 0.0,
            output_file: String::new(),
            error_message: String::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    /// Percent complete in [0, 100]; meaningful once the item has run.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Last destination path the subprocess reported, or empty.
    pub fn output_file(&self) -> &str {
        &self.output_file
    }

    /// Failure description; set only when status is Error.
    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    /// Applies one update to the state machine.
    ///
    /// Out-of-state updates are ignored rather than rejected: progress and
    /// destination reports are only honored while Running, and a terminal
    /// item cannot re-enter Running without an intervening Reset.
    pub fn apply(&mut self, update: &ItemUpdate) {
        match update {
            ItemUpdate::Reset => {
                self.status = ItemStatus::Waiting;
                self.progress = 0.0;
                self.output_file.clear();
                self.error_message.clear();
            }
            ItemUpdate::Running => {
                if self.status == ItemStatus::Waiting {
                    self.status = ItemStatus::Running;
                }
            }
            ItemUpdate::Completed => {
                if self.status == ItemStatus::Running {
                    self.status = ItemStatus::Completed;
                    self.progress = 100.0;
                }
            }
            ItemUpdate::Failed { message } => {
                if self.status != ItemStatus::Completed {
                    self.status = ItemStatus::Error;
                    self.error_message = message.clone();
                }
            }
            ItemUpdate::Progress { percent } => {
                if self.status == ItemStatus::Running {
                    self.progress = percent.clamp(0.0, 100.0);
                }
            }
            ItemUpdate::OutputFile { path } => {
                if self.status == ItemStatus::Running {
                    self.output_file = path.clone();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_item() -> DownloadItem {
        let mut item = DownloadItem::new("http://example/v");
        item.apply(&ItemUpdate::Running);
        item
    }

    #[test]
    fn new_item_is_waiting() {
        let item = DownloadItem::new("http://example/v");
        assert_eq!(item.status(), ItemStatus::Waiting);
        assert_eq!(item.progress(), 0.0);
        assert_eq!(item.output_file(), "");
        assert_eq!(item.error_message(), "");
    }

    #[test]
    fn completed_forces_progress_to_100() {
        let mut item = running_item();
        item.apply(&ItemUpdate::Progress { percent: 87.0 });
        item.apply(&ItemUpdate::Completed);
        assert_eq!(item.status(), ItemStatus::Completed);
        assert_eq!(item.progress(), 100.0);
    }

    #[test]
    fn reset_clears_everything_from_any_state() {
        let mut item = running_item();
        item.apply(&ItemUpdate::Progress { percent: 40.0 });
        item.apply(&ItemUpdate::OutputFile { path: "/tmp/a.mp4".into() });
        item.apply(&ItemUpdate::Failed { message: "boom".into() });

        item.apply(&ItemUpdate::Reset);
        assert_eq!(item.status(), ItemStatus::Waiting);
        assert_eq!(item.progress(), 0.0);
        assert_eq!(item.output_file(), "");
        assert_eq!(item.error_message(), "");
    }

    #[test]
    fn progress_ignored_unless_running() {
        let mut item = DownloadItem::new("http://example/v");
        item.apply(&ItemUpdate::Progress { percent: 50.0 });
        assert_eq!(item.progress(), 0.0);

        let mut done = running_item();
        done.apply(&ItemUpdate::Completed);
        done.apply(&ItemUpdate::Progress { percent: 10.0 });
        assert_eq!(done.progress(), 100.0);
    }

    #[test]
    fn terminal_item_does_not_reenter_running_without_reset() {
        let mut item = running_item();
        item.apply(&ItemUpdate::Completed);
        item.apply(&ItemUpdate::Running);
        assert_eq!(item.status(), ItemStatus::Completed);

        item.apply(&ItemUpdate::Reset);
        item.apply(&ItemUpdate::Running);
        assert_eq!(item.status(), ItemStatus::Running);
    }

    #[test]
    fn failed_can_happen_before_running() {
        // Spawn failures mark an item Error while it is still Waiting.
        let mut item = DownloadItem::new("http://example/v");
        item.apply(&ItemUpdate::Failed { message: "no tool".into() });
        assert_eq!(item.status(), ItemStatus::Error);
        assert_eq!(item.error_message(), "no tool");
    }

    #[test]
    fn last_output_file_wins() {
        let mut item = running_item();
        item.apply(&ItemUpdate::OutputFile { path: "/tmp/a.f137.mp4".into() });
        item.apply(&ItemUpdate::OutputFile { path: "/tmp/a.mp4".into() });
        assert_eq!(item.output_file(), "/tmp/a.mp4");
    }

    #[test]
    fn status_labels() {
        assert_eq!(ItemStatus::Waiting.label(), "waiting");
        assert_eq!(ItemStatus::Error.label(), "error");
    }
}
