use std::collections::BTreeSet;

use crate::core::state::SyncStatus;
use crate::utils::style_message::StyleMessage;

/// Presentation-layer callbacks, invoked from the coordinator thread only.
pub trait ProgressSink {
    /// a human readable log line
    fn on_log(&self, message: &StyleMessage);

    /// project status changed
    fn on_status(&self, project: &str, status: SyncStatus);

    /// project progress, `percent` in 0..=100
    fn on_progress(&self, project: &str, percent: u8, label: &str);

    /// merged remote and local branch list of a project
    fn on_branches(&self, _project: &str, _branches: &BTreeSet<String>) {}

    /// every job of a batch has finished
    fn on_batch_finish(&self, batch: usize, succeeded: usize, failed: usize);
}
