use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use crate::core::repo::{ProviderId, RepositoryDescriptor};

/// Branches tried, in order, when nothing better is known.
const FALLBACK_BRANCHES: [&str; 3] = ["master", "main", "develop"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SyncStatus {
    #[default]
    Idle,
    Cloning,
    Fetching,
    Switching,
    Succeeded,
    Failed,
}

impl SyncStatus {
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            SyncStatus::Cloning | SyncStatus::Fetching | SyncStatus::Switching
        )
    }
}

impl Display for SyncStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            SyncStatus::Idle => "idle",
            SyncStatus::Cloning => "cloning",
            SyncStatus::Fetching => "fetching",
            SyncStatus::Switching => "switching",
            SyncStatus::Succeeded => "succeeded",
            SyncStatus::Failed => "failed",
        };
        f.write_str(text)
    }
}

/// Runtime view of one project. Only the coordinator writes it.
#[derive(Debug, Clone)]
pub struct ProjectState {
    pub descriptor: RepositoryDescriptor,
    pub selected_provider: ProviderId,
    /// branch the next sync or switch aims for, empty means the remote default
    pub requested_branch: String,
    pub current_branch: Option<String>,
    pub available_branches: BTreeSet<String>,
    pub exists_locally: bool,
    pub sync_status: SyncStatus,
    pub progress_percent: u8,
    pub progress_label: String,
    /// set while a branch switch job runs for this project
    pub switching: bool,
    pub local_path: PathBuf,
}

impl ProjectState {
    pub fn new(
        descriptor: RepositoryDescriptor,
        provider: impl Into<ProviderId>,
        root: impl AsRef<Path>,
        preferred_branch: Option<&str>,
    ) -> Self {
        let local_path = descriptor.local_path(root);
        let mut state = Self {
            descriptor,
            selected_provider: provider.into(),
            requested_branch: preferred_branch.unwrap_or_default().to_string(),
            current_branch: None,
            available_branches: BTreeSet::new(),
            exists_locally: false,
            sync_status: SyncStatus::Idle,
            progress_percent: 0,
            progress_label: String::new(),
            switching: false,
            local_path,
        };
        state.refresh_local();
        state
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn remote_url(&self) -> Option<&str> {
        self.descriptor.remote_url(&self.selected_provider)
    }

    pub fn requires_auth(&self) -> bool {
        self.descriptor.requires_auth(&self.selected_provider)
    }

    pub fn set_root(&mut self, root: impl AsRef<Path>) {
        self.local_path = self.descriptor.local_path(root);
        self.refresh_local();
    }

    /// re-read whether a checkout exists on disk
    pub fn refresh_local(&mut self) {
        self.exists_locally = self.local_path.join(".git").is_dir();
        if !self.exists_locally {
            self.current_branch = None;
        }
    }

    /// Pick the branch to request once the branch list is known.
    ///
    /// Order: current request, saved preference, checked-out branch,
    /// `master`, `main`, `develop`, then the first listed branch.
    pub fn default_branch(&self, saved: Option<&str>) -> Option<String> {
        let branches = &self.available_branches;
        let candidates = [
            Some(self.requested_branch.as_str()),
            saved,
            self.current_branch.as_deref(),
        ];

        candidates
            .into_iter()
            .flatten()
            .chain(FALLBACK_BRANCHES)
            .find(|b| !b.is_empty() && branches.contains(*b))
            .map(str::to_string)
            .or_else(|| branches.iter().next().cloned())
    }
}
