use anyhow::Context;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::core::repo::{authenticated_url, scrub_secret, Credentials};
use crate::core::state::{ProjectState, SyncStatus};
use crate::ops::bus::BusEvent;
use crate::ops::pool::Job;
use crate::ops::TaskContext;
use crate::utils::error::{PdlError, PdlResult};
use crate::utils::StyleMessage;

lazy_static! {
    static ref PROGRESS_LINE: Regex = Regex::new(
        r"(?i)\b(receiving|resolving|counting|compressing|done|total|objects|remote)\b"
    )
    .unwrap();
}

const CLONE_START: u8 = 20;
const CLONE_END: u8 = 60;

/// Progress reached after `lines` recognised clone output lines.
fn clone_progress(lines: usize) -> u8 {
    let percent = CLONE_START as usize + lines * 2;
    percent.min(CLONE_END as usize) as u8
}

/// Fresh clone of one project, then checkout of the requested branch.
pub struct SyncTask {
    project: String,
    remote_url: String,
    requires_auth: bool,
    target_branch: String,
    local_path: PathBuf,
    credentials: Option<Credentials>,
    ctx: TaskContext,
}

impl SyncTask {
    pub fn new(state: &ProjectState, remote_url: impl Into<String>, ctx: TaskContext) -> Self {
        Self {
            project: state.name().to_string(),
            remote_url: remote_url.into(),
            requires_auth: state.requires_auth(),
            target_branch: state.requested_branch.clone(),
            local_path: state.local_path.clone(),
            credentials: None,
            ctx,
        }
    }

    fn progress(&self, percent: u8, label: impl Into<String>) {
        self.ctx.bus.progress(&self.project, percent, label);
    }

    fn status(&self, status: SyncStatus) {
        self.ctx.bus.status(&self.project, status);
    }

    fn execute(&mut self) -> PdlResult {
        self.status(SyncStatus::Cloning);
        self.progress(0, "preparing");

        // never merge with a previous, possibly partial, checkout
        if self.local_path.exists() {
            std::fs::remove_dir_all(&self.local_path)
                .with_context(|| format!("remove {} failed", self.local_path.display()))?;
        }
        self.progress(10, "cleaned");

        let clone_url = match self.requires_auth {
            true => self.authenticate()?,
            false => self.remote_url.clone(),
        };

        self.progress(CLONE_START, "cloning");
        let mut recognized = 0;
        let bus = self.ctx.bus.clone();
        let project = self.project.clone();
        self.ctx
            .vcs
            .clone_repo(&clone_url, &self.local_path, &mut |line| {
                if PROGRESS_LINE.is_match(line) {
                    recognized += 1;
                    bus.progress(&project, clone_progress(recognized), line);
                }
            })?;
        self.progress(CLONE_END, "cloned");

        let cloned_branch = self.ctx.vcs.current_branch(&self.local_path)?;
        let target = self.target_branch.as_str();
        if !target.is_empty() && target != cloned_branch {
            self.status(SyncStatus::Fetching);
            self.progress(70, "fetching");
            self.ctx.vcs.fetch_all(&self.local_path)?;

            self.ctx
                .bus
                .log(StyleMessage::git_checking_out(&self.project, target));
            if let Err(e) = self.ctx.vcs.checkout(&self.local_path, target) {
                log::debug!("{}: checkout {} failed, tracking origin: {}", self.project, target, e);
                self.ctx.vcs.checkout_tracking(&self.local_path, target)?;
            }
        }
        self.progress(80, "checked out");

        let current = self.ctx.vcs.current_branch(&self.local_path)?;
        let branches: BTreeSet<String> = self
            .ctx
            .vcs
            .list_branches(&self.local_path)?
            .into_iter()
            .collect();

        self.ctx.bus.publish(BusEvent::CurrentBranch {
            project: self.project.clone(),
            branch: current.clone(),
        });
        self.ctx.bus.publish(BusEvent::BranchesDiscovered {
            project: self.project.clone(),
            branches,
        });
        self.progress(100, "done");
        self.status(SyncStatus::Succeeded);
        self.ctx.bus.log(StyleMessage::sync_succ(&self.project, &current));
        self.ctx.bus.publish(BusEvent::RefreshLocal {
            project: self.project.clone(),
        });
        Ok(())
    }

    /// Suspend on the bridge until the coordinator has asked the user.
    fn authenticate(&mut self) -> PdlResult<String> {
        self.progress(15, "waiting for credentials");
        let reply = self.ctx.bridge.request_credentials(
            &self.project,
            &self.remote_url,
            self.ctx.request_timeout,
        );

        if reply.cancelled {
            return Err(PdlError::AuthenticationCancelled(self.project.clone()).into());
        }
        if !reply.credentials.is_complete() {
            return Err(PdlError::IncompleteCredentials(self.project.clone()).into());
        }

        let url = authenticated_url(&self.remote_url, &reply.credentials)?;
        self.credentials = Some(reply.credentials);
        Ok(url)
    }

    fn fail(&self, error: anyhow::Error) {
        // anything not classified yet is a git or filesystem failure
        let error = match error.downcast::<PdlError>() {
            Ok(error) => error,
            Err(other) => PdlError::TransientIo(format!("{:#}", other).into()),
        };

        let mut message = StyleMessage::sync_failed(&self.project, &error);
        if let Some(credentials) = &self.credentials {
            message = StyleMessage::new().plain_text(scrub_secret(&message.to_plain_text(), credentials));
        }

        self.ctx.bus.log(message);
        self.status(SyncStatus::Failed);
    }
}

impl Job for SyncTask {
    fn project(&self) -> &str {
        &self.project
    }

    fn run(mut self: Box<Self>) -> bool {
        match self.execute() {
            Ok(()) => true,
            Err(e) => {
                self.fail(e);
                false
            }
        }
    }
}
