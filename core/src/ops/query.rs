use anyhow::anyhow;
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::core::repo::{authenticated_url, scrub_secret};
use crate::core::state::ProjectState;
use crate::ops::bus::BusEvent;
use crate::ops::pool::Job;
use crate::ops::TaskContext;
use crate::utils::error::{PdlError, PdlResult};
use crate::utils::StyleMessage;

/// List remote heads and local branches of one project.
pub struct BranchQueryJob {
    project: String,
    remote_url: Option<String>,
    requires_auth: bool,
    local_path: PathBuf,
    exists_locally: bool,
    ctx: TaskContext,
}

impl BranchQueryJob {
    pub fn new(state: &ProjectState, ctx: TaskContext) -> Self {
        Self {
            project: state.name().to_string(),
            remote_url: state.remote_url().map(str::to_string),
            requires_auth: state.requires_auth(),
            local_path: state.local_path.clone(),
            exists_locally: state.exists_locally,
            ctx,
        }
    }

    /// `ls-remote`, asking the coordinator for credentials first when the provider needs them.
    fn remote_heads(&self, url: &str) -> PdlResult<Vec<String>> {
        if !self.requires_auth {
            return self.ctx.vcs.remote_heads(url);
        }

        let reply = self
            .ctx
            .bridge
            .request_credentials(&self.project, url, self.ctx.request_timeout);
        if reply.cancelled {
            return Err(PdlError::AuthenticationCancelled(self.project.clone()).into());
        }
        if !reply.credentials.is_complete() {
            return Err(PdlError::IncompleteCredentials(self.project.clone()).into());
        }

        let url = authenticated_url(url, &reply.credentials)?;
        self.ctx
            .vcs
            .remote_heads(&url)
            .map_err(|e| anyhow!(scrub_secret(&format!("{:#}", e), &reply.credentials)))
    }
}

impl Job for BranchQueryJob {
    fn project(&self) -> &str {
        &self.project
    }

    fn run(self: Box<Self>) -> bool {
        let vcs = &self.ctx.vcs;
        let bus = &self.ctx.bus;
        let mut branches = BTreeSet::new();
        let mut answered = false;

        if let Some(url) = &self.remote_url {
            match self.remote_heads(url) {
                Ok(heads) => {
                    branches.extend(heads);
                    answered = true;
                }
                Err(e) => bus.log(StyleMessage::query_failed(&self.project, "remote", &e)),
            }
        }

        if self.exists_locally {
            match vcs.list_branches(&self.local_path) {
                Ok(local) => {
                    branches.extend(local);
                    answered = true;
                }
                Err(e) => bus.log(StyleMessage::query_failed(&self.project, "local", &e)),
            }
            if let Ok(branch) = vcs.current_branch(&self.local_path) {
                bus.publish(BusEvent::CurrentBranch {
                    project: self.project.clone(),
                    branch,
                });
            }
        }

        if answered {
            bus.log(StyleMessage::branches_found(&self.project, branches.len()));
            bus.publish(BusEvent::BranchesDiscovered {
                project: self.project.clone(),
                branches,
            });
        }
        answered
    }
}
