use std::path::PathBuf;

use crate::core::state::{ProjectState, SyncStatus};
use crate::ops::bridge::ConflictDecision;
use crate::ops::bus::{BusEvent, BusSender, SwitchOutcome};
use crate::ops::pool::Job;
use crate::ops::TaskContext;
use crate::utils::error::PdlError;
use crate::utils::StyleMessage;

/// What a branch change request turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchPlan {
    /// a switch is already running for the project
    Ignore,
    /// already on the requested branch
    NoOp,
    /// clean tree, checkout directly
    Safe,
    /// local changes, a human must decide
    Conflict,
}

/// Decide how to reach `requested`.
///
/// The coordinator calls this before the working tree is inspected, with
/// `dirty == false`; only `Ignore` and `NoOp` are final at that point.
pub fn plan(switching: bool, current: Option<&str>, requested: &str, dirty: bool) -> SwitchPlan {
    if switching {
        SwitchPlan::Ignore
    } else if current == Some(requested) {
        SwitchPlan::NoOp
    } else if dirty {
        SwitchPlan::Conflict
    } else {
        SwitchPlan::Safe
    }
}

/// Publishes [`BusEvent::SwitchFinished`] when dropped, so the coordinator
/// always clears the project's switching flag.
struct SwitchGuard {
    bus: BusSender,
    project: String,
    outcome: Option<SwitchOutcome>,
}

impl Drop for SwitchGuard {
    fn drop(&mut self) {
        let outcome = self.outcome.take().unwrap_or_else(|| SwitchOutcome::RolledBack {
            current: None,
            reason: "switch job aborted".to_string(),
        });
        self.bus.publish(BusEvent::SwitchFinished {
            project: self.project.clone(),
            outcome,
        });
    }
}

/// Move an existing checkout to another branch without silently losing work.
pub struct SwitchJob {
    project: String,
    local_path: PathBuf,
    requested: String,
    ctx: TaskContext,
}

impl SwitchJob {
    pub fn new(state: &ProjectState, requested: impl Into<String>, ctx: TaskContext) -> Self {
        Self {
            project: state.name().to_string(),
            local_path: state.local_path.clone(),
            requested: requested.into(),
            ctx,
        }
    }

    fn reconcile(&self) -> SwitchOutcome {
        let vcs = &self.ctx.vcs;
        let current = match vcs.current_branch(&self.local_path) {
            Ok(branch) => branch,
            Err(e) => return rolled_back(None, &e),
        };
        let dirty = match vcs.is_dirty(&self.local_path) {
            Ok(dirty) => dirty,
            Err(e) => return rolled_back(Some(current), &e),
        };

        match plan(false, Some(&current), &self.requested, dirty) {
            SwitchPlan::Ignore | SwitchPlan::NoOp => SwitchOutcome::Unchanged { branch: current },
            SwitchPlan::Safe => self.safe_switch(current),
            SwitchPlan::Conflict => {
                let conflict = PdlError::WorkingTreeConflict {
                    project: self.project.clone(),
                    requested: self.requested.clone(),
                };
                log::info!("{}", conflict);
                let decision = self.ctx.bridge.request_conflict_decision(
                    &self.project,
                    &current,
                    &self.requested,
                    self.ctx.request_timeout,
                );
                match decision {
                    ConflictDecision::Force => self.force_switch(current),
                    ConflictDecision::Cancel | ConflictDecision::Abort => SwitchOutcome::Cancelled {
                        current: Some(current),
                    },
                }
            }
        }
    }

    fn safe_switch(&self, current: String) -> SwitchOutcome {
        let vcs = &self.ctx.vcs;
        self.ctx
            .bus
            .log(StyleMessage::git_checking_out(&self.project, &self.requested));

        if let Err(local_err) = vcs.checkout(&self.local_path, &self.requested) {
            log::debug!("{}: local checkout failed: {}", self.project, local_err);
            if let Err(e) = vcs.checkout_tracking(&self.local_path, &self.requested) {
                return rolled_back(Some(current), &e);
            }
        }

        match vcs.current_branch(&self.local_path) {
            Ok(branch) if branch == self.requested => SwitchOutcome::Switched { branch },
            Ok(branch) => SwitchOutcome::RolledBack {
                reason: format!("ended on {} instead of {}", branch, self.requested),
                current: Some(branch),
            },
            Err(e) => rolled_back(Some(current), &e),
        }
    }

    fn force_switch(&self, current: String) -> SwitchOutcome {
        if let Err(e) = self.ctx.vcs.discard_changes(&self.local_path) {
            return rolled_back(Some(current), &e);
        }
        self.safe_switch(current)
    }
}

fn rolled_back(current: Option<String>, error: &anyhow::Error) -> SwitchOutcome {
    SwitchOutcome::RolledBack {
        current,
        reason: format!("{:#}", error),
    }
}

impl Job for SwitchJob {
    fn project(&self) -> &str {
        &self.project
    }

    fn run(self: Box<Self>) -> bool {
        let mut guard = SwitchGuard {
            bus: self.ctx.bus.clone(),
            project: self.project.clone(),
            outcome: None,
        };
        self.ctx.bus.status(&self.project, SyncStatus::Switching);

        let outcome = self.reconcile();
        let succeeded = !matches!(outcome, SwitchOutcome::RolledBack { .. });
        guard.outcome = Some(outcome);
        succeeded
    }
}
