use std::collections::BTreeSet;
use std::sync::mpsc::{channel, Receiver, Sender};

use crate::core::state::SyncStatus;
use crate::ops::bridge::{ConflictDecision, CredentialReply, RequestId};
use crate::utils::StyleMessage;

/// How a branch switch job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// already on the requested branch
    Unchanged { branch: String },
    Switched { branch: String },
    /// the user kept local changes
    Cancelled { current: Option<String> },
    RolledBack {
        current: Option<String>,
        reason: String,
    },
}

/// Everything a worker may tell the coordinator.
#[derive(Debug, Clone)]
pub enum BusEvent {
    Log(StyleMessage),
    StatusChanged {
        project: String,
        status: SyncStatus,
    },
    ProgressChanged {
        project: String,
        percent: u8,
        label: String,
    },
    BranchesDiscovered {
        project: String,
        branches: BTreeSet<String>,
    },
    CurrentBranch {
        project: String,
        branch: String,
    },
    CredentialRequest {
        id: RequestId,
        project: String,
        url: String,
    },
    CredentialResolved {
        id: RequestId,
        reply: CredentialReply,
    },
    BranchConflict {
        id: RequestId,
        project: String,
        current: String,
        requested: String,
    },
    BranchConflictResolved {
        id: RequestId,
        project: String,
        decision: ConflictDecision,
    },
    SwitchFinished {
        project: String,
        outcome: SwitchOutcome,
    },
    /// local checkout of the project changed on disk
    RefreshLocal { project: String },
    BatchFinished {
        batch: usize,
        succeeded: usize,
        failed: usize,
    },
}

/// Publishing half of the [`MessageBus`], cheap to clone into workers.
#[derive(Debug, Clone)]
pub struct BusSender(Sender<BusEvent>);

impl BusSender {
    /// Never blocks. Events sent after the bus is gone are dropped.
    pub fn publish(&self, event: BusEvent) {
        let _ = self.0.send(event);
    }

    pub fn log(&self, message: impl Into<StyleMessage>) {
        self.publish(BusEvent::Log(message.into()));
    }

    pub fn status(&self, project: impl Into<String>, status: SyncStatus) {
        self.publish(BusEvent::StatusChanged {
            project: project.into(),
            status,
        });
    }

    pub fn progress(&self, project: impl Into<String>, percent: u8, label: impl Into<String>) {
        self.publish(BusEvent::ProgressChanged {
            project: project.into(),
            percent: percent.min(100),
            label: label.into(),
        });
    }
}

/// Unbounded multi-producer, single-consumer event queue.
///
/// Events from one sender arrive in publish order; events from different
/// senders interleave arbitrarily.
#[derive(Debug)]
pub struct MessageBus {
    sender: Sender<BusEvent>,
    receiver: Receiver<BusEvent>,
}

impl MessageBus {
    pub fn new() -> Self {
        let (sender, receiver) = channel();
        Self { sender, receiver }
    }

    pub fn sender(&self) -> BusSender {
        BusSender(self.sender.clone())
    }

    /// Remove and return every queued event, never blocks.
    pub fn drain(&self) -> Vec<BusEvent> {
        self.receiver.try_iter().collect()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}
