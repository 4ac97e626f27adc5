use std::sync::Arc;
use std::time::Duration;

use crate::core::git::Vcs;
use crate::ops::bridge::CredentialBridge;
use crate::ops::bus::BusSender;

pub mod bridge;
pub mod bus;
pub mod coordinator;
pub mod pool;
pub mod query;
pub mod reconcile;
pub mod sync;

pub use crate::core::state::SyncStatus;
pub use bridge::{ConflictDecision, CredentialReply};
pub use bus::{BusEvent, MessageBus, SwitchOutcome};
pub use coordinator::{Coordinator, CoordinatorOptions};

/// What every job needs from its surroundings.
#[derive(Clone)]
pub struct TaskContext {
    pub bus: BusSender,
    pub bridge: Arc<CredentialBridge>,
    pub vcs: Arc<dyn Vcs>,
    /// bound on waiting for a human decision
    pub request_timeout: Duration,
}
