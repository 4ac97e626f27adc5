use atomic_counter::{AtomicCounter, RelaxedCounter};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::core::repo::Credentials;
use crate::ops::bus::{BusEvent, BusSender};
use crate::utils::error::PdlError;

pub type RequestId = u64;

/// How long a worker waits for a human before giving up.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Interval at which a waiting worker re-checks for shutdown.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Answer to a credential prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialReply {
    pub credentials: Credentials,
    pub cancelled: bool,
}

impl CredentialReply {
    pub fn provided(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::new(username, password),
            cancelled: false,
        }
    }

    pub fn cancelled() -> Self {
        Self {
            credentials: Credentials::default(),
            cancelled: true,
        }
    }
}

/// Answer to a dirty working tree blocking a branch switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictDecision {
    /// discard local changes, then switch
    Force,
    /// keep changes, stay on the current branch
    Cancel,
    /// prompt closed without a decision, same effect as `Cancel`
    Abort,
}

impl Display for ConflictDecision {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ConflictDecision::Force => "force",
            ConflictDecision::Cancel => "cancel",
            ConflictDecision::Abort => "abort",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKind {
    Credentials {
        project: String,
        url: String,
    },
    Conflict {
        project: String,
        current: String,
        requested: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Credentials(CredentialReply),
    Conflict(ConflictDecision),
}

/// Write-once rendezvous slot.
#[derive(Default)]
struct Slot {
    value: Mutex<Option<Reply>>,
    ready: Condvar,
    done: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Lets a worker thread block until the coordinator collects a human decision.
///
/// A worker calls [`CredentialBridge::request`], which publishes the request on
/// the bus and waits. The coordinator answers through
/// [`CredentialBridge::fulfil`]. Waiting ends on fulfilment, timeout or
/// [`CredentialBridge::shutdown`].
pub struct CredentialBridge {
    bus: BusSender,
    next_id: RelaxedCounter,
    pending: Mutex<HashMap<RequestId, Arc<Slot>>>,
    closed: AtomicBool,
}

impl CredentialBridge {
    pub fn new(bus: BusSender) -> Self {
        Self {
            bus,
            next_id: RelaxedCounter::new(1),
            pending: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn request(&self, kind: RequestKind, timeout: Duration) -> Result<Reply, PdlError> {
        let id = self.next_id.inc() as RequestId;
        let slot = Arc::new(Slot::default());
        lock(&self.pending).insert(id, slot.clone());

        if self.closed.load(Ordering::SeqCst) {
            lock(&self.pending).remove(&id);
            return Err(PdlError::BridgeShutdown(id));
        }

        let event = match kind {
            RequestKind::Credentials { project, url } => {
                BusEvent::CredentialRequest { id, project, url }
            }
            RequestKind::Conflict {
                project,
                current,
                requested,
            } => BusEvent::BranchConflict {
                id,
                project,
                current,
                requested,
            },
        };
        self.bus.publish(event);

        let result = self.wait(id, &slot, timeout);
        lock(&self.pending).remove(&id);
        result
    }

    fn wait(&self, id: RequestId, slot: &Slot, timeout: Duration) -> Result<Reply, PdlError> {
        let deadline = Instant::now() + timeout;
        let mut value = lock(&slot.value);
        loop {
            if let Some(reply) = value.take() {
                return Ok(reply);
            }
            if self.closed.load(Ordering::SeqCst) {
                return Err(PdlError::BridgeShutdown(id));
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(PdlError::RequestTimedOut(id));
            }
            let wait = POLL_INTERVAL.min(deadline - now);
            value = slot
                .ready
                .wait_timeout(value, wait)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Ask for credentials. Timeout and shutdown count as cancellation.
    pub fn request_credentials(
        &self,
        project: &str,
        url: &str,
        timeout: Duration,
    ) -> CredentialReply {
        let kind = RequestKind::Credentials {
            project: project.to_string(),
            url: url.to_string(),
        };
        match self.request(kind, timeout) {
            Ok(Reply::Credentials(reply)) => reply,
            Ok(other) => {
                log::warn!("{}: unexpected reply {:?} to credential request", project, other);
                CredentialReply::cancelled()
            }
            Err(e) => {
                log::warn!("{}: {}", project, e);
                CredentialReply::cancelled()
            }
        }
    }

    /// Ask what to do with local changes. Timeout and shutdown count as abort.
    pub fn request_conflict_decision(
        &self,
        project: &str,
        current: &str,
        requested: &str,
        timeout: Duration,
    ) -> ConflictDecision {
        let kind = RequestKind::Conflict {
            project: project.to_string(),
            current: current.to_string(),
            requested: requested.to_string(),
        };
        match self.request(kind, timeout) {
            Ok(Reply::Conflict(decision)) => decision,
            Ok(other) => {
                log::warn!("{}: unexpected reply {:?} to conflict request", project, other);
                ConflictDecision::Abort
            }
            Err(e) => {
                log::warn!("{}: {}", project, e);
                ConflictDecision::Abort
            }
        }
    }

    /// Deliver the answer for `id`. False if the request is unknown, expired
    /// or already answered.
    pub fn fulfil(&self, id: RequestId, reply: Reply) -> bool {
        let Some(slot) = lock(&self.pending).get(&id).cloned() else {
            return false;
        };
        if slot.done.swap(true, Ordering::SeqCst) {
            return false;
        }
        *lock(&slot.value) = Some(reply);
        slot.ready.notify_all();
        true
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Wake every waiting worker with a cancellation and refuse new requests.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        for slot in lock(&self.pending).values() {
            let _guard = lock(&slot.value);
            slot.ready.notify_all();
        }
    }
}
