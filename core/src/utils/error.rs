use crate::utils::StyleMessage;
use std::fmt::{Display, Formatter};
use thiserror::Error;

pub type PdlResult<T = (), E = anyhow::Error> = Result<T, E>;

#[derive(Debug, Error)]
pub enum PdlError {
    /// git or filesystem failure during clone, fetch or checkout
    #[error("{0}")]
    TransientIo(StyleMessage),

    #[error("[cancelled] {0}: authentication cancelled by user")]
    AuthenticationCancelled(String),

    #[error("{0}: username and password are both required")]
    IncompleteCredentials(String),

    #[error("{project}: uncommitted changes block switching to {requested}")]
    WorkingTreeConflict { project: String, requested: String },

    #[error("{0}: branch switch already in progress, request ignored")]
    ReentrancyRejected(String),

    #[error("request {0} timed out waiting for a decision")]
    RequestTimedOut(u64),

    #[error("request {0} abandoned, bridge is shutting down")]
    BridgeShutdown(u64),

    #[error("Load project catalog {0} failed!")]
    CatalogLoadFailed(String),

    #[error("Project catalog is empty!")]
    CatalogEmpty,

    #[error("Load settings file {0} failed!")]
    ConfigLoadFailed(String),

    #[error("{0}")]
    UnknownProject(StyleMessage),

    #[error("{0}")]
    UnknownProvider(StyleMessage),

    #[error("invalid remote url: {0}")]
    InvalidUrl(String),

    #[error("Create thread pool failed!")]
    CreateThreadPoolFailed,

    #[error("{prefix}\nErrors:\n{errors}")]
    OpsError {
        prefix: StyleMessage,
        errors: OpsErrors,
    },
}

#[derive(Debug)]
pub struct OpsErrors(pub Vec<StyleMessage>);

impl From<Vec<StyleMessage>> for OpsErrors {
    fn from(value: Vec<StyleMessage>) -> Self {
        Self(value)
    }
}

impl Display for OpsErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for error in &self.0 {
            writeln!(f, "{}", error)?;
        }
        Ok(())
    }
}
