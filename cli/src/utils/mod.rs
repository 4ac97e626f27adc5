pub(crate) mod logger;
pub(crate) mod modal;
pub(crate) mod progress;
