use crate::ops::bridge::{ConflictDecision, CredentialReply};

/// Blocking human interaction, owned by the presentation layer.
///
/// Only the coordinator thread calls into it. Closing a prompt without an
/// answer must still return: a cancelled [`CredentialReply`] or
/// [`ConflictDecision::Abort`].
pub trait ModalInteraction {
    fn prompt_credentials(&mut self, project: &str, url: &str) -> CredentialReply;

    fn prompt_conflict(&mut self, project: &str, current: &str, requested: &str) -> ConflictDecision;
}
