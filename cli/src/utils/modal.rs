use console::Term;
use indicatif::MultiProgress;
use std::io;

use pdl::ops::{ConflictDecision, CredentialReply};
use pdl::utils::modal::ModalInteraction;
use pdl::utils::style_message::{StyleMessage, BLUE, YELLOW};

/// Prompts on the terminal, progress bars hidden meanwhile.
pub(crate) struct TermModal {
    multi_progress: MultiProgress,
    term: Term,
    /// answer every conflict without asking
    preset_decision: Option<ConflictDecision>,
}

impl TermModal {
    pub(crate) fn new(multi_progress: MultiProgress) -> Self {
        Self {
            multi_progress,
            term: Term::stderr(),
            preset_decision: None,
        }
    }

    pub(crate) fn with_decision(mut self, decision: Option<ConflictDecision>) -> Self {
        self.preset_decision = decision;
        self
    }

    fn ask_credentials(&self, project: &str, url: &str) -> io::Result<CredentialReply> {
        let header = StyleMessage::project(project)
            .plain_text(" requires authentication for ")
            .styled_text(url, &BLUE);
        self.term.write_line(&header.to_string())?;
        self.term.write_str("username: ")?;
        let username = self.term.read_line()?;
        self.term.write_str("password: ")?;
        let password = self.term.read_secure_line()?;

        // both left empty means the user backed out
        if username.trim().is_empty() && password.is_empty() {
            return Ok(CredentialReply::cancelled());
        }
        Ok(CredentialReply::provided(username.trim(), password))
    }

    fn ask_conflict(&self, project: &str, current: &str, requested: &str) -> io::Result<ConflictDecision> {
        let question = StyleMessage::project(project)
            .plain_text(" has local changes on ")
            .styled_text(current, &BLUE)
            .plain_text(". ")
            .styled_text("[f]orce", &YELLOW)
            .plain_text(" switch to ")
            .styled_text(requested, &BLUE)
            .plain_text(" discarding them, or ")
            .styled_text("[c]ancel", &YELLOW)
            .plain_text("? ");
        self.term.write_str(&question.to_string())?;

        let answer = self.term.read_line()?;
        Ok(parse_decision(&answer))
    }
}

fn parse_decision(answer: &str) -> ConflictDecision {
    match answer.trim().to_lowercase().as_str() {
        "f" | "force" => ConflictDecision::Force,
        "c" | "cancel" => ConflictDecision::Cancel,
        _ => ConflictDecision::Abort,
    }
}

impl ModalInteraction for TermModal {
    fn prompt_credentials(&mut self, project: &str, url: &str) -> CredentialReply {
        let multi_progress = self.multi_progress.clone();
        multi_progress.suspend(|| {
            self.ask_credentials(project, url).unwrap_or_else(|e| {
                log::warn!("{}: credential prompt failed: {}", project, e);
                CredentialReply::cancelled()
            })
        })
    }

    fn prompt_conflict(&mut self, project: &str, current: &str, requested: &str) -> ConflictDecision {
        if let Some(decision) = self.preset_decision {
            return decision;
        }
        let multi_progress = self.multi_progress.clone();
        multi_progress.suspend(|| {
            self.ask_conflict(project, current, requested)
                .unwrap_or(ConflictDecision::Abort)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_answers() {
        assert_eq!(parse_decision("f\n"), ConflictDecision::Force);
        assert_eq!(parse_decision(" Cancel "), ConflictDecision::Cancel);
        assert_eq!(parse_decision(""), ConflictDecision::Abort);
    }
}
