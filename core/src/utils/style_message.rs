use crate::core::state::SyncStatus;
use crate::utils::error::PdlError;
use crate::utils::path::PathExtension;
use ansi_term::{Colour, Style};
use lazy_static::lazy_static;
use std::fmt::{Display, Formatter};
use std::path::Path;

lazy_static! {
    pub static ref RED: Style = Style::new().fg(Colour::Red);
    pub static ref GREEN: Style = Style::new().fg(Colour::Green);
    pub static ref BLUE: Style = Style::new().fg(Colour::Blue);
    pub static ref YELLOW: Style = Style::new().fg(Colour::Yellow);
    pub static ref GREY: Style = Style::new().fg(Colour::Fixed(245));
    pub static ref RED_BOLD: Style = Style::new().fg(Colour::Red).bold();
    pub static ref GREEN_BOLD: Style = Style::new().fg(Colour::Green).bold();
    pub static ref BLUE_BOLD: Style = Style::new().fg(Colour::Blue).bold();
    pub static ref PURPLE_BOLD: Style = Style::new().fg(Colour::Purple).bold();
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyleText {
    pub content: String,
    pub style: Option<&'static ansi_term::Style>,
}

impl StyleText {
    pub fn to_plain_text(&self) -> &str {
        self.content.as_str()
    }
}

impl Display for StyleText {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.style {
            Some(style) => write!(f, "{}", style.paint(&self.content)),
            None => f.write_str(&self.content),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct StyleMessage(pub Vec<StyleText>);

impl StyleMessage {
    pub fn new() -> Self {
        StyleMessage::default()
    }

    pub fn plain_text(mut self, content: impl AsRef<str>) -> Self {
        self.0.push(StyleText {
            content: content.as_ref().to_string(),
            style: None,
        });
        self
    }

    pub fn styled_text(mut self, content: impl AsRef<str>, style: &'static ansi_term::Style) -> Self {
        self.0.push(StyleText {
            content: content.as_ref().to_string(),
            style: Some(style),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn join(mut self, other: StyleMessage) -> Self {
        self.0.extend(other.0);
        self
    }

    pub fn to_plain_text(&self) -> String {
        self.0.iter().map(|st| st.to_plain_text()).collect()
    }
}

// format message
impl StyleMessage {
    pub fn project(name: impl AsRef<str>) -> Self {
        StyleMessage::new().styled_text(name.as_ref(), &PURPLE_BOLD)
    }

    pub(crate) fn project_not_found(name: impl AsRef<str>) -> Self {
        StyleMessage::new()
            .plain_text("project ")
            .join(Self::project(name))
            .plain_text(" not found in catalog!")
    }

    pub(crate) fn provider_not_found(provider: impl AsRef<str>) -> Self {
        StyleMessage::new()
            .plain_text("source ")
            .styled_text(provider.as_ref(), &BLUE)
            .plain_text(" is not offered by any project!")
    }

    pub(crate) fn no_remote_for_provider(name: impl AsRef<str>, provider: impl AsRef<str>) -> Self {
        Self::project(name)
            .plain_text(": no remote for source ")
            .styled_text(provider.as_ref(), &BLUE)
    }

    pub(crate) fn no_projects_selected() -> Self {
        StyleMessage::new().styled_text("no projects selected", &YELLOW)
    }

    pub(crate) fn batch_start(label: impl AsRef<str>, total: usize) -> Self {
        StyleMessage::new()
            .plain_text(format!("{} ", label.as_ref()))
            .styled_text(total.to_string(), &BLUE_BOLD)
            .plain_text(" project(s)...")
    }

    pub(crate) fn batch_finished(label: impl AsRef<str>, succeeded: usize, failed: usize) -> Self {
        let msg = StyleMessage::new()
            .plain_text(format!("{} finished! ", label.as_ref()))
            .styled_text(succeeded.to_string(), &GREEN_BOLD)
            .plain_text(" succeeded, ");
        match failed {
            0 => msg.plain_text("0 failed."),
            _ => msg.styled_text(failed.to_string(), &RED_BOLD).plain_text(" failed."),
        }
    }

    pub(crate) fn job_end(name: impl AsRef<str>, is_success: bool) -> Self {
        let (sign, style): (&str, &'static Style) = match is_success {
            true => ("√", &GREEN_BOLD),
            false => ("x", &RED_BOLD),
        };
        StyleMessage::new()
            .styled_text(sign, style)
            .plain_text(" ")
            .join(Self::project(name))
    }

    pub(crate) fn job_panicked(name: impl AsRef<str>) -> Self {
        Self::project(name).styled_text(": worker panicked", &RED_BOLD)
    }

    pub fn status(status: SyncStatus) -> Self {
        let style: &'static Style = match status {
            SyncStatus::Idle => &GREY,
            SyncStatus::Cloning | SyncStatus::Fetching | SyncStatus::Switching => &BLUE,
            SyncStatus::Succeeded => &GREEN,
            SyncStatus::Failed => &RED,
        };
        StyleMessage::new().styled_text(status.to_string(), style)
    }

    pub(crate) fn sync_succ(name: impl AsRef<str>, branch: impl AsRef<str>) -> Self {
        Self::project(name)
            .plain_text(": synchronized on ")
            .styled_text(branch.as_ref(), &BLUE)
    }

    pub(crate) fn git_error(name: impl AsRef<str>, error: &anyhow::Error) -> Self {
        let err_msg = error
            .chain()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(": ");

        Self::project(name)
            .plain_text(" ")
            .styled_text(err_msg.trim(), &RED)
    }

    pub(crate) fn sync_failed(name: impl AsRef<str>, error: &PdlError) -> Self {
        Self::project(name)
            .plain_text(" ")
            .styled_text(error.to_string().trim(), &RED)
    }

    pub(crate) fn remove_dir_succ(path: impl AsRef<Path>) -> Self {
        StyleMessage::new()
            .plain_text("  ")
            .styled_text(path.display_path(), &PURPLE_BOLD)
            .plain_text(": removed")
    }

    pub(crate) fn remove_dir_failed(path: impl AsRef<Path>, err: &anyhow::Error) -> Self {
        StyleMessage::new().plain_text(format!("remove {} error: {}", path.display_path(), err))
    }

    pub(crate) fn project_busy(name: impl AsRef<str>) -> Self {
        Self::project(name).styled_text(": busy, skipped", &YELLOW)
    }

    pub(crate) fn git_checking_out(name: impl AsRef<str>, branch: impl AsRef<str>) -> Self {
        Self::project(name)
            .plain_text(": checkout ")
            .styled_text(branch.as_ref(), &BLUE)
            .plain_text("...")
    }

    pub(crate) fn switch_unchanged(name: impl AsRef<str>, branch: impl AsRef<str>) -> Self {
        Self::project(name)
            .plain_text(": already on ")
            .styled_text(branch.as_ref(), &BLUE)
    }

    pub(crate) fn switch_succ(name: impl AsRef<str>, branch: impl AsRef<str>) -> Self {
        Self::project(name)
            .styled_text(": switched to ", &GREEN)
            .styled_text(branch.as_ref(), &BLUE)
    }

    pub(crate) fn switch_cancelled(name: impl AsRef<str>, current: Option<&str>) -> Self {
        Self::project(name)
            .styled_text(": [cancelled] switch, staying on ", &YELLOW)
            .styled_text(current.unwrap_or("unknown"), &BLUE)
    }

    pub(crate) fn switch_rolled_back(
        name: impl AsRef<str>,
        current: Option<&str>,
        reason: impl AsRef<str>,
    ) -> Self {
        Self::project(name)
            .styled_text(": switch failed, rolled back to ", &RED)
            .styled_text(current.unwrap_or("unknown"), &BLUE)
            .plain_text(": ")
            .styled_text(reason.as_ref(), &GREY)
    }

    pub(crate) fn switch_rejected(name: impl AsRef<str>) -> Self {
        Self::project(name).styled_text(": switch already in progress, request ignored", &YELLOW)
    }

    pub(crate) fn branch_preference_saved(name: impl AsRef<str>, branch: impl AsRef<str>) -> Self {
        Self::project(name)
            .plain_text(": not downloaded yet, ")
            .styled_text(branch.as_ref(), &BLUE)
            .plain_text(" will be used by the next sync")
    }

    pub(crate) fn conflict_decision(name: impl AsRef<str>, decision: impl AsRef<str>) -> Self {
        Self::project(name)
            .plain_text(": working tree has local changes, decision: ")
            .styled_text(decision.as_ref(), &YELLOW)
    }

    pub(crate) fn branches_found(name: impl AsRef<str>, count: usize) -> Self {
        Self::project(name)
            .plain_text(": ")
            .styled_text(count.to_string(), &BLUE_BOLD)
            .plain_text(" branch(es) found")
    }

    pub(crate) fn query_failed(name: impl AsRef<str>, scope: impl AsRef<str>, err: &anyhow::Error) -> Self {
        Self::project(name)
            .plain_text(format!(": query {} branches failed: ", scope.as_ref()))
            .styled_text(err.to_string().trim(), &RED)
    }
}

impl Display for StyleMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for text in &self.0 {
            write!(f, "{}", text)?;
        }
        Ok(())
    }
}

impl<T> From<T> for StyleMessage
where
    T: AsRef<str>,
{
    fn from(value: T) -> Self {
        StyleMessage::new().plain_text(value.as_ref())
    }
}
