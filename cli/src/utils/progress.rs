use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use pdl::ops::SyncStatus;
use pdl::utils::progress::ProgressSink;
use pdl::utils::style_message::{StyleMessage, BLUE, GREEN_BOLD, RED_BOLD};

/// One spinner per project, log lines printed above them.
pub(crate) struct TermSink {
    multi_progress: MultiProgress,
    spinners: RefCell<HashMap<String, ProgressBar>>,
    show_branches: Cell<bool>,
}

impl TermSink {
    pub(crate) fn new(multi_progress: MultiProgress) -> Self {
        Self {
            multi_progress,
            spinners: RefCell::new(HashMap::new()),
            show_branches: Cell::new(false),
        }
    }

    /// also print branch lists as they arrive
    pub(crate) fn show_branches(&self) {
        self.show_branches.set(true);
    }

    fn println(&self, line: impl AsRef<str>) {
        // bars are hidden without a terminal, plain stdout then
        if !console::user_attended_stderr() || self.multi_progress.println(line.as_ref()).is_err() {
            println!("{}", line.as_ref());
        }
    }

    fn with_spinner(&self, project: &str, f: impl FnOnce(&ProgressBar)) {
        let mut spinners = self.spinners.borrow_mut();
        let spinner = spinners.entry(project.to_string()).or_insert_with(|| {
            let spinner = self.multi_progress.add(ProgressBar::new(100));
            spinner.set_style(
                ProgressStyle::with_template("{spinner:.green.dim.bold} {prefix} [{bar:20.green/white}] {pos:>3}% {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .tick_chars("/-\\| ")
                    .progress_chars("=>-"),
            );
            spinner.set_prefix(StyleMessage::project(project).to_string());
            spinner.enable_steady_tick(Duration::from_millis(200));
            spinner
        });
        f(spinner);
    }
}

impl ProgressSink for TermSink {
    fn on_log(&self, message: &StyleMessage) {
        self.println(message.to_string());
    }

    fn on_status(&self, project: &str, status: SyncStatus) {
        self.with_spinner(project, |spinner| {
            let sign = match status {
                SyncStatus::Succeeded => GREEN_BOLD.paint("√").to_string(),
                SyncStatus::Failed => RED_BOLD.paint("x").to_string(),
                _ => {
                    spinner.set_message(StyleMessage::status(status).to_string());
                    return;
                }
            };
            if !spinner.is_finished() {
                spinner.finish_with_message(format!("{} {}", sign, StyleMessage::status(status)));
            }
        });
    }

    fn on_progress(&self, project: &str, percent: u8, label: &str) {
        self.with_spinner(project, |spinner| {
            spinner.set_position(percent as u64);
            spinner.set_message(truncate_spinner_msg(label));
        });
    }

    fn on_branches(&self, project: &str, branches: &BTreeSet<String>) {
        if !self.show_branches.get() {
            return;
        }
        let list = branches
            .iter()
            .map(|b| BLUE.paint(b).to_string())
            .collect::<Vec<_>>()
            .join(", ");
        self.println(format!("{}: {}", StyleMessage::project(project), list));
    }

    fn on_batch_finish(&self, _batch: usize, _succeeded: usize, _failed: usize) {
        for spinner in self.spinners.borrow_mut().drain().map(|(_, s)| s) {
            if !spinner.is_finished() {
                spinner.abandon();
            }
        }
    }
}

pub(crate) fn get_terminal_width() -> usize {
    match term_size::dimensions() {
        Some((width, _)) if width > 40 => width - 40,
        _ => 40,
    }
}

pub(crate) fn truncate_spinner_msg(msg: impl AsRef<str>) -> String {
    let max_width = get_terminal_width();
    console::truncate_str(msg.as_ref(), max_width, "...").to_string()
}
