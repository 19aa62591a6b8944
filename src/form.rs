use std::collections::VecDeque;

use crate::domain::InstallRequest;
use crate::msg::{LogEntry, WorkerMsg};

pub const TRIGGER_LABEL: &str = "Download & Install Vehicle XML!";
pub const TRIGGER_BUSY_LABEL: &str = "Processing...";
const LOG_MAX: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    ItemInput,
    SourceUrl,
    Browse,
    Install,
}

impl Field {
    const ORDER: [Field; 4] = [
        Field::ItemInput,
        Field::SourceUrl,
        Field::Install,
        Field::Browse,
    ];

    fn position(self) -> usize {
        Self::ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ORDER[(self.position() + 1) % Self::ORDER.len()]
    }

    pub fn prev(self) -> Self {
        Self::ORDER[(self.position() + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }

    pub fn is_text(self) -> bool {
        matches!(self, Field::ItemInput | Field::SourceUrl)
    }
}

#[derive(Debug, Clone)]
pub struct LogLine {
    pub stamp: String,
    pub entry: LogEntry,
}

impl LogLine {
    /// Message lines; the log draws each on its own row.
    pub fn parts(&self) -> std::str::Lines<'_> {
        self.entry.message.lines()
    }
}

/// Everything the window shows. Only the window thread touches it.
#[derive(Debug)]
pub struct Form {
    workshop_dir: String,
    item_input: String,
    source_url: String,
    focus: Field,
    trigger_enabled: bool,
    log: VecDeque<LogLine>,
}

impl Form {
    pub fn new(workshop_dir: impl Into<String>) -> Self {
        Self {
            workshop_dir: workshop_dir.into(),
            item_input: String::new(),
            source_url: String::new(),
            focus: Field::ItemInput,
            trigger_enabled: true,
            log: VecDeque::new(),
        }
    }

    pub fn workshop_dir(&self) -> &str {
        &self.workshop_dir
    }

    pub fn set_workshop_dir(&mut self, path: impl Into<String>) {
        self.workshop_dir = path.into();
    }

    pub fn item_input(&self) -> &str {
        &self.item_input
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn focus(&self) -> Field {
        self.focus
    }

    pub fn focus_next(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn focus_prev(&mut self) {
        self.focus = self.focus.prev();
    }

    pub fn trigger_enabled(&self) -> bool {
        self.trigger_enabled
    }

    pub fn trigger_label(&self) -> &'static str {
        if self.trigger_enabled {
            TRIGGER_LABEL
        } else {
            TRIGGER_BUSY_LABEL
        }
    }

    pub fn log_lines(&self) -> impl Iterator<Item = &LogLine> {
        self.log.iter()
    }

    pub fn log_len(&self) -> usize {
        self.log.len()
    }

    /// Rows the log occupies when every message line is drawn on its own row.
    pub fn log_rows(&self) -> usize {
        self.log.iter().map(|line| line.parts().count()).sum()
    }

    pub fn push_log(&mut self, entry: LogEntry) {
        if entry.is_error() {
            tracing::warn!("log: {}", entry.message);
        } else {
            tracing::debug!("log: {}", entry.message);
        }
        self.log.push_back(LogLine {
            stamp: chrono::Local::now().format("%H:%M:%S").to_string(),
            entry,
        });
        while self.log.len() > LOG_MAX {
            self.log.pop_front();
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push_log(LogEntry::info(message));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push_log(LogEntry::error(message));
    }

    fn focused_text(&mut self) -> Option<&mut String> {
        match self.focus {
            Field::ItemInput => Some(&mut self.item_input),
            Field::SourceUrl => Some(&mut self.source_url),
            Field::Browse | Field::Install => None,
        }
    }

    pub fn input_char(&mut self, ch: char) {
        if let Some(text) = self.focused_text() {
            text.push(ch);
        }
    }

    /// Pasted text lands in the focused field with line breaks dropped.
    pub fn paste(&mut self, pasted: &str) {
        if let Some(text) = self.focused_text() {
            text.extend(pasted.chars().filter(|ch| *ch != '\n' && *ch != '\r'));
        }
    }

    pub fn backspace(&mut self) {
        if let Some(text) = self.focused_text() {
            text.pop();
        }
    }

    pub fn clear_field(&mut self) {
        if let Some(text) = self.focused_text() {
            text.clear();
        }
    }

    /// Disables the trigger and hands out the request for a new run.
    ///
    /// Returns `None` while a previous run still holds the trigger.
    pub fn begin_install(&mut self) -> Option<InstallRequest> {
        if !self.trigger_enabled {
            return None;
        }
        self.trigger_enabled = false;
        self.log.clear();
        self.info("--- Starting Installation Process ---");
        self.info(
            "WARNING: This tool modifies local Steam Workshop files. Steam might revert these changes.",
        );
        Some(InstallRequest::new(
            self.workshop_dir.as_str(),
            self.item_input.as_str(),
            self.source_url.as_str(),
        ))
    }

    pub fn apply(&mut self, msg: WorkerMsg) {
        match msg {
            WorkerMsg::Log(entry) => self.push_log(entry),
            WorkerMsg::TriggerReleased => self.trigger_enabled = true,
        }
    }
}
