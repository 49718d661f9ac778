//! Chat Log Persistence
//!
//! Finished turns are appended to a markdown file per calendar day,
//! `<dir>/<YYYYMMDD>-chatbot-data.md`. Each turn becomes one block:
//!
//! ```text
//! ## Chat log (20261018)
//!
//! ### **[14:03:22]** Model: gpt-5.1 | Scenario: General assistant
//!
//! #### User:
//! ...
//!
//! #### Assistant:
//! ...
//!
//! ---
//! ```

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::ChatError;
use crate::session::{Turn, TurnStatus};

/// Suffix of the daily log file name
pub const LOG_FILE_SUFFIX: &str = "-chatbot-data.md";

/// Destination for finished turns
pub trait TurnSink: Send {
    /// Whether the destination can currently accept a turn
    fn is_ready(&self) -> bool {
        true
    }

    /// Short human readable description of where turns go
    fn describe(&self) -> String;

    /// Persist a closed turn, returning where it was written.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Persist`] if the destination cannot be written.
    fn persist(&mut self, turn: &Turn) -> Result<PathBuf, ChatError>;
}

/// Appends turns to daily markdown files in a directory
#[derive(Clone, Debug)]
pub struct MarkdownChatLog {
    dir: PathBuf,
}

impl MarkdownChatLog {
    /// Log into `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory receiving the log files
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that receives entries written at `at`
    #[must_use]
    pub fn file_for(&self, at: &DateTime<Local>) -> PathBuf {
        self.dir
            .join(format!("{}{LOG_FILE_SUFFIX}", at.format("%Y%m%d")))
    }

    /// Append `turn` as if written at `at`.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Persist`] if the file cannot be opened or written.
    pub fn persist_at(&self, turn: &Turn, at: &DateTime<Local>) -> Result<PathBuf, ChatError> {
        let path = self.file_for(at);
        let entry = render_entry(turn, at);

        let to_persist_error = |source| ChatError::Persist {
            path: path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(to_persist_error)?;
        file.write_all(entry.as_bytes()).map_err(to_persist_error)?;

        tracing::debug!(turn = %turn.id, path = %path.display(), "Turn appended to chat log");
        Ok(path)
    }
}

impl TurnSink for MarkdownChatLog {
    fn is_ready(&self) -> bool {
        self.dir.is_dir()
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }

    fn persist(&mut self, turn: &Turn) -> Result<PathBuf, ChatError> {
        self.persist_at(turn, &Local::now())
    }
}

/// Render one turn as a markdown block
#[must_use]
pub fn render_entry(turn: &Turn, at: &DateTime<Local>) -> String {
    let mut entry = format!(
        "\n## Chat log ({date})\n\n\
         ### **[{time}]** Model: {model} | Scenario: {scenario}\n\n\
         #### User:\n{user}\n\n\
         #### Assistant:\n{assistant}\n",
        date = at.format("%Y%m%d"),
        time = at.format("%H:%M:%S"),
        model = turn.model,
        scenario = turn.scenario,
        user = turn.user_text,
        assistant = turn.assistant_text,
    );
    if let TurnStatus::Failed { error } = &turn.status {
        entry.push_str(&format!("\n> Response incomplete: {error}\n"));
    }
    entry.push_str("\n---\n");
    entry
}
