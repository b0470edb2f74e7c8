use std::path::PathBuf;

use thiserror::Error;
use tracing::error;

use mdcmd::{Directive, ParseError};

/// Exit code recorded when a command could not be started at all.
pub const SPAWN_FAILURE_CODE: i32 = 127;

/// Lines of captured output shown when reporting a failure.
const REPORTED_OUTPUT_LINES: usize = 5;

/// A directive whose command exited non-zero. Collected, never raised.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("`{command}` (line {line}) exited with code {exit_code}")]
pub struct CommandFailure {
    pub command: String,
    pub line: usize,
    pub exit_code: i32,
    /// Captured stdout followed by stderr, if there was any.
    pub output: Option<String>,
}

impl CommandFailure {
    pub fn new(directive: &Directive, exit_code: i32, output: Option<String>) -> Self {
        CommandFailure {
            command: directive.command.clone(),
            line: directive.line,
            exit_code,
            output: output.filter(|o| !o.trim().is_empty()),
        }
    }

    /// The first few lines of captured output.
    pub fn excerpt(&self) -> Vec<&str> {
        self.output
            .as_deref()
            .map(|o| o.lines().take(REPORTED_OUTPUT_LINES).collect())
            .unwrap_or_default()
    }

    /// Log the failure to the diagnostics stream.
    pub fn report(&self) {
        error!("{}", self);
        for line in self.excerpt() {
            error!("    {}", line);
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("cannot read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0}")]
    InvalidOptions(String),

    #[error("amend: {0}")]
    Amend(String),
}
