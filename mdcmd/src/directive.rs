use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::document::Line;
use crate::scanner::ParseError;

static DIRECTIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<!-- `(?P<cmd>.+)` -->$").expect("directive pattern"));

/// Return the command string if `line` is a directive comment.
pub fn command_of(line: &str) -> Option<&str> {
    DIRECTIVE_RE
        .captures(line)
        .and_then(|caps| caps.name("cmd"))
        .map(|m| m.as_str())
}

/// A ``<!-- `cmd` -->`` line naming the command whose output fills the
/// block below it.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    /// The command exactly as written between the backticks.
    pub command: String,
    /// The command split into words with POSIX shell rules.
    pub argv: Vec<String>,
    /// 1-based line number of the directive.
    pub line: usize,
    pub span: Range<usize>,
}

impl Directive {
    pub fn parse(command: &str, line: &Line, file_id: usize) -> Result<Self, ParseError> {
        let argv = shlex::split(command)
            .filter(|words| !words.is_empty())
            .ok_or_else(|| {
                ParseError::error(
                    format!("cannot split `{}` into command words", command),
                    line.span.clone(),
                    file_id,
                )
                .with_note("check for unbalanced quotes or a trailing backslash")
            })?;

        Ok(Directive {
            command: command.to_string(),
            argv,
            line: line.number,
            span: line.span.clone(),
        })
    }

    /// The first command word.
    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }
}
