//! Markdown renderings of a command and its output, as produced by `bmd`
//! and its `bmdf`/`bmdff`/`bmdfff` aliases.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::block::FENCE;

static ANSI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[@-_]")
        .expect("ansi pattern")
});

/// How much Markdown structure to wrap around command output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceLevel {
    /// Output lines prefixed with `# `.
    Commented,
    /// One `bash` fence: the command, then commented output.
    Bash,
    /// A `bash` fence with the command, then a second fence with the output.
    Split,
    /// A collapsed `<details>` block with the command as its summary.
    Details,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("fence level {0} is out of range (pass -f/--fence at most 3 times)")]
pub struct InvalidFenceLevel(pub u8);

impl TryFrom<u8> for FenceLevel {
    type Error = InvalidFenceLevel;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(FenceLevel::Commented),
            1 => Ok(FenceLevel::Bash),
            2 => Ok(FenceLevel::Split),
            3 => Ok(FenceLevel::Details),
            n => Err(InvalidFenceLevel(n)),
        }
    }
}

/// Split captured output into lines, dropping the empty line left by a
/// final newline.
pub fn captured_lines(output: &str) -> Vec<String> {
    let mut lines: Vec<String> = output.split('\n').map(str::to_string).collect();
    if lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

/// Format the line appended when the command exits non-zero. The first
/// `%d` is replaced by the exit code; without one the format is used as is.
pub fn error_line(fmt: &str, code: i32) -> String {
    fmt.replacen("%d", &code.to_string(), 1)
}

pub fn strip_ansi(line: &str) -> Cow<'_, str> {
    ANSI_RE.replace_all(line, "")
}

fn commented(line: &str) -> String {
    if line.is_empty() {
        "#".to_string()
    } else {
        format!("# {}", line)
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn fenced(out: &mut Vec<String>, typ: Option<&str>, body: impl IntoIterator<Item = String>) {
    out.push(format!("{}{}", FENCE, typ.unwrap_or_default()));
    out.extend(body);
    out.push(FENCE.to_string());
}

/// Render `command` and its output `lines` at the given level.
pub fn render(
    level: FenceLevel,
    command: &str,
    lines: &[String],
    fence_type: Option<&str>,
) -> Vec<String> {
    let mut out = Vec::new();
    match level {
        FenceLevel::Commented => out.extend(lines.iter().map(|l| commented(l))),
        FenceLevel::Bash => {
            let body = std::iter::once(command.to_string()).chain(lines.iter().map(|l| commented(l)));
            fenced(&mut out, Some("bash"), body);
        }
        FenceLevel::Split => {
            fenced(&mut out, Some("bash"), [command.to_string()]);
            fenced(&mut out, fence_type, lines.iter().cloned());
        }
        FenceLevel::Details => {
            out.push(format!(
                "<details><summary><code>{}</code></summary>",
                escape_html(command)
            ));
            out.push(String::new());
            fenced(&mut out, fence_type, lines.iter().cloned());
            out.push("</details>".to_string());
        }
    }
    out
}
