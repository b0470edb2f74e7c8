use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Fenced code block delimiter.
pub const FENCE: &str = "```";

/// Commands whose output is two consecutive fenced blocks (the command,
/// then its output), so the block they replace closes through two fences.
pub const DOUBLE_FENCE_COMMANDS: &[&str] = &["bmdff"];

static HTML_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^<(?P<tag>\w+)(?: +\w+(?:="[^"]*")?)* *>.*$"#).expect("html open pattern")
});

static LINK_DEF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(?P<ref>[^\]]+)\]: (?P<url>.+)$").expect("link definition pattern")
});

static FENCE_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```\w*$").expect("fence open pattern"));

/// The shape of the block following a directive.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    /// ```` ``` ```` ... ```` ``` ````. `double` blocks close through a second fence.
    Fenced { double: bool },
    /// `<tag ...>` ... `</tag>`
    Html { tag: String },
    /// `- item` lines and their indented continuations, plus one blank line
    /// ending the run.
    List,
    /// Contiguous `[ref]: url` lines.
    LinkDefs,
    /// A single empty line: nothing to replace yet.
    Blank,
    /// The directive is the last line of the document.
    Eof,
}

/// A line that ends (part of) a block.
#[derive(Debug, Clone)]
pub enum Closer {
    Exact(String),
    Pattern(&'static Regex),
}

impl Closer {
    pub fn matches(&self, line: &str) -> bool {
        match self {
            Closer::Exact(text) => line == text,
            Closer::Pattern(re) => re.is_match(line),
        }
    }
}

impl fmt::Display for Closer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Closer::Exact(text) => write!(f, "`{}`", text),
            Closer::Pattern(re) => write!(f, "a line matching `{}`", re.as_str()),
        }
    }
}

fn is_list_line(line: &str) -> bool {
    line.starts_with("- ") || line.starts_with("  ")
}

impl BlockKind {
    /// Classify the line after a directive. `next` is `None` at end of input.
    /// Returns `None` for a line that cannot start a replaceable block.
    pub fn classify(next: Option<&str>, program: &str) -> Option<BlockKind> {
        let Some(line) = next else {
            return Some(BlockKind::Eof);
        };

        if let Some(caps) = HTML_OPEN_RE.captures(line) {
            return Some(BlockKind::Html {
                tag: caps["tag"].to_string(),
            });
        }
        if line.starts_with(FENCE) {
            return Some(BlockKind::Fenced {
                double: DOUBLE_FENCE_COMMANDS.contains(&program),
            });
        }
        if line.starts_with("- ") {
            return Some(BlockKind::List);
        }
        if LINK_DEF_RE.is_match(line) {
            return Some(BlockKind::LinkDefs);
        }
        if line.is_empty() {
            return Some(BlockKind::Blank);
        }
        None
    }

    /// Close lines to skip past, in order, after the opening line.
    pub fn closers(&self) -> Vec<Closer> {
        match self {
            BlockKind::Fenced { double: false } => vec![Closer::Exact(FENCE.to_string())],
            BlockKind::Fenced { double: true } => vec![
                Closer::Exact(FENCE.to_string()),
                Closer::Pattern(&*FENCE_OPEN_RE),
                Closer::Exact(FENCE.to_string()),
            ],
            BlockKind::Html { tag } => vec![Closer::Exact(format!("</{}>", tag))],
            BlockKind::List | BlockKind::LinkDefs | BlockKind::Blank | BlockKind::Eof => {
                Vec::new()
            }
        }
    }

    /// Whether `line` still belongs to an open-ended (list or link-def) block.
    pub fn continues(&self, line: &str) -> bool {
        match self {
            BlockKind::List => is_list_line(line),
            BlockKind::LinkDefs => LINK_DEF_RE.is_match(line),
            _ => false,
        }
    }

    /// Whether `body` is by itself one complete block of this kind: it opens
    /// the same shape and its closers end exactly on its last line. Such
    /// output scans back to the same block, so it can stand in for the
    /// original delimiters.
    pub fn encloses(&self, body: &[String]) -> bool {
        let Some((first, rest)) = body.split_first() else {
            return false;
        };
        let opens = match self {
            BlockKind::Fenced { .. } => first.starts_with(FENCE),
            BlockKind::Html { tag } => HTML_OPEN_RE
                .captures(first)
                .is_some_and(|caps| &caps["tag"] == tag),
            _ => false,
        };
        if !opens {
            return false;
        }

        let mut rest = rest.iter();
        for closer in self.closers() {
            if !rest.any(|line| closer.matches(line)) {
                return false;
            }
        }
        rest.next().is_none()
    }

    pub fn name(&self) -> &'static str {
        match self {
            BlockKind::Fenced { double: false } => "fenced code",
            BlockKind::Fenced { double: true } => "double fenced code",
            BlockKind::Html { .. } => "HTML",
            BlockKind::List => "list",
            BlockKind::LinkDefs => "link definition",
            BlockKind::Blank => "blank",
            BlockKind::Eof => "end of input",
        }
    }
}

/// The lines consumed after a directive, to be replaced by its output.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    /// Consumed source lines, delimiters included.
    pub lines: Vec<String>,
}

impl Block {
    pub fn new(kind: BlockKind) -> Self {
        Block {
            kind,
            lines: Vec::new(),
        }
    }

    /// Lines to write in place of this block. `None` means the command
    /// failed, and the block is written back unchanged.
    ///
    /// Fenced and HTML blocks keep their delimiters unless the output is a
    /// complete block of the same kind; lists, blank and end-of-input slots
    /// get a trailing empty line.
    pub fn render(&self, output: Option<&str>) -> Vec<String> {
        let Some(output) = output else {
            return self.lines.clone();
        };
        let mut body = replacement_lines(output);

        match &self.kind {
            BlockKind::Fenced { .. } | BlockKind::Html { .. } => {
                match (self.lines.first(), self.lines.last()) {
                    (Some(open), Some(close)) if !self.kind.encloses(&body) => {
                        let mut lines = Vec::with_capacity(body.len() + 2);
                        lines.push(open.clone());
                        lines.append(&mut body);
                        lines.push(close.clone());
                        lines
                    }
                    _ => body,
                }
            }
            BlockKind::LinkDefs => body,
            BlockKind::List | BlockKind::Blank | BlockKind::Eof => {
                body.push(String::new());
                body
            }
        }
    }
}

/// Split command output into lines, ignoring trailing newlines.
/// Empty output yields no lines.
pub fn replacement_lines(output: &str) -> Vec<String> {
    let output = output.trim_end_matches('\n');
    if output.is_empty() {
        return Vec::new();
    }
    output.split('\n').map(str::to_string).collect()
}
