use std::ops::Range;

/// A single source line, without its `\n` terminator.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub text: String,
    /// 1-based line number.
    pub number: usize,
    /// Byte span in source for error reporting (terminator excluded).
    pub span: Range<usize>,
}

/// A Markdown source split into lines. Nothing here understands Markdown;
/// the scanner pattern-matches the raw text.
#[derive(Debug, Clone)]
pub struct Document {
    pub lines: Vec<Line>,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
}

impl Document {
    /// Split `source` on `\n`. A `\r` before the newline stays part of the line.
    pub fn parse(source: &str, source_id: usize) -> Self {
        let mut lines = Vec::new();
        let mut offset = 0;
        for (idx, raw) in source.split_inclusive('\n').enumerate() {
            let text = raw.strip_suffix('\n').unwrap_or(raw);
            lines.push(Line {
                text: text.to_string(),
                number: idx + 1,
                span: offset..offset + text.len(),
            });
            offset += raw.len();
        }
        Document { lines, source_id }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
