pub mod error;

pub use error::ParseError;

use std::iter::Peekable;

use crate::block::{Block, BlockKind};
use crate::directive::{self, Directive};
use crate::document::{Document, Line};
use crate::filter::Filter;

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Record directives instead of consuming their blocks.
    pub dry_run: bool,
    /// Directives whose command the filter rejects are left alone.
    pub filter: Filter,
}

/// A directive together with the block its output replaces.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub directive: Directive,
    pub block: Block,
}

/// One unit of the output plan, in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// A line copied through unchanged.
    Literal(String),
    /// A block to be replaced by the command's output.
    Command(Command),
}

#[derive(Debug, Clone, Default)]
pub struct Scan {
    pub segments: Vec<Segment>,
    /// Directives that would have run, in dry-run mode.
    pub dry_run: Vec<Directive>,
}

impl Scan {
    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Command(command) => Some(command),
            Segment::Literal(_) => None,
        })
    }
}

/// Scan a document into literal lines and commands.
///
/// Scanning is purely synchronous: nothing is executed here, so a fatal
/// error is reported before any command has had a chance to run.
pub fn scan(doc: &Document, options: &ScanOptions) -> Result<Scan, ParseError> {
    let mut scan = Scan::default();
    let mut lines = doc.lines.iter().peekable();

    while let Some(line) = lines.next() {
        scan.segments.push(Segment::Literal(line.text.clone()));

        let Some(command) = directive::command_of(&line.text) else {
            continue;
        };
        if !options.filter.allows(command) {
            continue;
        }

        let directive = Directive::parse(command, line, doc.source_id)?;
        if options.dry_run {
            scan.dry_run.push(directive);
            continue;
        }

        let block = consume_block(&directive, &mut lines, doc.source_id)?;
        scan.segments.push(Segment::Command(Command { directive, block }));
    }

    Ok(scan)
}

fn consume_block<'a, I>(
    directive: &Directive,
    lines: &mut Peekable<I>,
    file_id: usize,
) -> Result<Block, ParseError>
where
    I: Iterator<Item = &'a Line>,
{
    let next = lines.peek().copied();
    let Some(kind) = BlockKind::classify(next.map(|l| l.text.as_str()), directive.program()) else {
        let span = next.map(|l| l.span.clone()).unwrap_or(directive.span.clone());
        return Err(ParseError::error(
            format!("unexpected block start under `{}`", directive.command),
            span,
            file_id,
        )
        .with_label(directive.span.clone(), "directive here")
        .with_note(
            "a directive must be followed by a fenced code block, an HTML tag, \
             a list, link definitions, or a blank line",
        ));
    };

    let mut block = Block::new(kind);
    match &block.kind {
        BlockKind::Eof => {}
        BlockKind::Blank => {
            if let Some(line) = lines.next() {
                block.lines.push(line.text.clone());
            }
        }
        BlockKind::List | BlockKind::LinkDefs => {
            while let Some(line) = lines.next_if(|l| block.kind.continues(&l.text)) {
                block.lines.push(line.text.clone());
            }
            // The list's separator is rewritten along with it.
            if block.kind == BlockKind::List {
                if let Some(blank) = lines.next_if(|l| l.text.is_empty()) {
                    block.lines.push(blank.text.clone());
                }
            }
        }
        BlockKind::Fenced { .. } | BlockKind::Html { .. } => {
            let Some(open) = lines.next() else {
                return Ok(block);
            };
            block.lines.push(open.text.clone());

            for closer in block.kind.closers() {
                loop {
                    let Some(line) = lines.next() else {
                        return Err(ParseError::error(
                            format!(
                                "unterminated {} block under `{}`",
                                block.kind.name(),
                                directive.command
                            ),
                            open.span.clone(),
                            file_id,
                        )
                        .with_label(directive.span.clone(), "directive here")
                        .with_note(format!("expected {} before end of input", closer)));
                    };
                    block.lines.push(line.text.clone());
                    if closer.matches(&line.text) {
                        break;
                    }
                }
            }
        }
    }

    Ok(block)
}
