pub mod block;
pub mod directive;
pub mod document;
pub mod fence;
pub mod filter;
pub mod scanner;

pub use block::{Block, BlockKind};
pub use directive::Directive;
pub use document::{Document, Line};
pub use filter::Filter;
pub use scanner::{Command, ParseError, Scan, ScanOptions, Segment, scan};
