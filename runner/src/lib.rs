pub mod env;
pub mod error;
pub mod git;
pub mod scheduler;
pub mod shell;
pub mod writer;

use std::path::Path;

use tracing::info;

use mdcmd::{Directive, Document, ParseError, ScanOptions};

pub use env::CommandEnv;
pub use error::{CommandFailure, RunError};
pub use scheduler::{Concurrency, PendingWrite, Resolved, resolve, schedule};
pub use shell::{Captured, Pipeline, Shell, SystemShell};
pub use writer::Sink;

/// Exported to every command: the path of the document being processed.
pub const FILE_ENV_VAR: &str = "MDCMD_FILE";

#[derive(Debug, Clone, Default)]
pub struct Options {
    pub scan: ScanOptions,
    pub concurrency: Concurrency,
}

/// The result of one pass over a document.
#[derive(Debug, Default)]
pub struct Pass {
    /// The rewritten document, in order.
    pub lines: Vec<String>,
    pub failures: Vec<CommandFailure>,
    /// Directives reported instead of run (dry-run mode).
    pub dry_run: Vec<Directive>,
}

impl Pass {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

pub fn read_source(path: &Path) -> Result<String, RunError> {
    std::fs::read_to_string(path).map_err(|source| RunError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Scan `doc`, run its commands with `shell`, and resolve the rewritten
/// lines. `path` is exported to the commands as `MDCMD_FILE`.
pub async fn run_document<S: Shell>(
    path: &Path,
    doc: &Document,
    options: &Options,
    shell: &S,
) -> Result<Pass, ParseError> {
    let scan = mdcmd::scan(doc, &options.scan)?;
    for directive in &scan.dry_run {
        info!("would run: {}", directive.command);
    }

    let env = CommandEnv::from_process().with(FILE_ENV_VAR, path);
    let pending = schedule(&scan, shell, &env);
    let resolved = resolve(pending, options.concurrency).await;
    for failure in &resolved.failures {
        failure.report();
    }

    Ok(Pass {
        lines: resolved.lines,
        failures: resolved.failures,
        dry_run: scan.dry_run,
    })
}

/// Run `doc`, read from `path`, and write the result to `sink`.
///
/// Nothing is written unless the whole document scanned cleanly; command
/// failures are returned, not raised.
pub async fn process_document<S: Shell>(
    path: &Path,
    doc: &Document,
    options: &Options,
    shell: &S,
    sink: &Sink,
) -> Result<Vec<CommandFailure>, RunError> {
    let pass = run_document(path, doc, options, shell).await?;
    sink.write(&pass.lines)?;
    Ok(pass.failures)
}
