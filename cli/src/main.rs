use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing::error;

use mdcmd::{Document, Filter, ScanOptions};
use mdcmd_cli::logging;
use runner::{CommandEnv, Concurrency, Options, RunError, Sink, SystemShell};

const DEFAULT_PATH_VAR: &str = "MDCMD_DEFAULT_PATH";
const DEFAULT_PATH: &str = "README.md";

#[derive(Parser, Debug)]
#[command(
    name = "mdcmd",
    version,
    about = "Run the commands in a Markdown document's <!-- `cmd` --> comments and splice their output into the block below each one"
)]
struct Cli {
    /// After an in-place rewrite, amend the change into the HEAD commit
    #[arg(short = 'a', long)]
    amend: bool,

    /// Run commands one at a time, in document order
    #[arg(short = 'C', long)]
    no_concurrent: bool,

    /// Rewrite PATH in place (default when PATH is omitted)
    #[arg(short = 'i', long, overrides_with = "no_inplace")]
    inplace: bool,

    /// Never rewrite in place
    #[arg(short = 'I', long, overrides_with = "inplace")]
    no_inplace: bool,

    /// Report the commands that would run, without running them
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Directory for the temp file of an in-place rewrite
    #[arg(short = 'T', long, env = "MDCMD_TMPDIR", value_name = "DIR")]
    tmpdir: Option<PathBuf>,

    /// Only run commands matching this regex (repeatable)
    #[arg(short = 'x', long = "execute", value_name = "REGEX")]
    execute: Vec<String>,

    /// Skip commands matching this regex (repeatable)
    #[arg(short = 'X', long = "exclude", value_name = "REGEX")]
    exclude: Vec<String>,

    /// Disable colored diagnostics
    #[arg(long)]
    no_color: bool,

    /// Markdown document to process [default: $MDCMD_DEFAULT_PATH or README.md]
    path: Option<PathBuf>,

    /// Where to write the result; `-` for stdout
    out_path: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    logging::init("info", cli.no_color);
    process::exit(run(cli));
}

fn run(cli: Cli) -> i32 {
    let color = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let (path, inplace) = match &cli.path {
        Some(path) => (path.clone(), cli.inplace),
        None => {
            let path = std::env::var_os(DEFAULT_PATH_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PATH));
            if !path.exists() {
                error!("{} not found", path.display());
                return 2;
            }
            (path, !cli.no_inplace)
        }
    };

    if cli.amend && !inplace {
        error!("--amend requires an in-place rewrite");
        return 2;
    }
    let filter = match Filter::new(&cli.execute, &cli.exclude) {
        Ok(filter) => filter,
        Err(err) => {
            error!("invalid filter: {}", err);
            return 2;
        }
    };
    let sink = match Sink::select(&path, cli.out_path.as_deref(), inplace, cli.tmpdir.clone()) {
        Ok(sink) => sink,
        Err(err) => {
            error!("{}", err);
            return 2;
        }
    };
    let options = Options {
        scan: ScanOptions {
            dry_run: cli.dry_run,
            filter,
        },
        concurrency: if cli.no_concurrent {
            Concurrency::Sequential
        } else {
            Concurrency::Concurrent
        },
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("cannot start runtime: {}", err);
            return 2;
        }
    };

    match runtime.block_on(update(&path, &options, &sink, cli.amend, color)) {
        Ok(0) => 0,
        Ok(failed) => {
            error!("{} command(s) failed", failed);
            1
        }
        Err(RunError::Amend(msg)) => {
            error!("amend: {}", msg);
            1
        }
        // Already rendered as a diagnostic.
        Err(RunError::Parse(_)) => 2,
        Err(err) => {
            error!("{}", err);
            2
        }
    }
}

/// One pass over `path`. Returns the number of failed commands.
async fn update(
    path: &Path,
    options: &Options,
    sink: &Sink,
    amend: bool,
    color: ColorChoice,
) -> Result<usize, RunError> {
    let env = CommandEnv::from_process();
    if amend {
        runner::git::check_amendable(path, &env).await?;
    }

    let source = runner::read_source(path)?;
    let mut files = SimpleFiles::new();
    let file_id = files.add(path.display().to_string(), source.clone());
    let doc = Document::parse(&source, file_id);

    let failures =
        match runner::process_document(path, &doc, options, &SystemShell, sink).await {
            Ok(failures) => failures,
            Err(RunError::Parse(err)) => {
                let writer = StandardStream::stderr(color);
                let config = term::Config::default();
                let _ = term::emit_to_write_style(
                    &mut writer.lock(),
                    &config,
                    &files,
                    &err.to_diagnostic(),
                );
                return Err(err.into());
            }
            Err(err) => return Err(err),
        };

    if amend && failures.is_empty() && !options.scan.dry_run {
        runner::git::amend(path, &env).await?;
    }
    Ok(failures.len())
}
