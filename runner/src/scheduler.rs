//! Executes scanned commands and reassembles the document in order.

use futures::FutureExt;
use futures::future::{LocalBoxFuture, join_all};
use tracing::debug;

use mdcmd::{Command, Scan, Segment};

use crate::env::CommandEnv;
use crate::error::{CommandFailure, SPAWN_FAILURE_CODE};
use crate::shell::Shell;

/// Whether commands may be in flight at the same time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Concurrency {
    /// Start every command, then wait for all of them.
    #[default]
    Concurrent,
    /// Finish each command before starting the next, in document order.
    Sequential,
}

/// A command's stdout, or why it failed.
pub type ExecutionResult = Result<String, CommandFailure>;

/// One slot of output. Deferred executions are lazy: the command is not
/// spawned until the write is resolved.
pub enum PendingWrite<'a> {
    Literal(String),
    Deferred {
        command: &'a Command,
        execution: LocalBoxFuture<'a, ExecutionResult>,
    },
}

impl PendingWrite<'_> {
    async fn settle(self) -> (Vec<String>, Option<CommandFailure>) {
        match self {
            PendingWrite::Literal(text) => (vec![text], None),
            PendingWrite::Deferred { command, execution } => match execution.await {
                Ok(stdout) => (command.block.render(Some(&stdout)), None),
                Err(failure) => (command.block.render(None), Some(failure)),
            },
        }
    }
}

/// Resolved output lines plus every failure, both in document order.
#[derive(Debug, Default)]
pub struct Resolved {
    pub lines: Vec<String>,
    pub failures: Vec<CommandFailure>,
}

/// Turn a scan into pending writes, one deferred execution per command.
pub fn schedule<'a, S: Shell>(
    scan: &'a Scan,
    shell: &'a S,
    env: &'a CommandEnv,
) -> Vec<PendingWrite<'a>> {
    scan.segments
        .iter()
        .map(|segment| match segment {
            Segment::Literal(text) => PendingWrite::Literal(text.clone()),
            Segment::Command(command) => PendingWrite::Deferred {
                command,
                execution: execute(command, shell, env.clone()).boxed_local(),
            },
        })
        .collect()
}

async fn execute<S: Shell>(command: &Command, shell: &S, env: CommandEnv) -> ExecutionResult {
    let directive = &command.directive;
    debug!(line = directive.line, "running `{}`", directive.command);

    match shell.run(&directive.argv, &env).await {
        Ok(captured) if captured.success() => {
            if !captured.stderr.is_empty() {
                debug!(line = directive.line, "stderr: {}", captured.stderr.trim_end());
            }
            Ok(captured.stdout)
        }
        Ok(captured) => Err(CommandFailure::new(
            directive,
            captured.code,
            Some(captured.combined()),
        )),
        Err(err) => Err(CommandFailure::new(
            directive,
            SPAWN_FAILURE_CODE,
            Some(err.to_string()),
        )),
    }
}

/// Run every pending write to completion.
///
/// Completion order depends on `concurrency`; the returned lines are always
/// in document order.
pub async fn resolve(pending: Vec<PendingWrite<'_>>, concurrency: Concurrency) -> Resolved {
    let settled = match concurrency {
        Concurrency::Concurrent => join_all(pending.into_iter().map(PendingWrite::settle)).await,
        Concurrency::Sequential => {
            let mut settled = Vec::with_capacity(pending.len());
            for write in pending {
                settled.push(write.settle().await);
            }
            settled
        }
    };

    let mut resolved = Resolved::default();
    for (lines, failure) in settled {
        resolved.lines.extend(lines);
        resolved.failures.extend(failure);
    }
    resolved
}
