//! Running commands: the `Shell` seam the scheduler executes through, and
//! the `Pipeline` that does the actual process work.

use std::ffi::OsStr;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use futures::future::try_join_all;
use tokio::process::Command;

use crate::env::CommandEnv;

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Captured {
    pub stdout: String,
    pub stderr: String,
    /// Exit code; -1 when the process was killed by a signal.
    pub code: i32,
}

impl Captured {
    fn from_output(output: Output) -> Self {
        Captured {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            code: output.status.code().unwrap_or(-1),
        }
    }

    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Stdout followed by stderr.
    pub fn combined(&self) -> String {
        let mut text = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&self.stderr);
        }
        text
    }
}

/// Something that can run a command given as argument words.
pub trait Shell {
    fn run(&self, argv: &[String], env: &CommandEnv)
    -> impl Future<Output = io::Result<Captured>>;
}

/// Runs commands as real child processes, without a shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemShell;

impl Shell for SystemShell {
    fn run(
        &self,
        argv: &[String],
        env: &CommandEnv,
    ) -> impl Future<Output = io::Result<Captured>> {
        let pipeline = Pipeline::new(vec![argv.to_vec()]);
        async move { pipeline.run(env).await }
    }
}

/// One or more commands with each stage's stdout feeding the next stage's
/// stdin.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<Vec<String>>,
    /// Run the whole pipeline as a script through this shell.
    shell: Option<PathBuf>,
    workdir: Option<PathBuf>,
    include_stderr: bool,
}

impl Pipeline {
    pub fn new(stages: Vec<Vec<String>>) -> Self {
        Pipeline {
            stages,
            ..Default::default()
        }
    }

    /// Split `words` into stages at each literal `|`.
    pub fn from_words(words: &[String]) -> Self {
        let stages = words
            .split(|w| w == "|")
            .filter(|stage| !stage.is_empty())
            .map(<[String]>::to_vec)
            .collect();
        Pipeline::new(stages)
    }

    pub fn shell(mut self, executable: impl Into<PathBuf>) -> Self {
        self.shell = Some(executable.into());
        self
    }

    pub fn workdir(mut self, dir: Option<PathBuf>) -> Self {
        self.workdir = dir;
        self
    }

    pub fn include_stderr(mut self, include: bool) -> Self {
        self.include_stderr = include;
        self
    }

    pub fn stages(&self) -> &[Vec<String>] {
        &self.stages
    }

    /// The pipeline as a shell-quoted command line.
    pub fn display(&self) -> String {
        self.stages
            .iter()
            .map(|stage| {
                shlex::try_join(stage.iter().map(String::as_str))
                    .unwrap_or_else(|_| stage.join(" "))
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }

    pub async fn run(&self, env: &CommandEnv) -> io::Result<Captured> {
        if self.stages.is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty command"));
        }
        let mut captured = match &self.shell {
            Some(shell) => self.run_script(shell, env).await?,
            None => self.run_stages(env).await?,
        };
        if self.include_stderr && self.shell.is_none() {
            captured.stdout = captured.combined();
            captured.stderr.clear();
        }
        Ok(captured)
    }

    fn command(&self, program: impl AsRef<OsStr>, env: &CommandEnv) -> Command {
        let mut cmd = Command::new(program);
        cmd.env_clear()
            .envs(env.iter())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }
        cmd
    }

    async fn run_script(&self, shell: &Path, env: &CommandEnv) -> io::Result<Captured> {
        let mut script = self.display();
        if self.include_stderr {
            // Route every stage's stderr into the captured stream.
            script = format!("exec 2>&1; {}", script);
        }
        let output = self.command(shell, env).arg("-c").arg(script).output().await?;
        Ok(Captured::from_output(output))
    }

    async fn run_stages(&self, env: &CommandEnv) -> io::Result<Captured> {
        let mut children = Vec::with_capacity(self.stages.len());
        let mut upstream: Option<Stdio> = None;

        for (idx, stage) in self.stages.iter().enumerate() {
            let Some((program, args)) = stage.split_first() else {
                return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty pipeline stage"));
            };
            let mut cmd = self.command(program, env);
            cmd.args(args);
            if let Some(stdin) = upstream.take() {
                cmd.stdin(stdin);
            }
            let mut child = cmd.spawn()?;
            if idx + 1 < self.stages.len() {
                let stdout = child.stdout.take().ok_or_else(|| {
                    io::Error::new(io::ErrorKind::BrokenPipe, "stage stdout not captured")
                })?;
                upstream = Some(stdout.try_into()?);
            }
            children.push(child);
        }

        // Wait on every stage at once so no stage blocks on a full stderr pipe.
        let outputs = try_join_all(children.into_iter().map(|c| c.wait_with_output())).await?;

        let mut captured = Captured::default();
        for output in outputs {
            let stage = Captured::from_output(output);
            if !stage.success() {
                captured.code = stage.code;
            }
            captured.stdout = stage.stdout;
            captured.stderr.push_str(&stage.stderr);
        }
        Ok(captured)
    }
}
