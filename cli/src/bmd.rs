//! `bmd`: run a command and format it, with its output, as a Markdown block
//! ready to paste (or to be generated by an `mdcmd` directive).
//!
//! `bmdf`, `bmdff` and `bmdfff` are the same program with the fence level
//! starting at 1, 2 and 3.

use std::iter;
use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser};
use tracing::error;

use mdcmd::fence::{self, FenceLevel};
use runner::{CommandEnv, Pipeline};

use crate::{clipboard, logging};

const SHELL_VAR: &str = "BMDF_SHELL";
const EXPANDUSER_VAR: &str = "BMDF_EXPANDUSER";
const EXPANDVARS_VAR: &str = "BMDF_EXPANDVARS";
const INCLUDE_STDERR_VAR: &str = "BMDF_INCLUDE_STDERR";

#[derive(Parser, Debug)]
#[command(
    name = "bmd",
    about = "Format a command and its output as Markdown (commented, fenced, or in a <details> block) and copy it to the clipboard",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Strip ANSI escape sequences from output
    #[arg(short = 'A', long)]
    strip_ansi: bool,

    /// Don't copy the result to the clipboard
    #[arg(short = 'C', long)]
    no_copy: bool,

    /// Line appended when the command exits non-zero; a "%d" becomes the exit code
    #[arg(short = 'e', long, env = "BMDF_ERR_FMT", value_name = "FMT")]
    error_fmt: Option<String>,

    /// K=V environment variables for the wrapped command
    #[arg(short = 'E', long = "env", value_name = "K=V")]
    env_strs: Vec<String>,

    /// Output style, repeat 0-3x: commented lines; a bash fence with the
    /// command and commented output; a bash fence followed by an output
    /// fence; a <details> block with the output collapsed
    #[arg(short = 'f', long = "fence", action = ArgAction::Count)]
    fence: u8,

    /// Capture stderr along with stdout (default; falls back to $BMDF_INCLUDE_STDERR)
    #[arg(short = 'i', long, overrides_with = "no_include_stderr")]
    include_stderr: bool,

    /// Capture stdout only
    #[arg(short = 'I', long, overrides_with = "include_stderr")]
    no_include_stderr: bool,

    /// Run through a shell (default; falls back to $BMDF_SHELL)
    #[arg(short = 's', long, overrides_with = "no_shell")]
    shell: bool,

    /// Run the command directly, piping stages without a shell
    #[arg(short = 'S', long, overrides_with = "shell")]
    no_shell: bool,

    /// Syntax type of the output fence, with -ff/-fff
    #[arg(short = 't', long, value_name = "TYPE")]
    fence_type: Option<String>,

    /// Expected exit code: exit 0 if the command exits with it, 1 otherwise
    #[arg(short = 'r', long, value_name = "CODE", allow_negative_numbers = true)]
    exit_code: Option<i32>,

    /// Expand `~` in command words (falls back to $BMDF_EXPANDUSER)
    #[arg(short = 'u', long, overrides_with = "no_expanduser")]
    expanduser: bool,

    #[arg(short = 'U', long, overrides_with = "expanduser")]
    no_expanduser: bool,

    /// Expand `$VARS` in command words (falls back to $BMDF_EXPANDVARS)
    #[arg(short = 'v', long, overrides_with = "no_expandvars")]
    expandvars: bool,

    #[arg(short = 'V', long, overrides_with = "expandvars")]
    no_expandvars: bool,

    /// Directory to run the command in
    #[arg(short = 'w', long, env = "BMDF_WORKDIR", value_name = "DIR")]
    workdir: Option<PathBuf>,

    /// Shell used in shell mode (default: $SHELL, else /bin/sh)
    #[arg(short = 'x', long, value_name = "SHELL")]
    executable: Option<String>,

    /// The command; a lone `|` separates pipeline stages
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

pub fn main(base_level: u8) -> ! {
    let cli = Cli::parse();
    logging::init("warn", false);
    process::exit(run(cli, base_level))
}

/// Tri-state flag: an explicit on/off wins, then the environment variable.
fn flag(on: bool, off: bool, var: &str) -> Option<bool> {
    if on {
        return Some(true);
    }
    if off {
        return Some(false);
    }
    let value = std::env::var(var).ok()?;
    Some(!matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "no" | "off"
    ))
}

fn parse_assignments(env_strs: &[String]) -> Result<Vec<(String, String)>, String> {
    env_strs
        .iter()
        .map(|kv| {
            kv.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| format!("invalid -E/--env value `{}`, expected K=V", kv))
        })
        .collect()
}

fn expand(word: &str, user: bool, vars: bool, env: &CommandEnv) -> String {
    let mut word = word.to_string();
    if user {
        word = shellexpand::tilde(&word).into_owned();
    }
    if vars {
        word = shellexpand::env_with_context_no_errors(&word, |name| {
            env.get(name).map(|v| v.to_string_lossy().into_owned())
        })
        .into_owned();
    }
    word
}

/// `time` only prints parseable output in POSIX mode.
fn posix_time(mut words: Vec<String>) -> Vec<String> {
    let is_time = words.first().is_some_and(|w| w == "time");
    if is_time && words.get(1).is_some_and(|w| !w.starts_with('-')) {
        words.insert(1, "-p".to_string());
    }
    words
}

/// The command line shown in the rendered block: env assignments, then
/// the pipeline.
fn display_command(env_strs: &[String], pipeline: &str) -> String {
    env_strs
        .iter()
        .map(|kv| {
            if kv.contains(' ') {
                format!("\"{}\"", kv)
            } else {
                kv.clone()
            }
        })
        .chain(iter::once(pipeline.to_string()))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn run(cli: Cli, base_level: u8) -> i32 {
    let level = match FenceLevel::try_from(base_level.saturating_add(cli.fence)) {
        Ok(level) => level,
        Err(err) => {
            error!("{}", err);
            return 2;
        }
    };
    let shell = flag(cli.shell, cli.no_shell, SHELL_VAR).unwrap_or(true);
    let include_stderr =
        flag(cli.include_stderr, cli.no_include_stderr, INCLUDE_STDERR_VAR).unwrap_or(true);
    let expanduser = flag(cli.expanduser, cli.no_expanduser, EXPANDUSER_VAR).unwrap_or(false);
    let expandvars = flag(cli.expandvars, cli.no_expandvars, EXPANDVARS_VAR).unwrap_or(false);

    let assignments = match parse_assignments(&cli.env_strs) {
        Ok(assignments) => assignments,
        Err(err) => {
            error!("{}", err);
            return 2;
        }
    };
    let mut env = CommandEnv::from_process();
    for (key, value) in &assignments {
        env.set(key, value);
    }

    let words = posix_time(cli.command.clone());
    let command_line = display_command(&cli.env_strs, &Pipeline::from_words(&words).display());
    let expanded: Vec<String> = words
        .iter()
        .map(|w| expand(w, expanduser, expandvars, &env))
        .collect();

    let mut pipeline = Pipeline::from_words(&expanded)
        .workdir(cli.workdir.clone())
        .include_stderr(include_stderr);
    if shell {
        let executable = cli
            .executable
            .clone()
            .or_else(|| std::env::var("SHELL").ok())
            .unwrap_or_else(|| "/bin/sh".to_string());
        pipeline = pipeline.shell(executable);
    }

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
    let captured = match runtime.block_on(pipeline.run(&env)) {
        Ok(captured) => captured,
        Err(err) => {
            error!("cannot run `{}`: {}", command_line, err);
            return 1;
        }
    };
    if !captured.success() && !captured.stderr.is_empty() {
        eprint!("{}", captured.stderr);
    }

    let mut lines = fence::captured_lines(&captured.stdout);
    if let Some(fmt) = cli.error_fmt.as_deref().filter(|_| !captured.success()) {
        lines.push(fence::error_line(fmt, captured.code));
    }

    let mut rendered = fence::render(level, &command_line, &lines, cli.fence_type.as_deref());
    if cli.strip_ansi {
        rendered = rendered
            .iter()
            .map(|line| fence::strip_ansi(line).into_owned())
            .collect();
    }
    let output = rendered.join("\n");

    if !cli.no_copy {
        clipboard::copy(&output);
    }
    println!("{}", output);

    match cli.exit_code {
        Some(expected) => i32::from(captured.code != expected),
        None if captured.code < 0 => 1,
        None => captured.code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn time_gets_posix_flag() {
        assert_eq!(posix_time(words(&["time", "ls"])), words(&["time", "-p", "ls"]));
        assert_eq!(posix_time(words(&["time", "-v", "ls"])), words(&["time", "-v", "ls"]));
        assert_eq!(posix_time(words(&["ls"])), words(&["ls"]));
    }

    #[test]
    fn assignments_need_an_equals_sign() {
        let parsed = parse_assignments(&words(&["A=1", "B=x=y"])).unwrap();
        assert_eq!(parsed[1], ("B".to_string(), "x=y".to_string()));
        assert!(parse_assignments(&words(&["nope"])).is_err());
    }

    #[test]
    fn displayed_command_quotes_spaced_assignments() {
        let shown = display_command(&words(&["A=1", "B=two words"]), "env | grep A");
        assert_eq!(shown, "A=1 \"B=two words\" env | grep A");
    }

    #[test]
    fn expands_variables_from_the_command_env() {
        let env = CommandEnv::default().with("NAME", "world");
        assert_eq!(expand("hi-$NAME", false, true, &env), "hi-world");
        assert_eq!(expand("$MISSING", false, true, &env), "$MISSING");
        assert_eq!(expand("$NAME", false, false, &env), "$NAME");
    }

    #[test]
    fn cli_parses_fence_count_and_trailing_command() {
        let cli = Cli::parse_from(["bmd", "-ff", "-C", "ls", "-la", "|", "wc", "-l"]);
        assert_eq!(cli.fence, 2);
        assert!(cli.no_copy);
        assert_eq!(cli.command, words(&["ls", "-la", "|", "wc", "-l"]));
    }
}
