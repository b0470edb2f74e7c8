use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::RunError;

/// Where a rewritten document goes.
#[derive(Debug, Clone, PartialEq)]
pub enum Sink {
    Stdout,
    File(PathBuf),
    /// Replace `target` atomically: write a temp file in `tmpdir` (default:
    /// the target's directory), then rename it over the target.
    InPlace {
        target: PathBuf,
        tmpdir: Option<PathBuf>,
    },
}

impl Sink {
    /// Pick the sink for `path` from the command-line choices. An output
    /// path of `-` means stdout.
    pub fn select(
        path: &Path,
        out_path: Option<&Path>,
        inplace: bool,
        tmpdir: Option<PathBuf>,
    ) -> Result<Sink, RunError> {
        if inplace {
            if out_path.is_some() {
                return Err(RunError::InvalidOptions(
                    "cannot write in place and to an output path".to_string(),
                ));
            }
            return Ok(Sink::InPlace {
                target: path.to_path_buf(),
                tmpdir,
            });
        }
        Ok(match out_path {
            Some(out) if out != Path::new("-") => Sink::File(out.to_path_buf()),
            _ => Sink::Stdout,
        })
    }

    pub fn write(&self, lines: &[String]) -> Result<(), RunError> {
        match self {
            Sink::Stdout => {
                let stdout = io::stdout();
                write_lines(&mut stdout.lock(), lines).map_err(|source| RunError::Write {
                    path: PathBuf::from("<stdout>"),
                    source,
                })
            }
            Sink::File(path) => write_file(path, lines).map_err(|source| RunError::Write {
                path: path.clone(),
                source,
            }),
            Sink::InPlace { target, tmpdir } => {
                replace_file(target, tmpdir.as_deref(), lines).map_err(|source| {
                    RunError::Write {
                        path: target.clone(),
                        source,
                    }
                })
            }
        }
    }
}

/// Write each line followed by `\n`.
pub fn write_lines(out: &mut impl Write, lines: &[String]) -> io::Result<()> {
    for line in lines {
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")?;
    }
    out.flush()
}

fn write_file(path: &Path, lines: &[String]) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_lines(&mut out, lines)
}

fn replace_file(target: &Path, tmpdir: Option<&Path>, lines: &[String]) -> io::Result<()> {
    let dir = match tmpdir {
        Some(dir) => dir,
        None => target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new(".")),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut out = BufWriter::new(tmp.as_file_mut());
        write_lines(&mut out, lines)?;
    }
    if let Ok(meta) = fs::metadata(target) {
        fs::set_permissions(tmp.path(), meta.permissions())?;
    }
    tmp.persist(target).map_err(|err| err.error)?;
    Ok(())
}
