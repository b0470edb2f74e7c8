//! Folding an in-place rewrite into the current git commit (`--amend`).

use std::path::Path;

use tracing::info;

use crate::env::CommandEnv;
use crate::error::RunError;
use crate::shell::{Captured, Pipeline};

async fn git(args: &[&str], path: &Path, env: &CommandEnv) -> Result<Captured, RunError> {
    let mut argv = vec!["git".to_string()];
    argv.extend(args.iter().map(|a| a.to_string()));
    argv.push("--".to_string());
    argv.push(path.to_string_lossy().into_owned());

    Pipeline::new(vec![argv])
        .run(env)
        .await
        .map_err(|err| RunError::Amend(format!("cannot run git: {}", err)))
}

/// Check that `path` can be amended into HEAD: it is tracked in a git work
/// tree and nothing is staged that would be swept into the commit.
pub async fn check_amendable(path: &Path, env: &CommandEnv) -> Result<(), RunError> {
    let tracked = git(&["ls-files", "--error-unmatch"], path, env).await?;
    if !tracked.success() {
        return Err(RunError::Amend(format!(
            "{} is not tracked by git",
            path.display()
        )));
    }

    let staged = Pipeline::new(vec![
        ["git", "diff", "--cached", "--quiet"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    ])
    .run(env)
    .await
    .map_err(|err| RunError::Amend(format!("cannot run git: {}", err)))?;
    if !staged.success() {
        return Err(RunError::Amend(
            "the index has staged changes; commit or unstage them first".to_string(),
        ));
    }
    Ok(())
}

/// Amend HEAD with the rewritten `path`. Returns whether a commit was made.
pub async fn amend(path: &Path, env: &CommandEnv) -> Result<bool, RunError> {
    let diff = git(&["diff", "--quiet"], path, env).await?;
    if diff.success() {
        info!("{} unchanged, nothing to amend", path.display());
        return Ok(false);
    }

    let commit = git(&["commit", "--amend", "--no-edit"], path, env).await?;
    if !commit.success() {
        return Err(RunError::Amend(commit.combined().trim_end().to_string()));
    }
    info!("amended HEAD with {}", path.display());
    Ok(true)
}
