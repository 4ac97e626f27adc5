use anyhow::Context;
use std::collections::BTreeSet;
use std::path::Path;

use crate::core::repo::redact_url;
use crate::utils::cmd::{exec_cmd, exec_cmd_with_progress};
use crate::utils::error::PdlResult;

/// Version control operations the engine needs.
///
/// Every call blocks until the underlying process exits.
pub trait Vcs: Send + Sync {
    /// clone `url` into `dest`, reporting each progress line
    fn clone_repo(&self, url: &str, dest: &Path, on_line: &mut dyn FnMut(&str)) -> PdlResult;

    fn fetch_all(&self, path: &Path) -> PdlResult;

    /// checkout an existing local branch
    fn checkout(&self, path: &Path, branch: &str) -> PdlResult;

    /// create a local branch tracking `origin/<branch>`
    fn checkout_tracking(&self, path: &Path, branch: &str) -> PdlResult;

    fn current_branch(&self, path: &Path) -> PdlResult<String>;

    fn is_dirty(&self, path: &Path) -> PdlResult<bool>;

    /// drop every local modification and untracked file
    fn discard_changes(&self, path: &Path) -> PdlResult;

    /// local and remote-tracking branches, `origin/` stripped, sorted
    fn list_branches(&self, path: &Path) -> PdlResult<Vec<String>>;

    /// branch heads advertised by `url`
    fn remote_heads(&self, url: &str) -> PdlResult<Vec<String>>;
}

/// [`Vcs`] backed by the `git` executable on PATH.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCli;

impl Vcs for GitCli {
    fn clone_repo(&self, url: &str, dest: &Path, on_line: &mut dyn FnMut(&str)) -> PdlResult {
        clone(url, dest, on_line)
    }

    fn fetch_all(&self, path: &Path) -> PdlResult {
        fetch_all(path)
    }

    fn checkout(&self, path: &Path, branch: &str) -> PdlResult {
        checkout(path, &["checkout", branch])
    }

    fn checkout_tracking(&self, path: &Path, branch: &str) -> PdlResult {
        let remote_branch = format!("origin/{}", branch);
        checkout(path, &["checkout", "-b", branch, &remote_branch])
    }

    fn current_branch(&self, path: &Path) -> PdlResult<String> {
        get_current_branch(path)
    }

    fn is_dirty(&self, path: &Path) -> PdlResult<bool> {
        Ok(!get_status_porcelain(path)?.trim().is_empty())
    }

    fn discard_changes(&self, path: &Path) -> PdlResult {
        reset_hard(path)?;
        clean(path)
    }

    fn list_branches(&self, path: &Path) -> PdlResult<Vec<String>> {
        get_all_branches(path)
    }

    fn remote_heads(&self, url: &str) -> PdlResult<Vec<String>> {
        ls_remote_heads(url)
    }
}

pub fn is_repository(path: impl AsRef<Path>) -> PdlResult {
    if path.as_ref().join(".git").is_dir() {
        let args = ["rev-parse", "--show-cdup"];
        if let Ok(output) = exec_cmd(path, "git", &args) {
            if output.trim().is_empty() {
                return Ok(());
            }
        }
    }

    Err(anyhow::anyhow!("repository not found!"))
}

pub fn clone(url: &str, dest: &Path, on_line: &mut dyn FnMut(&str)) -> PdlResult {
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)
        .with_context(|| format!("create directory {} failed", parent.display()))?;

    let Some(name) = dest.file_name().map(|n| n.to_string_lossy()) else {
        anyhow::bail!("invalid clone destination {}", dest.display());
    };
    let args = ["clone", "--progress", url, &name];
    let display = format!("git clone --progress {} {}", redact_url(url), name);
    exec_cmd_with_progress(parent, "git", &args, &display, on_line)
}

pub fn fetch_all(path: impl AsRef<Path>) -> PdlResult {
    let args = ["fetch", "--all"];
    exec_cmd(path, "git", &args)
        .map(|_| ())
        .context("git fetch --all failed")
}

pub fn checkout(path: impl AsRef<Path>, args: &[&str]) -> PdlResult {
    exec_cmd(path, "git", args).map(|_| ())
}

pub fn get_current_branch(path: impl AsRef<Path>) -> PdlResult<String> {
    is_repository(&path)?;
    let args = ["branch", "--show-current"];
    let output = exec_cmd(&path, "git", &args)?;

    match output.trim().lines().next() {
        Some(branch) if !branch.trim().is_empty() => Ok(branch.trim().to_string()),
        _ => Err(anyhow::anyhow!("current branch not found.")),
    }
}

pub fn get_status_porcelain(path: impl AsRef<Path>) -> PdlResult<String> {
    let args = ["status", "--porcelain"];
    exec_cmd(path, "git", &args)
}

pub fn reset_hard(path: impl AsRef<Path>) -> PdlResult {
    let args = ["reset", "--hard", "HEAD"];
    exec_cmd(path, "git", &args)
        .map(|_| ())
        .context("git reset --hard HEAD failed")
}

pub fn clean(path: impl AsRef<Path>) -> PdlResult {
    let args = ["clean", "-fd"];
    exec_cmd(path, "git", &args)
        .map(|_| ())
        .context("git clean -fd failed")
}

pub fn get_all_branches(path: impl AsRef<Path>) -> PdlResult<Vec<String>> {
    let args = ["branch", "-a"];
    let output = exec_cmd(path, "git", &args)?;
    Ok(parse_branch_list(&output))
}

pub fn ls_remote_heads(url: &str) -> PdlResult<Vec<String>> {
    // abort stalled transfers instead of hanging the worker
    let args = [
        "-c",
        "http.lowSpeedLimit=1",
        "-c",
        "http.lowSpeedTime=30",
        "ls-remote",
        "--heads",
        url,
    ];
    let output = exec_cmd(std::env::temp_dir(), "git", &args)
        .with_context(|| format!("git ls-remote --heads {} failed", redact_url(url)))?;
    Ok(parse_remote_heads(&output))
}

/// Parse `git branch -a` output into plain branch names.
pub(crate) fn parse_branch_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(|line| line.trim_start_matches(&['*', '+'][..]).trim())
        .filter(|line| !line.is_empty() && !line.contains("->") && !line.starts_with('('))
        .map(|line| {
            line.trim_start_matches("remotes/origin/")
                .trim_start_matches("origin/")
                .to_string()
        })
        .filter(|branch| branch != "HEAD")
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Parse `git ls-remote --heads` output (`<oid>\trefs/heads/<name>`).
pub(crate) fn parse_remote_heads(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split_once('\t'))
        .filter_map(|(_, reference)| reference.trim().strip_prefix("refs/heads/"))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_list_strips_remotes_and_head() {
        let output = "* develop\n  master\n  remotes/origin/HEAD -> origin/master\n  remotes/origin/master\n  remotes/origin/release/1.0\n";
        assert_eq!(
            parse_branch_list(output),
            vec!["develop", "master", "release/1.0"]
        );
    }

    #[test]
    fn branch_list_skips_detached_head() {
        let output = "* (HEAD detached at 1a2b3c4)\n  master\n";
        assert_eq!(parse_branch_list(output), vec!["master"]);
    }

    #[test]
    fn remote_heads_parsed_and_sorted() {
        let output = "1111\trefs/heads/master\n2222\trefs/heads/develop/eagle\n3333\trefs/tags/1.0\n";
        assert_eq!(parse_remote_heads(output), vec!["develop/eagle", "master"]);
    }
}
