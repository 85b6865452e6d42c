use async_trait::async_trait;
use polybench_common::error::{BuildError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, warn};
use uuid::Uuid;

/// Repository Source - Abstraction over repository acquisition
///
/// Any implementation must guarantee:
/// 1. Each clone lands in a fresh directory no other run shares
/// 2. A failed clone leaves no partial directory behind
/// 3. `checkout_commit` pins the exact commit or fails loudly - commits
///    are never silently substituted
///
/// Nothing here retries. A flaky remote fails the run and the caller's
/// driver decides whether to run the instance again.
#[async_trait]
pub trait RepoSource {
    /// Clone a repository into a fresh workspace under `base`
    async fn clone_repo(&self, repo: &str, base: &Path) -> Result<Workspace>;

    /// Check out an exact commit inside a cloned workspace
    async fn checkout_commit(&self, workspace: &Workspace, commit: &str) -> Result<()>;
}

/// A run-scoped clone directory
///
/// Releasing is idempotent and the `Drop` impl is a backstop, so every
/// workspace is removed exactly once on every path out of a run - success,
/// build failure, or propagated error
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    released: bool,
}

impl Workspace {
    pub fn new(root: PathBuf) -> Self {
        Workspace {
            root,
            released: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Remove the clone directory
    /// Safe to call repeatedly; a directory already gone is success
    pub fn release(&mut self) -> std::io::Result<()> {
        if self.released {
            return Ok(());
        }
        if self.root.exists() {
            fs::remove_dir_all(&self.root)?;
        }
        self.released = true;
        Ok(())
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!(path = %self.root.display(), error = %e, "failed to release workspace");
        }
    }
}

/// Git-backed repository source, shelling out to the `git` binary
pub struct GitSource;

impl GitSource {
    pub fn new() -> Self {
        GitSource
    }
}

impl Default for GitSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RepoSource for GitSource {
    async fn clone_repo(&self, repo: &str, base: &Path) -> Result<Workspace> {
        fs::create_dir_all(base).map_err(|e| BuildError::Workspace {
            path: base.to_path_buf(),
            source: e,
        })?;

        let target = base.join(format!("{}-{}", short_name(repo), Uuid::new_v4()));
        let url = clone_url(repo);
        debug!(url = %url, target = %target.display(), "cloning repository");

        if let Err(reason) = run_git(&["clone", &url, &target.to_string_lossy()], None).await {
            // Clean up upon unsuccessful clone
            if target.exists() {
                let _ = fs::remove_dir_all(&target);
            }
            return Err(BuildError::CloneFailed {
                repo: repo.to_string(),
                reason,
            });
        }

        Ok(Workspace::new(target))
    }

    async fn checkout_commit(&self, workspace: &Workspace, commit: &str) -> Result<()> {
        run_git(&["checkout", commit], Some(workspace.path()))
            .await
            .map_err(|reason| BuildError::CheckoutFailed {
                commit: commit.to_string(),
                reason,
            })
    }
}

/// Resolve a repository identifier to something `git clone` accepts
/// Plain `org/name` identifiers are GitHub shorthand; anything carrying a
/// scheme or an absolute path is used verbatim
fn clone_url(repo: &str) -> String {
    if repo.contains("://") || repo.starts_with('/') {
        repo.to_string()
    } else {
        format!("https://github.com/{repo}.git")
    }
}

/// Last path segment of a repository identifier, for readable directory names
fn short_name(repo: &str) -> &str {
    repo.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(repo)
        .trim_end_matches(".git")
}

/// Run one git command, mapping a non-zero exit to its stderr text
async fn run_git(args: &[&str], cwd: Option<&Path>) -> std::result::Result<(), String> {
    let mut command = Command::new("git");
    command.args(args);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let output = command
        .output()
        .await
        .map_err(|e| format!("failed to run git: {e}"))?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = stderr.trim();
        if reason.is_empty() {
            Err(format!("git exited with {}", output.status))
        } else {
            Err(reason.to_string())
        }
    }
}
