//! Source Control Queries
//!
//! The generator only needs three answers from source control: where the
//! working tree starts, which commit is checked out, and which commit each
//! core submodule is checked out at. `SourceControl` is that seam; `Git`
//! answers it by running the `git` binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use thiserror::Error;
use tracing::{debug, warn};

/// Characters of a submodule commit kept in the version word.
pub const SUBMODULE_ABBREV: usize = 7;

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("Failed to run git: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Not inside a git working tree ({0})")]
    NotAWorkingTree(String),

    #[error("Unexpected git output: {0}")]
    InvalidOutput(String),
}

pub trait SourceControl {
    /// Top-level directory of the enclosing working tree.
    fn toplevel(&self) -> Result<PathBuf, VcsError>;

    /// Abbreviated hash of the checked-out commit, `None` on an unborn branch.
    fn head_hash(&self, toplevel: &Path) -> Result<Option<String>, VcsError>;

    /// Abbreviated hash of the commit checked out for the submodule at
    /// `path` (relative to `toplevel`), `None` when it cannot be resolved.
    fn dependency_hash(&self, toplevel: &Path, path: &Path) -> Result<Option<String>, VcsError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmoduleState {
    Current,
    Uninitialized,
    Modified,
    Conflict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmoduleStatus {
    pub state: SubmoduleState,
    pub commit: String,
    pub path: String,
}

impl SubmoduleStatus {
    pub fn abbrev(&self) -> &str {
        &self.commit[..self.commit.len().min(SUBMODULE_ABBREV)]
    }
}

/// Parse the first line of `git submodule status` output:
/// `<state><sha1> <path>[ (<describe>)]`
pub fn parse_submodule_status(output: &str) -> Option<SubmoduleStatus> {
    let line = output.lines().next()?;
    let mut chars = line.chars();
    let state = match chars.next()? {
        ' ' => SubmoduleState::Current,
        '-' => SubmoduleState::Uninitialized,
        '+' => SubmoduleState::Modified,
        'U' => SubmoduleState::Conflict,
        _ => return None,
    };
    let mut parts = chars.as_str().split_whitespace();
    let commit = parts.next()?;
    let path = parts.next()?;
    if commit.len() < SUBMODULE_ABBREV || !commit.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(SubmoduleStatus {
        state,
        commit: commit.to_string(),
        path: path.to_string(),
    })
}

/// `git` command-line adapter
#[derive(Debug, Clone)]
pub struct Git {
    start_dir: PathBuf,
}

impl Git {
    /// Resolve the working tree from `start_dir`.
    pub fn new(start_dir: impl Into<PathBuf>) -> Self {
        Self { start_dir: start_dir.into() }
    }

    pub fn is_available() -> bool {
        Command::new("git")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn run_git(&self, dir: &Path, args: &[&str]) -> Result<Output, VcsError> {
        debug!(dir = %dir.display(), ?args, "running git");
        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;
        Ok(output)
    }
}

impl SourceControl for Git {
    fn toplevel(&self) -> Result<PathBuf, VcsError> {
        let output = self.run_git(&self.start_dir, &["rev-parse", "--show-toplevel"])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(VcsError::NotAWorkingTree(stderr));
        }
        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| VcsError::InvalidOutput(e.to_string()))?;
        let toplevel = stdout.trim_end_matches(&['\n', '\r'][..]);
        if toplevel.is_empty() {
            return Err(VcsError::InvalidOutput("empty toplevel".to_string()));
        }
        Ok(PathBuf::from(toplevel))
    }

    fn head_hash(&self, toplevel: &Path) -> Result<Option<String>, VcsError> {
        let output = self.run_git(toplevel, &["log", "--pretty=format:%h", "-n", "1"])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!(stderr = %stderr.trim(), "no commit checked out");
            return Ok(None);
        }
        let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!hash.is_empty()).then_some(hash))
    }

    fn dependency_hash(&self, toplevel: &Path, path: &Path) -> Result<Option<String>, VcsError> {
        let path_arg = path.to_string_lossy();
        let output = self.run_git(toplevel, &["submodule", "status", "--", &path_arg])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!(path = %path_arg, stderr = %stderr.trim(), "submodule status failed");
            return Ok(None);
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let Some(status) = parse_submodule_status(&stdout) else {
            debug!(path = %path_arg, output = %stdout.trim(), "unparsable submodule status");
            return Ok(None);
        };
        match status.state {
            SubmoduleState::Current => {}
            SubmoduleState::Uninitialized => {
                warn!(path = %status.path, "submodule not initialized, using recorded commit")
            }
            SubmoduleState::Modified => {
                warn!(path = %status.path, "submodule checkout differs from recorded commit")
            }
            SubmoduleState::Conflict => warn!(path = %status.path, "submodule has merge conflicts"),
        }
        Ok(Some(status.abbrev().to_string()))
    }
}
