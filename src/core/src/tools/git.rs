use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio::time::{timeout, Duration};

const LOG_FORMAT: &str = "--format=%H%x1f%aI%x1f%s%x1f%an%x1e";
const SHORT_HASH_LEN: usize = 7;

/// One entry of `get_recent_commits`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub hash: String,
    pub date: String,
    pub message: String,
    pub author_name: String,
}

/// Result of `get_status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingTreeStatus {
    pub branch: Option<String>,
    pub modified: Vec<String>,
    pub created: Vec<String>,
    pub deleted: Vec<String>,
    pub renamed: Vec<String>,
    pub staged: Vec<String>,
    pub conflicted: Vec<String>,
    /// Untracked paths.
    pub not_added: Vec<String>,
    pub is_clean: bool,
}

/// A local repository inspected through the `git` CLI.
#[derive(Debug, Clone)]
pub struct GitRepo {
    path: PathBuf,
    command_timeout: Duration,
}

impl GitRepo {
    pub fn new(path: impl Into<PathBuf>, command_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            command_timeout,
        }
    }

    /// Use `configured` when it exists on disk, otherwise the working
    /// directory of the process.
    pub fn discover(configured: Option<&Path>, command_timeout: Duration) -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let path = match configured {
            Some(path) if path.exists() => path.to_path_buf(),
            Some(path) => {
                tracing::warn!(
                    configured = %path.display(),
                    fallback = %cwd.display(),
                    "repository path not found; using working directory"
                );
                cwd
            }
            None => cwd,
        };
        Self::new(path, command_timeout)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn recent_commits(&self, limit: usize) -> Result<Vec<CommitSummary>, String> {
        let max_count = format!("--max-count={limit}");
        let out = self.run(&["log", &max_count, LOG_FORMAT]).await?;
        Ok(parse_log(&out))
    }

    pub async fn status(&self) -> Result<WorkingTreeStatus, String> {
        let out = self
            .run(&["-c", "core.quotepath=false", "status", "--porcelain=v1", "--branch"])
            .await?;
        Ok(parse_status(&out))
    }

    /// Contents of `path` as committed at `HEAD`.
    ///
    /// Callers must reject traversal paths first, see [`is_traversal`].
    pub async fn file_at_head(&self, path: &str) -> Result<String, String> {
        let spec = format!("HEAD:{path}");
        self.run(&["show", &spec]).await
    }

    async fn run(&self, args: &[&str]) -> Result<String, String> {
        tracing::debug!(repo = %self.path.display(), ?args, "running git");
        let mut cmd = Command::new("git");
        cmd.arg("-C")
            .arg(&self.path)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = timeout(self.command_timeout, cmd.output())
            .await
            .map_err(|_| format!("git timed out after {}s", self.command_timeout.as_secs()))?
            .map_err(|e| format!("failed to run git: {e}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(if stderr.is_empty() {
                format!("git exited with {}", output.status)
            } else {
                stderr
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Paths may not climb out of the repository.
pub fn is_traversal(path: &str) -> bool {
    path.contains("..")
}

/// Parse `git log` output produced with [`LOG_FORMAT`].
pub fn parse_log(out: &str) -> Vec<CommitSummary> {
    out.split('\x1e')
        .map(|record| record.trim_start_matches(['\n', '\r']))
        .filter(|record| !record.is_empty())
        .filter_map(|record| {
            let mut fields = record.split('\x1f');
            let hash = fields.next()?;
            let date = fields.next()?;
            let message = fields.next()?;
            let author_name = fields.next()?;
            Some(CommitSummary {
                hash: hash.chars().take(SHORT_HASH_LEN).collect(),
                date: date.to_string(),
                message: message.to_string(),
                author_name: author_name.trim_end().to_string(),
            })
        })
        .collect()
}

/// Parse `git status --porcelain=v1 --branch`.
pub fn parse_status(out: &str) -> WorkingTreeStatus {
    let mut status = WorkingTreeStatus::default();
    let mut entries = 0usize;

    for line in out.lines() {
        if let Some(header) = line.strip_prefix("## ") {
            status.branch = parse_branch(header);
            continue;
        }
        let bytes = line.as_bytes();
        if bytes.len() < 4 {
            continue;
        }
        let (x, y) = (bytes[0] as char, bytes[1] as char);
        let Some(raw_path) = line.get(3..) else {
            continue;
        };
        entries += 1;

        let path = match raw_path.split_once(" -> ") {
            Some((_, to)) if x == 'R' || y == 'R' => unquote(to),
            _ => unquote(raw_path),
        };

        if is_conflict(x, y) {
            status.conflicted.push(path);
            continue;
        }
        if x == '?' && y == '?' {
            status.not_added.push(path);
            continue;
        }
        if x == 'M' || y == 'M' {
            status.modified.push(path.clone());
        }
        if x == 'A' {
            status.created.push(path.clone());
        }
        if x == 'D' || y == 'D' {
            status.deleted.push(path.clone());
        }
        if x == 'R' {
            status.renamed.push(path.clone());
        }
        if x != ' ' && x != '?' {
            status.staged.push(path);
        }
    }

    status.is_clean = entries == 0;
    status
}

fn parse_branch(header: &str) -> Option<String> {
    if let Some(rest) = header
        .strip_prefix("No commits yet on ")
        .or_else(|| header.strip_prefix("Initial commit on "))
    {
        return Some(rest.trim().to_string());
    }
    if header.starts_with("HEAD (no branch)") {
        return Some("HEAD".to_string());
    }
    let end = header
        .find("...")
        .or_else(|| header.find(' '))
        .unwrap_or(header.len());
    let branch = header[..end].trim();
    (!branch.is_empty()).then(|| branch.to_string())
}

fn is_conflict(x: char, y: char) -> bool {
    matches!(
        (x, y),
        ('D', 'D') | ('A', 'U') | ('U', 'D') | ('U', 'A') | ('D', 'U') | ('A', 'A') | ('U', 'U')
    )
}

fn unquote(path: &str) -> String {
    let trimmed = path.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(trimmed)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_log_records() {
        let out = "0123456789abcdef\x1f2026-10-01T12:00:00+02:00\x1fFix parser\x1fAda\x1e\n\
                   fedcba9876543210\x1f2026-09-30T08:30:00+00:00\x1fInitial commit\x1fGrace Hopper\x1e\n";
        let commits = parse_log(out);
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].hash, "0123456");
        assert_eq!(commits[0].date, "2026-10-01T12:00:00+02:00");
        assert_eq!(commits[0].message, "Fix parser");
        assert_eq!(commits[1].author_name, "Grace Hopper");
    }

    #[test]
    fn empty_or_garbled_log_yields_nothing() {
        assert!(parse_log("").is_empty());
        assert!(parse_log("\n").is_empty());
        assert!(parse_log("only-one-field\x1e").is_empty());
    }

    #[test]
    fn parses_status_entries() {
        let out = [
            "## main...origin/main [ahead 1]",
            " M src/lib.rs",
            "M  Cargo.toml",
            "A  src/new.rs",
            " D gone.rs",
            "R  old.rs -> renamed.rs",
            "UU both.rs",
            "?? scratch.txt",
        ]
        .join("\n");
        let status = parse_status(&out);
        assert_eq!(status.branch.as_deref(), Some("main"));
        assert_eq!(status.modified, ["src/lib.rs", "Cargo.toml"]);
        assert_eq!(status.created, ["src/new.rs"]);
        assert_eq!(status.deleted, ["gone.rs"]);
        assert_eq!(status.renamed, ["renamed.rs"]);
        assert_eq!(status.conflicted, ["both.rs"]);
        assert_eq!(status.not_added, ["scratch.txt"]);
        assert_eq!(status.staged, ["Cargo.toml", "src/new.rs", "renamed.rs"]);
        assert!(!status.is_clean);
    }

    #[test]
    fn clean_status_and_branch_headers() {
        let status = parse_status("## feature\n");
        assert_eq!(status.branch.as_deref(), Some("feature"));
        assert!(status.is_clean);

        assert_eq!(
            parse_status("## No commits yet on trunk\n").branch.as_deref(),
            Some("trunk")
        );
        assert_eq!(
            parse_status("## HEAD (no branch)\n").branch.as_deref(),
            Some("HEAD")
        );
        assert!(parse_status("").branch.is_none());
    }

    #[test]
    fn quoted_paths_are_unquoted() {
        let status = parse_status("?? \"with space.txt\"\n");
        assert_eq!(status.not_added, ["with space.txt"]);
    }

    #[test]
    fn traversal_detection() {
        assert!(is_traversal("../secret"));
        assert!(is_traversal("src/../../etc/passwd"));
        assert!(!is_traversal("src/lib.rs"));
        assert!(!is_traversal(".github/workflows/ci.yml"));
    }

    #[test]
    fn discover_falls_back_to_cwd() {
        let repo = GitRepo::discover(
            Some(Path::new("/definitely/not/a/real/repo/path")),
            Duration::from_secs(5),
        );
        assert_eq!(repo.path(), std::env::current_dir().unwrap().as_path());
    }
}
