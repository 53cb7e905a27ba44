use crate::error::{Result, SnapError};
use regex::Regex;
use std::path::Path;
use std::process::{Command, Output};
use std::sync::OnceLock;

/// Field separator for machine-readable `git log` / `for-each-ref` output.
const SEP: char = '\x1f';

/// The empty tree object, used as the lower bound of a range with no start.
const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// Run git and return stdout, or the failure text as a `GitError`.
fn git(args: &[&str]) -> Result<String> {
    let output = run(args)?;
    if !output.status.success() {
        return Err(SnapError::GitError(failure_text(&output)));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Run git and return stdout and stderr together. Rebase, pull and push
/// report progress and conflicts on both streams.
fn git_combined(args: &[&str]) -> Result<String> {
    let output = run(args)?;
    let mut text = String::from_utf8_lossy(&output.stdout).to_string();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    if !output.status.success() {
        return Err(SnapError::GitError(text.trim().to_string()));
    }
    Ok(text.trim().to_string())
}

fn git_succeeds(args: &[&str]) -> bool {
    run(args).map(|o| o.status.success()).unwrap_or(false)
}

fn run(args: &[&str]) -> Result<Output> {
    let output = Command::new("git").args(args).output()?;
    tracing::debug!(?args, status = ?output.status.code(), "git");
    Ok(output)
}

fn failure_text(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.is_empty() {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    } else {
        stderr
    }
}

// ============================================================================
// Repository
// ============================================================================

/// Check if current directory is a git repository
pub fn is_git_repo() -> bool {
    git_succeeds(&["rev-parse", "--git-dir"])
}

/// Fail with `NotARepository` outside a repository.
pub fn require_repo() -> Result<()> {
    if is_git_repo() {
        Ok(())
    } else {
        Err(SnapError::NotARepository)
    }
}

/// Initialize a repository in the current directory.
pub fn init_repo() -> Result<()> {
    if is_git_repo() {
        return Err(SnapError::AlreadyARepository);
    }
    git(&["init"])?;
    Ok(())
}

/// Get the current branch name
pub fn current_branch() -> Result<String> {
    Ok(git(&["rev-parse", "--abbrev-ref", "HEAD"])?.trim().to_string())
}

/// The configured `user.name`, empty when unset.
pub fn user_name() -> Result<String> {
    match git(&["config", "user.name"]) {
        Ok(name) => Ok(name.trim().to_string()),
        Err(_) => Ok(String::new()),
    }
}

// ============================================================================
// Working tree and commits
// ============================================================================

/// Staged diff, or the unstaged diff when nothing is staged.
pub fn diff() -> Result<String> {
    let staged = git(&["diff", "--cached"])?;
    if !staged.trim().is_empty() {
        return Ok(staged);
    }
    git(&["diff"])
}

/// Stage every change, including untracked files.
pub fn stage_all() -> Result<()> {
    git(&["add", "-A"])?;
    Ok(())
}

pub fn commit(message: &str) -> Result<()> {
    git(&["commit", "-m", message])?;
    Ok(())
}

/// `git status --short` output.
pub fn status_short() -> Result<String> {
    git(&["status", "--short"])
}

/// Check if working directory has uncommitted changes
pub fn has_uncommitted_changes() -> Result<bool> {
    Ok(!git(&["status", "--porcelain"])?.trim().is_empty())
}

/// One commit as shown by the history, replay and tag views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub hash: String,
    pub short_hash: String,
    pub author: String,
    /// Relative commit date, e.g. "3 days ago".
    pub date: String,
    pub message: String,
}

const LOG_FORMAT: &str = "--format=%H%x1f%h%x1f%an%x1f%cr%x1f%s";

fn parse_log(output: &str) -> Vec<CommitInfo> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split(SEP);
            Some(CommitInfo {
                hash: fields.next()?.to_string(),
                short_hash: fields.next()?.to_string(),
                author: fields.next()?.to_string(),
                date: fields.next()?.to_string(),
                message: fields.next()?.to_string(),
            })
        })
        .collect()
}

/// Parameters of a history query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HistoryQuery {
    pub limit: usize,
    pub all_branches: bool,
    /// Only commits whose author matches this name.
    pub author: Option<String>,
    pub path: Option<String>,
}

/// Commit history, newest first.
pub fn commit_history(query: &HistoryQuery) -> Result<Vec<CommitInfo>> {
    let limit = format!("-n{}", query.limit);
    let author = query.author.as_ref().map(|a| format!("--author={}", a));
    let mut args = vec!["log", LOG_FORMAT, limit.as_str()];
    if query.all_branches {
        args.push("--all");
    }
    if let Some(author) = &author {
        args.push(author);
    }
    if let Some(path) = &query.path {
        args.push("--");
        args.push(path);
    }
    Ok(parse_log(&git(&args)?))
}

pub fn checkout_commit(hash: &str) -> Result<()> {
    git(&["checkout", "--quiet", hash])?;
    Ok(())
}

// ============================================================================
// Branches
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchInfo {
    pub name: String,
    pub is_current: bool,
    /// Tracked upstream, empty when none.
    pub upstream: String,
    /// Subject of the branch tip.
    pub last_commit: String,
}

/// Local branches in git's order.
pub fn branches() -> Result<Vec<BranchInfo>> {
    let output = git(&[
        "branch",
        "--format=%(HEAD)%1f%(refname:short)%1f%(upstream:short)%1f%(contents:subject)",
    ])?;
    Ok(output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split(SEP);
            let head = fields.next()?;
            Some(BranchInfo {
                name: fields.next()?.to_string(),
                is_current: head == "*",
                upstream: fields.next().unwrap_or("").to_string(),
                last_commit: fields.next().unwrap_or("").to_string(),
            })
        })
        .collect())
}

pub fn create_and_switch_branch(branch: &str) -> Result<()> {
    git(&["checkout", "-b", branch])?;
    Ok(())
}

pub fn switch_branch(branch: &str) -> Result<()> {
    git(&["checkout", branch])?;
    Ok(())
}

/// Delete a local branch. Git refuses to delete the checked-out branch.
pub fn delete_branch(branch: &str) -> Result<()> {
    git(&["branch", "-D", branch])?;
    Ok(())
}

// ============================================================================
// Replay (rebase)
// ============================================================================

/// Whether a rebase is stopped mid-way in this repository.
pub fn rebase_in_progress() -> Result<bool> {
    for marker in ["rebase-merge", "rebase-apply"] {
        let path = git(&["rev-parse", "--git-path", marker])?;
        if Path::new(path.trim()).exists() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Commits on HEAD that are not on `onto`, newest first.
pub fn replay_commits(onto: &str) -> Result<Vec<CommitInfo>> {
    let range = format!("{}..HEAD", onto);
    Ok(parse_log(&git(&["log", LOG_FORMAT, &range])?))
}

/// Rebase the current branch onto `onto`, returning git's combined output.
///
/// A stopped rebase is an error whose text carries git's conflict report.
pub fn rebase_onto(onto: &str) -> Result<String> {
    git_combined(&["rebase", onto])
}

// ============================================================================
// Tags
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagInfo {
    pub name: String,
    /// Short id of the tagged commit.
    pub short_hash: String,
    pub message: String,
    pub date: String,
}

/// All tags, newest first.
pub fn tags() -> Result<Vec<TagInfo>> {
    let output = git(&[
        "for-each-ref",
        "--sort=-creatordate",
        "--format=%(refname:short)%1f%(objectname:short)%1f%(*objectname:short)%1f%(contents:subject)%1f%(creatordate:relative)",
        "refs/tags",
    ])?;
    Ok(output
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(SEP).collect();
            if fields.len() < 5 {
                return None;
            }
            // Annotated tags point at a tag object; show the commit instead.
            let short_hash = if fields[2].is_empty() {
                fields[1]
            } else {
                fields[2]
            };
            Some(TagInfo {
                name: fields[0].to_string(),
                short_hash: short_hash.to_string(),
                message: fields[3].to_string(),
                date: fields[4].to_string(),
            })
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDetail {
    pub name: String,
    pub subject: String,
    pub short_hash: String,
    pub tagger_name: String,
    pub relative_time: String,
}

pub fn tag_detail(name: &str) -> Result<TagDetail> {
    let refname = format!("refs/tags/{}", name);
    let output = git(&[
        "for-each-ref",
        "--format=%(refname:short)%1f%(contents:subject)%1f%(objectname:short)%1f%(*objectname:short)%1f%(taggername)%1f%(creatordate:relative)",
        &refname,
    ])?;
    let line = output
        .lines()
        .next()
        .ok_or_else(|| SnapError::GitError(format!("tag '{}' not found", name)))?;
    let fields: Vec<&str> = line.split(SEP).collect();
    if fields.len() < 6 {
        return Err(SnapError::GitError(format!("unexpected tag format: {}", line)));
    }
    let short_hash = if fields[3].is_empty() {
        fields[2]
    } else {
        fields[3]
    };
    Ok(TagDetail {
        name: fields[0].to_string(),
        subject: fields[1].to_string(),
        short_hash: short_hash.to_string(),
        tagger_name: fields[4].to_string(),
        relative_time: fields[5].to_string(),
    })
}

/// The most recent tag reachable from HEAD, if any.
pub fn latest_tag() -> Result<Option<String>> {
    match git(&["describe", "--tags", "--abbrev=0"]) {
        Ok(tag) => Ok(Some(tag.trim().to_string())),
        Err(_) => Ok(None),
    }
}

/// The tag before `tag`, empty for the first tag.
pub fn previous_tag(tag: &str) -> Result<String> {
    let parent = format!("{}^", tag);
    match git(&["describe", "--tags", "--abbrev=0", &parent]) {
        Ok(prev) => Ok(prev.trim().to_string()),
        Err(_) => Ok(String::new()),
    }
}

pub fn tag_exists(tag: &str) -> bool {
    git_succeeds(&["rev-parse", "-q", "--verify", &format!("refs/tags/{}", tag)])
}

/// Commits in `from..to`, newest first. An empty `from` means everything up to `to`.
pub fn commits_between(from: &str, to: &str) -> Result<Vec<CommitInfo>> {
    let range = if from.is_empty() {
        to.to_string()
    } else {
        format!("{}..{}", from, to)
    };
    Ok(parse_log(&git(&["log", LOG_FORMAT, &range])?))
}

/// Line and file counts of a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiffStats {
    pub files: usize,
    pub additions: usize,
    pub deletions: usize,
}

impl DiffStats {
    /// Parse a `--shortstat` summary line; missing parts count as zero.
    pub fn parse(shortstat: &str) -> Self {
        static RE: OnceLock<Option<Regex>> = OnceLock::new();
        let re = RE.get_or_init(|| {
            Regex::new(r"(\d+) files? changed(?:, (\d+) insertions?\(\+\))?(?:, (\d+) deletions?\(-\))?")
                .ok()
        });
        let Some(caps) = re.as_ref().and_then(|re| re.captures(shortstat)) else {
            return Self::default();
        };
        let num = |i: usize| -> usize {
            caps.get(i)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0)
        };
        Self {
            files: num(1),
            additions: num(2),
            deletions: num(3),
        }
    }
}

/// Diff statistics between two refs. An empty `from` diffs against the empty tree.
pub fn range_diff_stats(from: &str, to: &str) -> Result<DiffStats> {
    let from = if from.is_empty() { EMPTY_TREE } else { from };
    Ok(DiffStats::parse(&git(&["diff", "--shortstat", from, to])?))
}

/// Diff statistics of a single commit.
pub fn commit_stats(hash: &str) -> Result<DiffStats> {
    Ok(DiffStats::parse(&git(&["show", "--shortstat", "--format=", hash])?))
}

pub fn create_annotated_tag(tag: &str, message: &str) -> Result<()> {
    git(&["tag", "-a", tag, "-m", message])?;
    Ok(())
}

pub fn push_tag(tag: &str) -> Result<String> {
    git_combined(&["push", "origin", tag])
}

pub fn delete_tag(tag: &str) -> Result<()> {
    git(&["tag", "-d", tag])?;
    Ok(())
}

// ============================================================================
// Remotes
// ============================================================================

/// Whether any remote is configured.
pub fn has_remote() -> Result<bool> {
    Ok(!git(&["remote"])?.trim().is_empty())
}

pub fn remote_url() -> Result<Option<String>> {
    match git(&["remote", "get-url", "origin"]) {
        Ok(url) => Ok(Some(url.trim().to_string())),
        Err(_) => Ok(None),
    }
}

/// Whether the current branch tracks an upstream branch.
pub fn has_upstream() -> bool {
    git_succeeds(&["rev-parse", "--abbrev-ref", "--symbolic-full-name", "@{upstream}"])
}

pub fn pull() -> Result<String> {
    git_combined(&["pull"])
}

/// Push the current branch, creating the upstream when it has none.
pub fn push(branch: &str, set_upstream: bool) -> Result<String> {
    if set_upstream {
        git_combined(&["push", "-u", "origin", branch])
    } else {
        git_combined(&["push"])
    }
}

/// Convert a remote URL to its https web address. Unknown schemes give "".
pub fn remote_to_https(remote: &str) -> String {
    let remote = remote.trim();
    let url = if let Some(rest) = remote.strip_prefix("git@") {
        match rest.split_once(':') {
            Some((host, path)) => format!("https://{}/{}", host, path),
            None => return String::new(),
        }
    } else if let Some(rest) = remote.strip_prefix("ssh://git@") {
        format!("https://{}", rest)
    } else if remote.starts_with("https://") || remote.starts_with("http://") {
        remote.to_string()
    } else {
        return String::new();
    };
    url.strip_suffix(".git").unwrap_or(&url).to_string()
}

/// Web page of `tag` on the hosting service behind `remote`.
pub fn tag_url_for_remote(remote: &str, tag: &str) -> Option<String> {
    let base = remote_to_https(remote);
    if base.is_empty() {
        return None;
    }
    if base.contains("github.com") {
        Some(format!("{}/releases/tag/{}", base, tag))
    } else if base.contains("gitlab") {
        Some(format!("{}/-/tags/{}", base, tag))
    } else if base.contains("bitbucket.org") {
        Some(format!("{}/src/{}", base, tag))
    } else {
        None
    }
}

/// Web page of `tag` for the `origin` remote, if it is a known host.
pub fn tag_url(tag: &str) -> Result<Option<String>> {
    Ok(remote_url()?.and_then(|remote| tag_url_for_remote(&remote, tag)))
}
