//! Test utilities shared across modules.
//!
//! Every git wrapper works on the current working directory, so tests that
//! touch a repository run inside a throwaway one and hold [`CWD_MUTEX`] for
//! as long as they are chdir'ed into it.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Mutex, MutexGuard};
use tempfile::TempDir;

/// Mutex to serialize tests that depend on or change the current working directory.
pub static CWD_MUTEX: Mutex<()> = Mutex::new(());

/// A temporary repository on branch `main` with one commit, made the
/// current directory until dropped.
pub struct TestRepo {
    dir: TempDir,
    original_dir: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl TestRepo {
    pub fn new() -> Self {
        let lock = CWD_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let dir = TempDir::new().unwrap();
        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();

        let repo = Self {
            dir,
            original_dir,
            _lock: lock,
        };
        repo.git(&["init", "--quiet"]);
        repo.git(&["symbolic-ref", "HEAD", "refs/heads/main"]);
        repo.git(&["config", "user.name", "Test User"]);
        repo.git(&["config", "user.email", "test@example.com"]);
        repo.git(&["config", "commit.gpgsign", "false"]);
        repo.git(&["config", "tag.gpgsign", "false"]);
        repo.commit_file("test.txt", "test", "Initial commit");
        repo
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Run git in the repository, panicking on failure. Returns stdout.
    pub fn git(&self, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.dir.path())
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    pub fn write_file(&self, name: &str, content: &str) {
        fs::write(self.dir.path().join(name), content).unwrap();
    }

    pub fn commit_file(&self, name: &str, content: &str, message: &str) {
        self.write_file(name, content);
        self.git(&["add", "-A"]);
        self.git(&["commit", "--quiet", "-m", message]);
    }

    pub fn head(&self) -> String {
        self.git(&["rev-parse", "HEAD"])
    }
}

impl Drop for TestRepo {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.original_dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cwd_mutex_can_be_acquired_multiple_times_sequentially() {
        {
            let _lock = CWD_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        }
        {
            let _lock = CWD_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        }
    }

    #[test]
    fn test_repo_starts_on_main_with_one_commit() {
        let repo = TestRepo::new();
        assert_eq!(repo.git(&["rev-parse", "--abbrev-ref", "HEAD"]), "main");
        assert_eq!(repo.git(&["rev-list", "--count", "HEAD"]), "1");
        assert_eq!(
            std::env::current_dir().unwrap().canonicalize().unwrap(),
            repo.path().canonicalize().unwrap()
        );
    }
}
