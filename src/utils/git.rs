//! Changed-file detection through the `git` CLI.
//!
//! A file counts as changed when it differs from the parent commit (so the
//! last commit's files are included), has uncommitted edits, or is
//! untracked and not ignored. Outside a repository nothing is changed.

use std::path::{Path, PathBuf};

use anyhow::Result;

use super::exec::Cmd;
use super::path::{is_under_any, normalize_path};

/// Candidate files for startup warm-up.
pub struct ChangedFiles;

impl ChangedFiles {
    /// Existing changed files under `roots`, sorted.
    pub fn for_roots(roots: &[PathBuf]) -> Vec<PathBuf> {
        let roots: Vec<PathBuf> = roots.iter().map(|root| normalize_path(root)).collect();

        let Some(toplevel) = roots.iter().find_map(|root| repo_toplevel(root)) else {
            crate::debug!("git"; "not a git repository, no changed files");
            return Vec::new();
        };

        let mut files = match list_changed(&toplevel) {
            Ok(files) => files,
            Err(e) => {
                crate::log!("git"; "cannot list changed files: {:#}", e);
                return Vec::new();
            }
        };

        files.retain(|path| is_under_any(path, &roots) && path.is_file());
        files.sort();
        files.dedup();
        files
    }
}

/// Repository root containing `dir`, walking up to the nearest existing
/// ancestor first.
fn repo_toplevel(dir: &Path) -> Option<PathBuf> {
    let dir = dir.ancestors().find(|d| d.is_dir())?;
    let output = Cmd::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .cwd(dir)
        .run()
        .ok()?;
    let toplevel = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!toplevel.is_empty()).then(|| normalize_path(Path::new(&toplevel)))
}

/// Absolute paths of files changed since the parent commit, plus untracked.
fn list_changed(toplevel: &Path) -> Result<Vec<PathBuf>> {
    let git = |args: &[&str]| Cmd::new("git").args(args).cwd(toplevel).run();

    // Without a parent commit every tracked file is new
    let diff = git(&["diff", "--name-only", "HEAD^"]).or_else(|_| git(&["ls-files"]))?;
    let untracked = git(&["ls-files", "--others", "--exclude-standard"])?;

    let mut files = Vec::new();
    for output in [diff, untracked] {
        let stdout = String::from_utf8_lossy(&output.stdout);
        files.extend(
            stdout
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(|line| toplevel.join(line)),
        );
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn git(dir: &Path, args: &[&str]) {
        Cmd::new("git")
            .args(["-c", "user.name=test", "-c", "user.email=test@example.com"])
            .args(args)
            .cwd(dir)
            .run()
            .unwrap();
    }

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_outside_repository_is_empty() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("tests/integration");
        write(&root.join("a.spec.js"), "a");

        // Temp dirs can live inside a checkout on some CI machines
        if repo_toplevel(&root).is_some() {
            return;
        }
        assert!(ChangedFiles::for_roots(&[root]).is_empty());
    }

    #[test]
    fn test_changed_since_parent_and_untracked() {
        if which::which("git").is_err() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let repo = normalize_path(temp.path());
        let integration = repo.join("tests/integration");

        git(&repo, &["init", "-q"]);
        write(&integration.join("old.spec.js"), "old");
        write(&integration.join("edited.spec.js"), "v1");
        write(&repo.join("src/app.js"), "app");
        git(&repo, &["add", "."]);
        git(&repo, &["commit", "-q", "-m", "initial"]);

        write(&integration.join("committed.spec.js"), "new");
        git(&repo, &["add", "."]);
        git(&repo, &["commit", "-q", "-m", "second"]);

        write(&integration.join("edited.spec.js"), "v2");
        write(&integration.join("untracked.spec.js"), "u");
        write(&repo.join("src/other.js"), "outside roots");

        let files = ChangedFiles::for_roots(&[integration.clone()]);
        assert_eq!(
            files,
            vec![
                integration.join("committed.spec.js"),
                integration.join("edited.spec.js"),
                integration.join("untracked.spec.js"),
            ]
        );
    }

    #[test]
    fn test_deleted_files_skipped() {
        if which::which("git").is_err() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let repo = normalize_path(temp.path());
        let integration = repo.join("tests/integration");

        git(&repo, &["init", "-q"]);
        write(&integration.join("gone.spec.js"), "x");
        write(&integration.join("kept.spec.js"), "y");
        git(&repo, &["add", "."]);
        git(&repo, &["commit", "-q", "-m", "initial"]);
        fs::remove_file(integration.join("gone.spec.js")).unwrap();

        let files = ChangedFiles::for_roots(&[integration.clone()]);
        assert_eq!(files, vec![integration.join("kept.spec.js")]);
    }
}
