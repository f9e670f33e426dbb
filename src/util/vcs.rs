//! Source-control metadata.
//!
//! The branch and revision are captured once when a build is configured
//! and baked into the `BRANCH` and `REVISION` defines.

use std::path::{Path, PathBuf};

use git2::Repository;
use serde::{Deserialize, Serialize};

/// Branch and revision of the working tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcsInfo {
    /// Current branch (`HEAD` when detached, empty outside a repository)
    pub branch: String,
    /// Current commit id (empty outside a repository)
    pub revision: String,
}

impl VcsInfo {
    pub fn new(branch: impl Into<String>, revision: impl Into<String>) -> Self {
        VcsInfo {
            branch: branch.into(),
            revision: revision.into(),
        }
    }
}

/// A source-control query.
pub trait SourceControl {
    /// Look up the current branch and revision.
    fn metadata(&self) -> VcsInfo;
}

/// Fixed metadata, for callers that already know it.
impl SourceControl for VcsInfo {
    fn metadata(&self) -> VcsInfo {
        self.clone()
    }
}

/// Git working tree rooted at (or above) a directory.
#[derive(Debug, Clone)]
pub struct GitSourceControl {
    root: PathBuf,
}

impl GitSourceControl {
    pub fn new(root: impl AsRef<Path>) -> Self {
        GitSourceControl {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn query(&self) -> Result<VcsInfo, git2::Error> {
        let repo = Repository::discover(&self.root)?;
        let head = repo.head()?;

        let branch = if repo.head_detached()? {
            "HEAD".to_string()
        } else {
            head.shorthand().unwrap_or("HEAD").to_string()
        };
        let revision = head.peel_to_commit()?.id().to_string();

        Ok(VcsInfo { branch, revision })
    }
}

impl SourceControl for GitSourceControl {
    fn metadata(&self) -> VcsInfo {
        match self.query() {
            Ok(info) => {
                tracing::debug!("git branch `{}` at {}", info.branch, info.revision);
                info
            }
            Err(e) => {
                tracing::debug!(
                    "no git metadata for {}: {}",
                    self.root.display(),
                    e.message()
                );
                VcsInfo::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fixed_metadata() {
        let info = VcsInfo::new("main", "abc123");
        assert_eq!(info.metadata(), info);
    }

    #[test]
    fn test_outside_repository_is_empty() {
        let tmp = TempDir::new().unwrap();
        // The temp dir itself may sit inside a checkout; a missing path never does.
        let git = GitSourceControl::new(tmp.path().join("does-not-exist"));
        assert_eq!(git.metadata(), VcsInfo::default());
    }

    #[test]
    fn test_reads_branch_and_revision() {
        let tmp = TempDir::new().unwrap();
        let repo = Repository::init(tmp.path()).unwrap();

        let sig = git2::Signature::now("pkgboot", "pkgboot@example.com").unwrap();
        let tree_id = repo.index().unwrap().write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let commit = repo
            .commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
            .unwrap();

        let info = GitSourceControl::new(tmp.path()).metadata();
        assert_eq!(info.revision, commit.to_string());
        assert!(!info.branch.is_empty());
        assert_ne!(info.branch, "HEAD");
    }

    #[test]
    fn test_detached_head_reports_head() {
        let tmp = TempDir::new().unwrap();
        let repo = Repository::init(tmp.path()).unwrap();

        let sig = git2::Signature::now("pkgboot", "pkgboot@example.com").unwrap();
        let tree_id = repo.index().unwrap().write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let commit = repo
            .commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
            .unwrap();
        repo.set_head_detached(commit).unwrap();

        let info = GitSourceControl::new(tmp.path()).metadata();
        assert_eq!(info.branch, "HEAD");
        assert_eq!(info.revision, commit.to_string());
    }
}
