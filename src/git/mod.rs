//! Version control abstraction
//!
//! The release run reads history and tags through the [Repository] trait and
//! records releases through it. Two implementations exist:
//!
//! - [repository::Git2Repository]: a real repository backed by `git2`
//! - [mock::MockRepository]: an in-memory repository for tests
//!
//! ```rust
//! # use git_release::git::Repository;
//! # fn example(repo: &dyn Repository) -> git_release::error::Result<()> {
//! let head = repo.branch_head("master")?;
//! let commits = repo.commits_between("master", None, head)?;
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod repository;

pub use mock::MockRepository;
pub use repository::Git2Repository;

use crate::domain::Commit;
use crate::error::Result;
use git2::Oid;
use std::path::{Path, PathBuf};

/// Version control operations needed by a release run.
///
/// The trait is object safe; pipeline steps receive `&dyn Repository`.
/// Implementations are used from a single thread.
pub trait Repository {
    /// Name of the checked-out branch
    fn current_branch(&self) -> Result<String>;

    /// Commit at the tip of a local branch
    fn branch_head(&self, branch: &str) -> Result<Oid>;

    /// All tag names, sorted
    fn list_tags(&self) -> Result<Vec<String>>;

    /// Commit a tag points at, or `None` when the tag does not exist
    fn tag_target(&self, name: &str) -> Result<Option<Oid>>;

    /// Walk history backwards from `head` and return the first tag accepted
    /// by `accept`, together with the commit it points at.
    fn find_nearest_tag(
        &self,
        head: Oid,
        accept: &dyn Fn(&str) -> bool,
    ) -> Result<Option<(String, Oid)>>;

    /// Commits reachable from `to` but not from `from`, oldest first.
    ///
    /// `from = None` returns the whole history of `to`.
    fn commits_between(&self, branch: &str, from: Option<Oid>, to: Oid) -> Result<Vec<Commit>>;

    /// Fetch URL of a remote, `None` when the remote is not configured
    fn remote_url(&self, remote: &str) -> Result<Option<String>>;

    /// Stage `paths` (relative to the working directory) and commit them on
    /// the checked-out branch.
    ///
    /// Returns `None` without committing when the tree did not change.
    fn commit_files(&self, paths: &[PathBuf], message: &str) -> Result<Option<Oid>>;

    /// Create an annotated tag
    fn create_tag(&self, name: &str, target: Oid, message: &str) -> Result<()>;

    fn delete_tag(&self, name: &str) -> Result<()>;

    /// Push refspecs such as `refs/tags/v1.0.0` to a remote
    fn push(&self, remote: &str, refspecs: &[String]) -> Result<()>;

    /// Working directory, `None` for bare repositories
    fn workdir(&self) -> Option<PathBuf>;

    /// The `.git` directory
    fn git_dir(&self) -> &Path;
}
