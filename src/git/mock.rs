use crate::domain::Commit;
use crate::error::{ReleaseError, Result};
use crate::git::Repository;
use git2::Oid;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

#[derive(Default)]
struct State {
    /// Linear history per branch, oldest first
    branches: BTreeMap<String, Vec<(Oid, Commit)>>,
    current: String,
    tags: BTreeMap<String, Oid>,
    remotes: HashMap<String, String>,
    pushes: Vec<(String, Vec<String>)>,
    release_commits: Vec<(String, Vec<PathBuf>)>,
    created_tags: Vec<String>,
    fail_push: bool,
    next_id: u64,
}

impl State {
    fn next_oid(&mut self) -> Oid {
        self.next_id += 1;
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&self.next_id.to_be_bytes());
        Oid::from_bytes(&bytes).unwrap_or_else(|_| Oid::zero())
    }

    fn append(&mut self, branch: &str, message: &str) -> Oid {
        let oid = self.next_oid();
        let commit = Commit {
            hash: oid.to_string(),
            message: message.to_string(),
            author: "Mock Author".to_string(),
            timestamp: 1_700_000_000 + self.next_id as i64 * 60,
            branch: branch.to_string(),
        };
        self.branches
            .entry(branch.to_string())
            .or_default()
            .push((oid, commit));
        oid
    }

    /// History ending at `head`, preferring the named branch
    fn history_to(&self, branch: Option<&str>, head: Oid) -> Option<&[(Oid, Commit)]> {
        let preferred = branch.and_then(|b| self.branches.get(b));
        preferred
            .into_iter()
            .chain(self.branches.values())
            .find_map(|history| {
                history
                    .iter()
                    .position(|(oid, _)| *oid == head)
                    .map(|idx| &history[..=idx])
            })
    }
}

/// In-memory repository with linear branch histories.
///
/// Mutations made through the [Repository] trait are recorded so tests can
/// assert exactly which writes a run performed.
pub struct MockRepository {
    root: PathBuf,
    state: RefCell<State>,
}

impl MockRepository {
    /// Create an empty repository whose working and git directory is `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        MockRepository {
            root: root.into(),
            state: RefCell::new(State {
                current: "master".to_string(),
                ..State::default()
            }),
        }
    }

    /// Append a commit to a branch, creating the branch if needed
    pub fn commit(&mut self, branch: &str, message: &str) -> Oid {
        self.state.get_mut().append(branch, message)
    }

    /// Start a new branch sharing the full history of `from`
    pub fn branch_from(&mut self, branch: &str, from: &str) {
        let state = self.state.get_mut();
        let history = state.branches.get(from).cloned().unwrap_or_default();
        state.branches.insert(branch.to_string(), history);
    }

    pub fn checkout(&mut self, branch: &str) {
        self.state.get_mut().current = branch.to_string();
    }

    pub fn add_tag(&mut self, name: impl Into<String>, oid: Oid) {
        self.state.get_mut().tags.insert(name.into(), oid);
    }

    pub fn add_remote(&mut self, name: impl Into<String>, url: impl Into<String>) {
        self.state.get_mut().remotes.insert(name.into(), url.into());
    }

    /// Make every subsequent push fail
    pub fn fail_push(&mut self, fail: bool) {
        self.state.get_mut().fail_push = fail;
    }

    pub fn tag_names(&self) -> Vec<String> {
        self.state.borrow().tags.keys().cloned().collect()
    }

    /// Recorded pushes as `(remote, refspecs)`
    pub fn pushes(&self) -> Vec<(String, Vec<String>)> {
        self.state.borrow().pushes.clone()
    }

    /// Commits made through [Repository::commit_files] as `(message, paths)`
    pub fn release_commits(&self) -> Vec<(String, Vec<PathBuf>)> {
        self.state.borrow().release_commits.clone()
    }

    /// Number of writes of any kind performed through the trait
    pub fn write_count(&self) -> usize {
        let state = self.state.borrow();
        state.pushes.len() + state.release_commits.len() + state.created_tags.len()
    }
}

impl Repository for MockRepository {
    fn current_branch(&self) -> Result<String> {
        Ok(self.state.borrow().current.clone())
    }

    fn branch_head(&self, branch: &str) -> Result<Oid> {
        self.state
            .borrow()
            .branches
            .get(branch)
            .and_then(|h| h.last())
            .map(|(oid, _)| *oid)
            .ok_or_else(|| ReleaseError::config(format!("Cannot find branch '{}'", branch)))
    }

    fn list_tags(&self) -> Result<Vec<String>> {
        Ok(self.tag_names())
    }

    fn tag_target(&self, name: &str) -> Result<Option<Oid>> {
        Ok(self.state.borrow().tags.get(name).copied())
    }

    fn find_nearest_tag(
        &self,
        head: Oid,
        accept: &dyn Fn(&str) -> bool,
    ) -> Result<Option<(String, Oid)>> {
        let state = self.state.borrow();
        let Some(history) = state.history_to(None, head) else {
            return Ok(None);
        };

        for (oid, _) in history.iter().rev() {
            let found = state
                .tags
                .iter()
                .find(|(name, target)| **target == *oid && accept(name.as_str()));
            if let Some((name, _)) = found {
                return Ok(Some((name.clone(), *oid)));
            }
        }
        Ok(None)
    }

    fn commits_between(&self, branch: &str, from: Option<Oid>, to: Oid) -> Result<Vec<Commit>> {
        let state = self.state.borrow();
        let history = state
            .history_to(Some(branch), to)
            .ok_or_else(|| ReleaseError::config(format!("Unknown commit {}", to)))?;

        let start = from
            .and_then(|from| history.iter().position(|(oid, _)| *oid == from))
            .map(|idx| idx + 1)
            .unwrap_or(0);

        Ok(history[start..]
            .iter()
            .map(|(_, commit)| Commit {
                branch: branch.to_string(),
                ..commit.clone()
            })
            .collect())
    }

    fn remote_url(&self, remote: &str) -> Result<Option<String>> {
        Ok(self.state.borrow().remotes.get(remote).cloned())
    }

    fn commit_files(&self, paths: &[PathBuf], message: &str) -> Result<Option<Oid>> {
        if paths.is_empty() {
            return Ok(None);
        }
        let mut state = self.state.borrow_mut();
        let current = state.current.clone();
        let oid = state.append(&current, message);
        state
            .release_commits
            .push((message.to_string(), paths.to_vec()));
        Ok(Some(oid))
    }

    fn create_tag(&self, name: &str, target: Oid, _message: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.tags.contains_key(name) {
            return Err(ReleaseError::Git(git2::Error::from_str(&format!(
                "tag '{}' already exists",
                name
            ))));
        }
        state.tags.insert(name.to_string(), target);
        state.created_tags.push(name.to_string());
        Ok(())
    }

    fn delete_tag(&self, name: &str) -> Result<()> {
        self.state
            .borrow_mut()
            .tags
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ReleaseError::Git(git2::Error::from_str(&format!("tag '{}' not found", name))))
    }

    fn push(&self, remote: &str, refspecs: &[String]) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if !state.remotes.contains_key(remote) {
            return Err(ReleaseError::remote(format!("No remote named '{}' found", remote)));
        }
        if state.fail_push {
            return Err(ReleaseError::remote(format!("Push to '{}' rejected", remote)));
        }
        state.pushes.push((remote.to_string(), refspecs.to_vec()));
        Ok(())
    }

    fn workdir(&self) -> Option<PathBuf> {
        Some(self.root.clone())
    }

    fn git_dir(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> MockRepository {
        let mut repo = MockRepository::new(std::env::temp_dir());
        let first = repo.commit("master", "feat: first");
        repo.commit("master", "fix: second");
        repo.add_tag("v1.0.0", first);
        repo
    }

    #[test]
    fn test_branch_head_and_range() {
        let repo = repo();
        let head = repo.branch_head("master").unwrap();
        let from = repo.tag_target("v1.0.0").unwrap();

        let commits = repo.commits_between("master", from, head).unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].message, "fix: second");

        assert_eq!(repo.commits_between("master", None, head).unwrap().len(), 2);
        assert!(repo.branch_head("missing").is_err());
    }

    #[test]
    fn test_branch_shares_history() {
        let mut repo = repo();
        repo.branch_from("dev", "master");
        let head = repo.commit("dev", "feat: on dev");

        let nearest = repo.find_nearest_tag(head, &|_| true).unwrap();
        assert_eq!(nearest.map(|(name, _)| name), Some("v1.0.0".to_string()));
        assert_eq!(repo.commits_between("dev", None, head).unwrap().len(), 3);
        assert_eq!(repo.commits_between("master", None, repo.branch_head("master").unwrap()).unwrap().len(), 2);
    }

    #[test]
    fn test_writes_are_recorded() {
        let mut repo = repo();
        repo.add_remote("origin", "https://github.com/acme/widget.git");
        let head = repo.branch_head("master").unwrap();

        repo.create_tag("v1.0.1", head, "1.0.1").unwrap();
        assert!(repo.create_tag("v1.0.1", head, "1.0.1").is_err());
        repo.push("origin", &["refs/tags/v1.0.1".to_string()]).unwrap();

        assert_eq!(repo.pushes().len(), 1);
        assert_eq!(repo.tag_names(), vec!["v1.0.0", "v1.0.1"]);
    }

    #[test]
    fn test_push_failure_injection() {
        let mut repo = repo();
        repo.add_remote("origin", "git@github.com:acme/widget.git");
        repo.fail_push(true);
        assert!(matches!(
            repo.push("origin", &["refs/heads/master".to_string()]),
            Err(ReleaseError::Remote(_))
        ));
        assert!(repo.push("upstream", &[]).is_err());
    }
}
