use crate::domain::Commit;
use crate::error::{ReleaseError, Result};
use crate::git::Repository;
use git2::{BranchType, Oid, Repository as Git2Repo, Signature};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Wrapper around git2::Repository with our trait interface
pub struct Git2Repository {
    repo: Git2Repo,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;

        Ok(Git2Repository { repo })
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository { repo }
    }

    fn signature(&self) -> Result<Signature<'static>> {
        match self.repo.signature() {
            Ok(sig) => Ok(sig.to_owned()),
            Err(_) => Ok(Signature::now("git-release", "git-release@localhost")?),
        }
    }

    fn remote_callbacks<'a>() -> git2::RemoteCallbacks<'a> {
        let mut callbacks = git2::RemoteCallbacks::new();
        callbacks.credentials(|_url, username_from_url, allowed_types| {
            if allowed_types.contains(git2::CredentialType::SSH_KEY) {
                // Try different key types in order of preference
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                let key_paths = [
                    format!("{}/.ssh/id_ed25519", home),
                    format!("{}/.ssh/id_rsa", home),
                    format!("{}/.ssh/id_ecdsa", home),
                ];

                for key_path in key_paths {
                    let path = Path::new(&key_path);
                    if path.exists() {
                        if let Ok(cred) = git2::Cred::ssh_key(
                            username_from_url.unwrap_or("git"),
                            None,
                            path,
                            None,
                        ) {
                            return Ok(cred);
                        }
                    }
                }

                if let Ok(cred) = git2::Cred::ssh_key_from_agent(username_from_url.unwrap_or("git"))
                {
                    return Ok(cred);
                }
            }

            if allowed_types.contains(git2::CredentialType::USER_PASS_PLAINTEXT) {
                if let Ok(token) = std::env::var("GH_TOKEN").or_else(|_| std::env::var("GITHUB_TOKEN")) {
                    return git2::Cred::userpass_plaintext("x-access-token", &token);
                }
            }

            git2::Cred::default()
        });
        callbacks
    }

    /// Map every tagged commit to its tag names
    fn tags_by_commit(&self) -> Result<HashMap<Oid, Vec<String>>> {
        let mut by_commit: HashMap<Oid, Vec<String>> = HashMap::new();

        for name in self.repo.tag_names(None)?.iter().flatten() {
            if let Some(oid) = self.tag_target(name)? {
                by_commit.entry(oid).or_default().push(name.to_string());
            }
        }

        for names in by_commit.values_mut() {
            names.sort();
        }
        Ok(by_commit)
    }
}

impl Repository for Git2Repository {
    fn current_branch(&self) -> Result<String> {
        let head = self.repo.head()?;
        if !head.is_branch() {
            return Err(ReleaseError::config(
                "HEAD is detached; pass --branch to select the release branch",
            ));
        }
        head.shorthand()
            .map(|s| s.to_string())
            .ok_or_else(|| ReleaseError::config("current branch name is not valid UTF-8"))
    }

    fn branch_head(&self, branch: &str) -> Result<Oid> {
        let branch_ref = self.repo.find_branch(branch, BranchType::Local).map_err(|e| {
            ReleaseError::config(format!("Cannot find branch '{}': {}", branch, e))
        })?;
        let commit = branch_ref.into_reference().peel_to_commit()?;
        Ok(commit.id())
    }

    fn list_tags(&self) -> Result<Vec<String>> {
        let tags = self.repo.tag_names(None)?;

        let mut names: Vec<String> = tags.iter().flatten().map(|s| s.to_string()).collect();
        names.sort();
        Ok(names)
    }

    fn tag_target(&self, name: &str) -> Result<Option<Oid>> {
        match self.repo.find_reference(&format!("refs/tags/{}", name)) {
            // Annotated tags peel through the tag object to the commit
            Ok(reference) => Ok(Some(reference.peel_to_commit()?.id())),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn find_nearest_tag(
        &self,
        head: Oid,
        accept: &dyn Fn(&str) -> bool,
    ) -> Result<Option<(String, Oid)>> {
        let tags = self.tags_by_commit()?;
        if tags.is_empty() {
            return Ok(None);
        }

        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::TIME)?;
        revwalk.push(head)?;

        for oid in revwalk {
            let oid = oid?;
            if let Some(names) = tags.get(&oid) {
                if let Some(name) = names.iter().find(|n| accept(n.as_str())) {
                    return Ok(Some((name.clone(), oid)));
                }
            }
        }

        Ok(None)
    }

    fn commits_between(&self, branch: &str, from: Option<Oid>, to: Oid) -> Result<Vec<Commit>> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::REVERSE)?;
        revwalk.push(to)?;
        if let Some(from) = from {
            revwalk.hide(from)?;
        }

        let mut commits = Vec::new();
        for oid in revwalk {
            let oid = oid?;
            let commit = self.repo.find_commit(oid)?;

            commits.push(Commit {
                hash: oid.to_string(),
                message: commit.message().unwrap_or("").to_string(),
                author: commit.author().name().unwrap_or("unknown").to_string(),
                timestamp: commit.time().seconds(),
                branch: branch.to_string(),
            });
        }

        Ok(commits)
    }

    fn remote_url(&self, remote: &str) -> Result<Option<String>> {
        match self.repo.find_remote(remote) {
            Ok(r) => Ok(r.url().map(|u| u.to_string())),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn commit_files(&self, paths: &[PathBuf], message: &str) -> Result<Option<Oid>> {
        let mut index = self.repo.index()?;
        for path in paths {
            index.add_path(path)?;
        }
        index.write()?;

        let tree_oid = index.write_tree()?;
        let parent = self.repo.head()?.peel_to_commit()?;
        if parent.tree_id() == tree_oid {
            return Ok(None);
        }

        let tree = self.repo.find_tree(tree_oid)?;
        let sig = self.signature()?;
        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &[&parent])?;

        Ok(Some(oid))
    }

    fn create_tag(&self, name: &str, target: Oid, message: &str) -> Result<()> {
        let object = self.repo.find_object(target, None)?;
        let sig = self.signature()?;

        self.repo.tag(name, &object, &sig, message, false)?;
        Ok(())
    }

    fn delete_tag(&self, name: &str) -> Result<()> {
        self.repo.tag_delete(name)?;
        Ok(())
    }

    fn push(&self, remote_name: &str, refspecs: &[String]) -> Result<()> {
        let mut remote = self
            .repo
            .find_remote(remote_name)
            .map_err(|_| ReleaseError::remote(format!("No remote named '{}' found", remote_name)))?;

        let mut callbacks = Self::remote_callbacks();
        callbacks.push_update_reference(|refname, status| match status {
            Some(status) => {
                log::warn!("Could not update reference {}: {}", refname, status);
                Err(git2::Error::from_str(&format!("Push rejected for {}", refname)))
            }
            None => Ok(()),
        });

        let mut push_options = git2::PushOptions::new();
        push_options.remote_callbacks(callbacks);

        let specs: Vec<&str> = refspecs.iter().map(|s| s.as_str()).collect();
        remote.push(&specs, Some(&mut push_options)).map_err(|e| {
            if e.class() == git2::ErrorClass::Net {
                ReleaseError::remote(format!("Network error during push: {}", e))
            } else {
                ReleaseError::remote(format!("Push to '{}' failed: {}", remote_name, e))
            }
        })
    }

    fn workdir(&self) -> Option<PathBuf> {
        self.repo.workdir().map(|p| p.to_path_buf())
    }

    fn git_dir(&self) -> &Path {
        self.repo.path()
    }
}
