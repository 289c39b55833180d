#![allow(dead_code)]

use std::cell::RefCell;
use std::path::Path;

use chrono::NaiveDate;
use git_release::config::{parse_config, CompiledConfig};
use git_release::error::{ReleaseError, Result};
use git_release::git::mock::MockRepository;
use git_release::pipeline::CancelHandle;
use git_release::steps::{ContainerRegistry, NewRelease, PublishedRelease, ReleaseHost};
use git_release::{Coordinator, RunOptions, RunReport};

pub const REMOTE_URL: &str = "https://github.com/acme/webhook.git";

/// Registry that records calls and can cancel the run from inside a call
#[derive(Default)]
pub struct FakeRegistry {
    pub calls: RefCell<Vec<String>>,
    pub missing_source: bool,
    pub cancel_on_verify: RefCell<Option<CancelHandle>>,
    pub cancel_on_push: RefCell<Option<CancelHandle>>,
    pub cancel_results: RefCell<Vec<bool>>,
}

impl ContainerRegistry for FakeRegistry {
    fn image_exists(&self, reference: &str) -> Result<bool> {
        self.calls.borrow_mut().push(format!("inspect {}", reference));
        if let Some(handle) = self.cancel_on_verify.borrow().as_ref() {
            self.cancel_results.borrow_mut().push(handle.cancel());
        }
        Ok(!self.missing_source)
    }

    fn tag(&self, source: &str, target: &str) -> Result<()> {
        self.calls
            .borrow_mut()
            .push(format!("tag {} {}", source, target));
        Ok(())
    }

    fn push(&self, target: &str) -> Result<()> {
        self.calls.borrow_mut().push(format!("push {}", target));
        if let Some(handle) = self.cancel_on_push.borrow().as_ref() {
            self.cancel_results.borrow_mut().push(handle.cancel());
        }
        Ok(())
    }
}

/// Release host that records created releases
#[derive(Default)]
pub struct FakeHost {
    pub access_checks: RefCell<Vec<String>>,
    pub releases: RefCell<Vec<(String, NewRelease)>>,
    pub deny_access: bool,
}

impl ReleaseHost for FakeHost {
    fn check_access(&self, _api_url: &str, slug: &str) -> Result<()> {
        self.access_checks.borrow_mut().push(slug.to_string());
        if self.deny_access {
            return Err(ReleaseError::remote(format!("no access to {}", slug)));
        }
        Ok(())
    }

    fn create_release(
        &self,
        _api_url: &str,
        slug: &str,
        release: &NewRelease,
    ) -> Result<PublishedRelease> {
        self.releases
            .borrow_mut()
            .push((slug.to_string(), release.clone()));
        Ok(PublishedRelease {
            id: 1,
            html_url: format!("https://github.com/{}/releases/tag/{}", slug, release.tag_name),
            upload_url: String::new(),
        })
    }

    fn upload_asset(&self, release: &PublishedRelease, path: &Path) -> Result<String> {
        Ok(format!(
            "{}/{}",
            release.html_url,
            path.file_name().unwrap().to_string_lossy()
        ))
    }
}

/// Default branches (`master` stable, `dev` prerelease) with the given steps
pub fn compile(steps: &str) -> CompiledConfig {
    parse_config(steps).unwrap().compile().unwrap()
}

pub fn default_config() -> CompiledConfig {
    compile("")
}

pub fn release_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
}

pub fn options(dry_run: bool) -> RunOptions {
    RunOptions {
        branch: None,
        dry_run,
        date: Some(release_date()),
    }
}

/// Mock repository rooted in `root` with `master` released as v1.2.3
pub fn released_repo(root: &Path) -> MockRepository {
    let mut repo = MockRepository::new(root);
    repo.add_remote("origin", REMOTE_URL);
    let base = repo.commit("master", "feat: initial import");
    repo.add_tag("v1.2.3", base);
    repo
}

pub fn run(
    config: &CompiledConfig,
    repo: &MockRepository,
    registry: &FakeRegistry,
    host: &FakeHost,
    dry_run: bool,
) -> Result<RunReport> {
    Coordinator::new(config, repo, registry, host).run(&options(dry_run))
}
