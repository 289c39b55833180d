//! Publication steps
//!
//! Each step kind is one variant of [Step] and declares which of the three
//! phases it supports. Steps read the shared [ReleaseContext] and reach the
//! outside world only through [Collaborators].

pub mod changelog;
pub mod container;
pub mod exec;
pub mod git_commit;
pub mod hosted;

pub use changelog::ChangelogStep;
pub use container::{ContainerRegistry, ContainerStep, DockerCli};
pub use exec::ExecStep;
pub use git_commit::GitStep;
pub use hosted::{GitHubHost, HostedReleaseStep, NewRelease, PublishedRelease, ReleaseHost};

use crate::boundary::BoundaryWarning;
use crate::config::StepConfig;
use crate::context::ReleaseContext;
use crate::domain::Phase;
use crate::error::{ReleaseError, Result};
use crate::git::Repository;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Something a step produced, or would produce in a dry run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    File(PathBuf),
    /// Captured standard output of a command
    Output(String),
    /// Fully qualified image reference
    Image(String),
    Commit(String),
    Tag(String),
    /// Ref pushed to a remote, as `<remote> <ref>`
    Pushed(String),
    /// Hosted release or uploaded asset URL
    Url(String),
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::File(path) => write!(f, "file {}", path.display()),
            Artifact::Output(out) => write!(f, "output: {}", out),
            Artifact::Image(image) => write!(f, "image {}", image),
            Artifact::Commit(id) => write!(f, "commit {}", id),
            Artifact::Tag(tag) => write!(f, "tag {}", tag),
            Artifact::Pushed(spec) => write!(f, "pushed {}", spec),
            Artifact::Url(url) => write!(f, "{}", url),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Skipped(String),
    Failed(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Ok => write!(f, "ok"),
            Outcome::Skipped(reason) => write!(f, "skipped ({})", reason),
            Outcome::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// One entry of the run log
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub step: String,
    pub kind: &'static str,
    pub phase: Phase,
    pub outcome: Outcome,
    pub artifacts: Vec<Artifact>,
}

/// What a successful phase invocation returns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub artifacts: Vec<Artifact>,
    /// Set when the mutation was not performed, e.g. in a dry run
    pub skipped: Option<String>,
    pub warnings: Vec<BoundaryWarning>,
}

impl Completion {
    pub fn done(artifacts: Vec<Artifact>) -> Self {
        Completion {
            artifacts,
            ..Completion::default()
        }
    }

    /// The mutation was skipped; `artifacts` describe what it would produce
    pub fn dry_run(what: impl fmt::Display, artifacts: Vec<Artifact>) -> Self {
        Completion {
            artifacts,
            skipped: Some(format!("dry run: would {}", what)),
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<BoundaryWarning>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// External systems a step may touch
pub struct Collaborators<'a> {
    pub repo: &'a dyn Repository,
    pub registry: &'a dyn ContainerRegistry,
    pub host: &'a dyn ReleaseHost,
    pub workdir: &'a Path,
    pub remote: &'a str,
    pub timeout: Duration,
}

/// A configured step of one of the supported kinds
#[derive(Debug, Clone)]
pub enum Step {
    Changelog(ChangelogStep),
    Exec(ExecStep),
    Container(ContainerStep),
    Git(GitStep),
    HostedRelease(HostedReleaseStep),
}

impl Step {
    /// Build a step from its declaration, parsing every template.
    pub fn from_config(config: &StepConfig) -> Result<Self> {
        let step = match config {
            StepConfig::Changelog(c) => Step::Changelog(ChangelogStep::new(c)),
            StepConfig::Exec(c) => Step::Exec(ExecStep::new(c)?),
            StepConfig::Container(c) => Step::Container(ContainerStep::new(c)?),
            StepConfig::Git(c) => Step::Git(GitStep::new(c)?),
            StepConfig::HostedRelease(c) => Step::HostedRelease(HostedReleaseStep::new(c)?),
        };
        Ok(step)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Step::Changelog(_) => "changelog",
            Step::Exec(_) => "exec",
            Step::Container(_) => "container",
            Step::Git(_) => "git",
            Step::HostedRelease(_) => "hosted_release",
        }
    }

    /// Phases this step kind can run, in phase order
    pub fn capabilities(&self) -> Vec<Phase> {
        match self {
            Step::Changelog(_) => vec![Phase::Prepare],
            Step::Exec(s) => s.phases(),
            Step::Container(_) => vec![Phase::Verify, Phase::Prepare, Phase::Publish],
            Step::Git(_) => vec![Phase::Verify, Phase::Publish],
            Step::HostedRelease(_) => vec![Phase::Verify, Phase::Publish],
        }
    }

    /// Run one phase. Callers only invoke phases the step declares.
    pub fn run(
        &self,
        phase: Phase,
        ctx: &ReleaseContext,
        env: &Collaborators<'_>,
    ) -> Result<Completion> {
        log::info!("{} {} for {}", phase, self.kind(), ctx.tag());
        match (self, phase) {
            (Step::Changelog(s), Phase::Prepare) => s.prepare(ctx, env),
            (Step::Exec(s), phase) => s.run(phase, ctx, env),
            (Step::Container(s), Phase::Verify) => s.verify(ctx, env),
            (Step::Container(s), Phase::Prepare) => s.prepare(ctx, env),
            (Step::Container(s), Phase::Publish) => s.publish(ctx, env),
            (Step::Git(s), Phase::Verify) => s.verify(ctx, env),
            (Step::Git(s), Phase::Publish) => s.publish(ctx, env),
            (Step::HostedRelease(s), Phase::Verify) => s.verify(ctx, env),
            (Step::HostedRelease(s), Phase::Publish) => s.publish(ctx, env),
            (step, phase) => Err(ReleaseError::config(format!(
                "{} steps do not support the {} phase",
                step.kind(),
                phase
            ))),
        }
    }
}

/// Resolve a configured path against the working directory
pub(crate) fn resolve_path(workdir: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workdir.join(path)
    }
}
