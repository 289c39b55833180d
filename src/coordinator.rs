//! Drives one release run from branch resolution to the pipeline outcome.
//!
//! Publish actions are never undone. A failed run reports which step failed
//! and keeps the run log; the release counts as done only when the git step
//! published its tag.

use crate::analyzer::{check_consistency, next_version, Classification, CommitClassifier, TagHistory};
use crate::boundary::BoundaryWarning;
use crate::config::CompiledConfig;
use crate::context::{CommitRange, ReleaseContext};
use crate::domain::{Channel, Resolution, Version};
use crate::error::{ReleaseError, Result};
use crate::git::Repository;
use crate::lock::ChannelLock;
use crate::notes;
use crate::pipeline::CancelHandle;
use crate::steps::{Collaborators, ContainerRegistry, ReleaseHost, StepResult};
use chrono::NaiveDate;
use std::fmt;
use std::path::Path;

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Resolving,
    Classifying,
    Versioning,
    Skipped,
    PipelineRunning,
    Succeeded,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Resolving => "resolving",
            RunState::Classifying => "classifying",
            RunState::Versioning => "versioning",
            RunState::Skipped => "skipped",
            RunState::PipelineRunning => "pipeline running",
            RunState::Succeeded => "succeeded",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Why no release was needed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The branch is not configured for releases
    IneligibleBranch,
    /// Nothing was committed since the last release
    NoNewCommits,
    /// Commits exist but none of them warrants a version bump
    NoReleasableCommits,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::IneligibleBranch => write!(f, "branch is not configured for releases"),
            SkipReason::NoNewCommits => write!(f, "no new commits since the last release"),
            SkipReason::NoReleasableCommits => write!(f, "no commits warrant a release"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Release this branch instead of the checked-out one
    pub branch: Option<String>,
    pub dry_run: bool,
    /// Date printed in the release notes; today when unset
    pub date: Option<NaiveDate>,
}

/// Everything a finished run reports
#[derive(Debug)]
pub struct RunReport {
    pub state: RunState,
    pub branch: String,
    pub channel: Option<Channel>,
    pub skip_reason: Option<SkipReason>,
    pub previous_tag: Option<String>,
    pub classification: Option<Classification>,
    pub version: Option<Version>,
    pub tag: Option<String>,
    pub notes: Option<String>,
    /// The version recorded by a published tag, if any
    pub released: Option<Version>,
    pub log: Vec<StepResult>,
    pub warnings: Vec<BoundaryWarning>,
    pub failure: Option<ReleaseError>,
    pub dry_run: bool,
}

impl RunReport {
    fn new(branch: String, dry_run: bool) -> Self {
        RunReport {
            state: RunState::Idle,
            branch,
            channel: None,
            skip_reason: None,
            previous_tag: None,
            classification: None,
            version: None,
            tag: None,
            notes: None,
            released: None,
            log: Vec::new(),
            warnings: Vec::new(),
            failure: None,
            dry_run,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.state, RunState::Succeeded | RunState::Skipped)
    }
}

/// Runs the release state machine against a repository and its external
/// collaborators
pub struct Coordinator<'a> {
    config: &'a CompiledConfig,
    repo: &'a dyn Repository,
    registry: &'a dyn ContainerRegistry,
    host: &'a dyn ReleaseHost,
    state: RunState,
    cancel: CancelHandle,
}

impl<'a> Coordinator<'a> {
    pub fn new(
        config: &'a CompiledConfig,
        repo: &'a dyn Repository,
        registry: &'a dyn ContainerRegistry,
        host: &'a dyn ReleaseHost,
    ) -> Self {
        Coordinator {
            config,
            repo,
            registry,
            host,
            state: RunState::Idle,
            cancel: CancelHandle::new(),
        }
    }

    /// Handle for cancelling the run from another thread
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        log::debug!("Run state {} -> {}", self.state, next);
        self.state = next;
    }

    fn finish(&mut self, mut report: RunReport, state: RunState) -> RunReport {
        self.transition(state);
        report.state = state;
        report
    }

    /// Execute one run.
    ///
    /// Configuration and version consistency problems are returned as errors
    /// before any step runs. Step failures and cancellation are reported in
    /// the returned [RunReport] with state [RunState::Failed].
    pub fn run(&mut self, options: &RunOptions) -> Result<RunReport> {
        let result = self.execute(options);
        if result.is_err() {
            self.transition(RunState::Failed);
        }
        result
    }

    fn execute(&mut self, options: &RunOptions) -> Result<RunReport> {
        self.transition(RunState::Resolving);
        let branch = match &options.branch {
            Some(b) => b.clone(),
            None => self.repo.current_branch()?,
        };
        let mut report = RunReport::new(branch.clone(), options.dry_run);

        let channel = match self.config.resolver.resolve(&branch) {
            Resolution::Eligible(channel) => channel,
            Resolution::Ineligible => {
                log::info!("Branch '{}' is not a release branch", branch);
                report.skip_reason = Some(SkipReason::IneligibleBranch);
                return Ok(self.finish(report, RunState::Skipped));
            }
        };
        log::info!("Branch '{}' releases on the {} channel", branch, channel);
        report.channel = Some(channel.clone());

        let _lock = if options.dry_run {
            None
        } else {
            Some(ChannelLock::acquire(self.repo.git_dir(), &channel)?)
        };

        self.transition(RunState::Classifying);
        let history = TagHistory::from_tags(self.repo.list_tags()?, &self.config.tag_pattern);
        report.warnings.extend(history.warnings().iter().cloned());

        let head = self.repo.branch_head(&branch)?;
        let boundary = self
            .repo
            .find_nearest_tag(head, &|tag| history.is_boundary(&channel, tag))?;
        report.previous_tag = boundary.as_ref().map(|(name, _)| name.clone());

        let commits = self
            .repo
            .commits_between(&branch, boundary.as_ref().map(|(_, oid)| *oid), head)?;
        log::info!(
            "{} commits since {}",
            commits.len(),
            report.previous_tag.as_deref().unwrap_or("the first commit")
        );

        if commits.is_empty() {
            if let Some(latest_tag) = report.previous_tag.clone() {
                report.warnings.push(BoundaryWarning::NoNewCommits {
                    latest_tag,
                    current_commit_hash: head.to_string(),
                });
            }
            report.skip_reason = Some(SkipReason::NoNewCommits);
            return Ok(self.finish(report, RunState::Skipped));
        }

        let classifier = CommitClassifier::new(self.config.commits.clone());
        let classification = classifier.classify(&commits);
        log::debug!("Commit delta: {:?}", classification.delta);

        self.transition(RunState::Versioning);
        let Some(version) = next_version(&classification.delta, &channel, &history) else {
            log::info!("No release needed: {} commits, none releasable", commits.len());
            report.classification = Some(classification);
            report.skip_reason = Some(SkipReason::NoReleasableCommits);
            return Ok(self.finish(report, RunState::Skipped));
        };
        let tag = self.config.tag_pattern.format(&version);
        // Guard against a calculation that would reuse or go below a release
        check_consistency(&version, &tag, &channel, &history)?;
        log::info!("Next version {} (tag {})", version, tag);

        let date = options
            .date
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        let release_notes = notes::render(&version, date, &classification, &self.config.commits);

        let ctx = ReleaseContext::new(
            version.clone(),
            channel,
            branch,
            tag.clone(),
            release_notes.clone(),
            CommitRange {
                from_tag: report.previous_tag.clone(),
                to: head.to_string(),
                commit_count: commits.len(),
            },
            options.dry_run,
        );
        report.classification = Some(classification);
        report.version = Some(version.clone());
        report.tag = Some(tag);
        report.notes = Some(release_notes);

        self.transition(RunState::PipelineRunning);
        let workdir = match self.repo.workdir() {
            Some(dir) => dir,
            None => std::env::current_dir()?,
        };
        let env = self.collaborators(&workdir);
        let run = self.config.pipeline.run(&ctx, &env, &self.cancel);

        if !options.dry_run && run.published("git") {
            report.released = Some(version);
        }
        report.warnings.extend(run.warnings);
        report.log = run.log;

        match run.error {
            None => Ok(self.finish(report, RunState::Succeeded)),
            Some(e) => {
                log::error!("Release run failed: {}", e);
                report.failure = Some(e);
                Ok(self.finish(report, RunState::Failed))
            }
        }
    }

    fn collaborators<'b>(&'b self, workdir: &'b Path) -> Collaborators<'b> {
        Collaborators {
            repo: self.repo,
            registry: self.registry,
            host: self.host,
            workdir,
            remote: &self.config.behavior.remote,
            timeout: self.config.behavior.timeout(),
        }
    }
}
