mod common;

use std::fs;

use common::*;
use git_release::domain::{Channel, Phase};
use git_release::error::ReleaseError;
use git_release::lock::ChannelLock;
use git_release::steps::{Artifact, Outcome};
use git_release::{Coordinator, RunState, SkipReason};
use tempfile::TempDir;

const CONTAINER_AND_DEFAULTS: &str = r#"
[[steps]]
kind = "changelog"

[[steps]]
kind = "container"
registry = "ghcr.io"
image = "acme/webhook"
tags = ["{{version}}", "{{#if channel}}{{major}}-{{channel}}{{else}}latest{{/if}}"]

[[steps]]
kind = "git"
"#;

#[test]
fn test_stable_fix_release() {
    let dir = TempDir::new().unwrap();
    let mut repo = released_repo(dir.path());
    repo.commit("master", "fix: x");

    let report = run(&default_config(), &repo, &FakeRegistry::default(), &FakeHost::default(), false).unwrap();

    assert_eq!(report.state, RunState::Succeeded);
    assert_eq!(report.version.as_ref().unwrap().to_string(), "1.2.4");
    assert_eq!(report.version.as_ref().unwrap().qualifier(), None);
    assert_eq!(report.released.as_ref().unwrap().to_string(), "1.2.4");
    assert_eq!(report.previous_tag.as_deref(), Some("v1.2.3"));
    assert!(repo.tag_names().contains(&"v1.2.4".to_string()));
    assert_eq!(
        repo.pushes(),
        vec![(
            "origin".to_string(),
            vec!["refs/heads/master".to_string(), "refs/tags/v1.2.4".to_string()]
        )]
    );

    let changelog = fs::read_to_string(dir.path().join("CHANGELOG.md")).unwrap();
    assert!(changelog.contains("## 1.2.4 (2026-10-17)"));
    assert!(changelog.contains("### Bug Fixes"));

    let commits = repo.release_commits();
    assert_eq!(commits.len(), 1);
    assert!(commits[0].0.starts_with("chore(release): 1.2.4 [skip ci]"));

    assert!(!ChannelLock::path_for(dir.path(), &Channel::Stable).exists());
}

#[test]
fn test_prerelease_feature_release() {
    let dir = TempDir::new().unwrap();
    let mut repo = released_repo(dir.path());
    repo.branch_from("dev", "master");
    repo.commit("dev", "feat: y");
    repo.checkout("dev");

    let report = run(&default_config(), &repo, &FakeRegistry::default(), &FakeHost::default(), false).unwrap();

    assert_eq!(report.state, RunState::Succeeded);
    assert_eq!(report.channel, Some(Channel::Prerelease("dev".to_string())));
    assert_eq!(report.tag.as_deref(), Some("v1.3.0-dev.1"));
    assert_eq!(report.released.unwrap().to_string(), "1.3.0-dev.1");
}

#[test]
fn test_fix_after_prerelease_advances_sequence() {
    let dir = TempDir::new().unwrap();
    let mut repo = released_repo(dir.path());
    repo.branch_from("dev", "master");
    let feat = repo.commit("dev", "feat: y");
    repo.add_tag("v1.3.0-dev.1", feat);
    repo.commit("dev", "fix: z");
    repo.checkout("dev");

    let report = run(&default_config(), &repo, &FakeRegistry::default(), &FakeHost::default(), false).unwrap();

    assert_eq!(report.previous_tag.as_deref(), Some("v1.3.0-dev.1"));
    assert_eq!(report.tag.as_deref(), Some("v1.3.0-dev.2"));
}

#[test]
fn test_repeated_runs_are_monotonic() {
    let dir = TempDir::new().unwrap();
    let config = default_config();
    let registry = FakeRegistry::default();
    let host = FakeHost::default();

    let mut repo = released_repo(dir.path());
    repo.branch_from("dev", "master");
    repo.checkout("dev");

    let mut released = Vec::new();
    for message in ["feat: y", "fix: z", "feat!: drop legacy api", "fix: w"] {
        repo.commit("dev", message);
        let report = run(&config, &repo, &registry, &host, false).unwrap();
        assert_eq!(report.state, RunState::Succeeded, "{}", message);
        released.push(report.released.unwrap());
    }

    let names: Vec<String> = released.iter().map(|v| v.to_string()).collect();
    assert_eq!(
        names,
        vec!["1.3.0-dev.1", "1.3.0-dev.2", "2.0.0-dev.1", "2.0.0-dev.2"]
    );
    for pair in released.windows(2) {
        assert!(pair[1] > pair[0]);
    }
}

#[test]
fn test_container_tags_on_prerelease_channel() {
    let dir = TempDir::new().unwrap();
    let mut repo = released_repo(dir.path());
    repo.branch_from("dev", "master");
    repo.commit("dev", "feat: y");
    repo.checkout("dev");
    let registry = FakeRegistry::default();

    let report = run(&compile(CONTAINER_AND_DEFAULTS), &repo, &registry, &FakeHost::default(), false).unwrap();

    assert_eq!(report.state, RunState::Succeeded);
    assert_eq!(
        registry.calls.borrow().clone(),
        vec![
            "inspect acme/webhook:latest",
            "tag acme/webhook:latest ghcr.io/acme/webhook:1.3.0-dev.1",
            "tag acme/webhook:latest ghcr.io/acme/webhook:1-dev",
            "push ghcr.io/acme/webhook:1.3.0-dev.1",
            "push ghcr.io/acme/webhook:1-dev",
        ]
    );
}

#[test]
fn test_publish_failure_after_tag_keeps_release() {
    let dir = TempDir::new().unwrap();
    let mut repo = released_repo(dir.path());
    repo.commit("master", "fix: x");
    let config = compile(
        r#"
[[steps]]
kind = "changelog"

[[steps]]
kind = "git"

[[steps]]
kind = "exec"
name = "notify"
publish = "exit 3"
"#,
    );

    let report = run(&config, &repo, &FakeRegistry::default(), &FakeHost::default(), false).unwrap();

    assert_eq!(report.state, RunState::Failed);
    assert!(!report.is_success());
    assert_eq!(report.released.unwrap().to_string(), "1.2.4");
    assert!(repo.tag_names().contains(&"v1.2.4".to_string()));
    match report.failure {
        Some(ReleaseError::StepExecution { step, phase, .. }) => {
            assert_eq!(step, "notify");
            assert_eq!(phase, Phase::Publish);
        }
        other => panic!("unexpected failure: {:?}", other),
    }

    let last = report.log.last().unwrap();
    assert_eq!(last.step, "notify");
    assert!(matches!(last.outcome, Outcome::Failed(_)));
}

#[test]
fn test_step_failure_halts_remaining_steps() {
    let dir = TempDir::new().unwrap();
    let mut repo = released_repo(dir.path());
    repo.commit("master", "fix: x");
    let config = compile(
        r#"
[[steps]]
kind = "exec"
name = "build"
prepare = "exit 1"

[[steps]]
kind = "changelog"

[[steps]]
kind = "git"
"#,
    );

    let report = run(&config, &repo, &FakeRegistry::default(), &FakeHost::default(), false).unwrap();

    assert_eq!(report.state, RunState::Failed);
    assert_eq!(report.released, None);
    assert_eq!(repo.write_count(), 0);
    assert!(!dir.path().join("CHANGELOG.md").exists());

    let attempted: Vec<(String, Phase)> = report
        .log
        .iter()
        .map(|r| (r.step.clone(), r.phase))
        .collect();
    assert_eq!(
        attempted,
        vec![
            ("git".to_string(), Phase::Verify),
            ("build".to_string(), Phase::Prepare),
        ]
    );
}

#[test]
fn test_phase_barrier_orders_log() {
    let dir = TempDir::new().unwrap();
    let mut repo = released_repo(dir.path());
    repo.commit("master", "feat: z");
    let config = compile(
        r#"
[[steps]]
kind = "changelog"

[[steps]]
kind = "git"

[[steps]]
kind = "hosted_release"

[[steps]]
kind = "exec"
verify = "true"
prepare = "printf %s {{version}} > VERSION"
"#,
    );
    let host = FakeHost::default();

    let report = run(&config, &repo, &FakeRegistry::default(), &host, false).unwrap();

    assert_eq!(report.state, RunState::Succeeded);
    let phases: Vec<Phase> = report.log.iter().map(|r| r.phase).collect();
    assert!(phases.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(
        fs::read_to_string(dir.path().join("VERSION")).unwrap(),
        "1.3.0"
    );

    assert_eq!(host.access_checks.borrow().clone(), vec!["acme/webhook"]);
    let releases = host.releases.borrow();
    assert_eq!(releases.len(), 1);
    assert_eq!(releases[0].1.tag_name, "v1.3.0");
    assert!(!releases[0].1.prerelease);
    assert!(releases[0].1.body.contains("### Features"));
}

#[test]
fn test_dry_run_matches_real_run_without_writes() {
    let config = compile(CONTAINER_AND_DEFAULTS);

    let build = |root: &std::path::Path| {
        let mut repo = released_repo(root);
        repo.commit("master", "feat: add webhook retries");
        repo.commit("master", "fix(api): handle empty payloads");
        repo
    };

    let dry_dir = TempDir::new().unwrap();
    let dry_repo = build(dry_dir.path());
    let dry_registry = FakeRegistry::default();
    let dry = run(&config, &dry_repo, &dry_registry, &FakeHost::default(), true).unwrap();

    let real_dir = TempDir::new().unwrap();
    let real_repo = build(real_dir.path());
    let real = run(&config, &real_repo, &FakeRegistry::default(), &FakeHost::default(), false).unwrap();

    assert_eq!(dry.state, RunState::Succeeded);
    assert_eq!(dry.version, real.version);
    assert_eq!(dry.tag, real.tag);
    assert_eq!(dry.notes, real.notes);
    assert_eq!(dry.released, None);

    assert_eq!(dry_repo.write_count(), 0);
    assert_eq!(dry_repo.tag_names(), vec!["v1.2.3"]);
    assert!(!dry_dir.path().join("CHANGELOG.md").exists());
    assert_eq!(
        dry_registry.calls.borrow().clone(),
        vec!["inspect acme/webhook:latest"]
    );

    let images = |report: &git_release::RunReport| -> Vec<Artifact> {
        report
            .log
            .iter()
            .filter(|r| r.kind == "container" && r.phase == Phase::Publish)
            .flat_map(|r| r.artifacts.clone())
            .collect()
    };
    assert_eq!(images(&dry), images(&real));
    assert_eq!(
        images(&dry),
        vec![
            Artifact::Image("ghcr.io/acme/webhook:1.3.0".to_string()),
            Artifact::Image("ghcr.io/acme/webhook:latest".to_string()),
        ]
    );

    for entry in dry.log.iter().filter(|r| r.phase != Phase::Verify) {
        match &entry.outcome {
            Outcome::Skipped(reason) => assert!(reason.starts_with("dry run: would")),
            other => panic!("{} {} ran in a dry run: {:?}", entry.step, entry.phase, other),
        }
    }
}

#[test]
fn test_non_releasable_commits_skip_without_steps() {
    let dir = TempDir::new().unwrap();
    let mut repo = released_repo(dir.path());
    repo.commit("master", "docs: explain retries");
    repo.commit("master", "chore: bump dependencies");
    repo.commit("master", "not a conventional commit");
    let registry = FakeRegistry::default();

    let report = run(&compile(CONTAINER_AND_DEFAULTS), &repo, &registry, &FakeHost::default(), false).unwrap();

    assert_eq!(report.state, RunState::Skipped);
    assert!(report.is_success());
    assert_eq!(report.skip_reason, Some(SkipReason::NoReleasableCommits));
    assert_eq!(report.classification.unwrap().delta.other, 3);
    assert!(report.log.is_empty());
    assert!(registry.calls.borrow().is_empty());
    assert_eq!(repo.write_count(), 0);
}

#[test]
fn test_no_new_commits_warns() {
    let dir = TempDir::new().unwrap();
    let repo = released_repo(dir.path());

    let report = run(&default_config(), &repo, &FakeRegistry::default(), &FakeHost::default(), false).unwrap();

    assert_eq!(report.skip_reason, Some(SkipReason::NoNewCommits));
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].to_string().contains("v1.2.3"));
}

#[test]
fn test_ineligible_branch_is_skipped() {
    let dir = TempDir::new().unwrap();
    let mut repo = released_repo(dir.path());
    repo.branch_from("feature/retries", "master");
    repo.commit("feature/retries", "feat: retries");
    repo.checkout("feature/retries");

    let report = run(&default_config(), &repo, &FakeRegistry::default(), &FakeHost::default(), false).unwrap();

    assert_eq!(report.state, RunState::Skipped);
    assert_eq!(report.skip_reason, Some(SkipReason::IneligibleBranch));
    assert_eq!(report.channel, None);
    assert_eq!(repo.write_count(), 0);
}

#[test]
fn test_cancel_before_publish() {
    let dir = TempDir::new().unwrap();
    let mut repo = released_repo(dir.path());
    repo.commit("master", "fix: x");
    let config = compile(CONTAINER_AND_DEFAULTS);
    let registry = FakeRegistry::default();
    let host = FakeHost::default();

    let mut coordinator = Coordinator::new(&config, &repo, &registry, &host);
    *registry.cancel_on_verify.borrow_mut() = Some(coordinator.cancel_handle());
    let report = coordinator.run(&options(false)).unwrap();

    assert_eq!(report.state, RunState::Failed);
    assert!(matches!(report.failure, Some(ReleaseError::Cancelled(_))));
    assert_eq!(registry.cancel_results.borrow().clone(), vec![true]);
    assert_eq!(report.log.len(), 1);
    assert_eq!(repo.write_count(), 0);
    assert!(!dir.path().join("CHANGELOG.md").exists());
}

#[test]
fn test_cancel_refused_during_publish() {
    let dir = TempDir::new().unwrap();
    let mut repo = released_repo(dir.path());
    repo.commit("master", "fix: x");
    let config = compile(CONTAINER_AND_DEFAULTS);
    let registry = FakeRegistry::default();
    let host = FakeHost::default();

    let mut coordinator = Coordinator::new(&config, &repo, &registry, &host);
    *registry.cancel_on_push.borrow_mut() = Some(coordinator.cancel_handle());
    let report = coordinator.run(&options(false)).unwrap();

    assert_eq!(report.state, RunState::Succeeded);
    assert_eq!(coordinator.state(), RunState::Succeeded);
    assert!(registry.cancel_results.borrow().iter().all(|accepted| !accepted));
    assert_eq!(report.released.unwrap().to_string(), "1.2.4");
}

#[test]
fn test_push_failure_removes_local_tag() {
    let dir = TempDir::new().unwrap();
    let mut repo = released_repo(dir.path());
    repo.commit("master", "fix: x");
    repo.fail_push(true);

    let report = run(&default_config(), &repo, &FakeRegistry::default(), &FakeHost::default(), false).unwrap();

    assert_eq!(report.state, RunState::Failed);
    assert_eq!(report.released, None);
    assert_eq!(repo.tag_names(), vec!["v1.2.3"]);
    assert!(matches!(
        report.failure,
        Some(ReleaseError::StepExecution { ref step, .. }) if step == "git"
    ));
}

#[test]
fn test_verify_failure_prevents_writes() {
    let dir = TempDir::new().unwrap();
    let mut repo = released_repo(dir.path());
    repo.commit("master", "fix: x");
    let registry = FakeRegistry {
        missing_source: true,
        ..FakeRegistry::default()
    };

    let report = run(&compile(CONTAINER_AND_DEFAULTS), &repo, &registry, &FakeHost::default(), false).unwrap();

    assert_eq!(report.state, RunState::Failed);
    assert_eq!(repo.write_count(), 0);
    assert_eq!(registry.calls.borrow().len(), 1);
}

#[test]
fn test_channel_lock_contention() {
    let dir = TempDir::new().unwrap();
    let mut repo = released_repo(dir.path());
    repo.commit("master", "fix: x");
    let _held = ChannelLock::acquire(dir.path(), &Channel::Stable).unwrap();

    let err = run(&default_config(), &repo, &FakeRegistry::default(), &FakeHost::default(), false).unwrap_err();

    assert!(matches!(err, ReleaseError::Locked(_)));
    assert_eq!(repo.write_count(), 0);

    // Dry runs do not take the lock
    let dry = run(&default_config(), &repo, &FakeRegistry::default(), &FakeHost::default(), true).unwrap();
    assert_eq!(dry.state, RunState::Succeeded);
}

#[test]
fn test_explicit_branch_must_be_checked_out_to_publish() {
    let dir = TempDir::new().unwrap();
    let mut repo = released_repo(dir.path());
    repo.branch_from("dev", "master");
    repo.commit("dev", "feat: y");
    let config = default_config();
    let registry = FakeRegistry::default();
    let host = FakeHost::default();

    let mut options = options(false);
    options.branch = Some("dev".to_string());
    let report = Coordinator::new(&config, &repo, &registry, &host)
        .run(&options)
        .unwrap();

    assert_eq!(report.tag.as_deref(), Some("v1.3.0-dev.1"));
    assert_eq!(report.state, RunState::Failed);
    assert_eq!(report.log.len(), 1);
    assert_eq!(repo.write_count(), 0);
}
