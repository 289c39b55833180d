use git_release::analyzer::TagHistory;
use git_release::boundary::BoundaryWarning;
use git_release::domain::{Channel, TagPattern};
use git_release::ui::formatter;

// ============================================================================
// BoundaryWarning Display Tests
// ============================================================================

#[test]
fn test_boundary_warning_no_new_commits_display() {
    let warning = BoundaryWarning::NoNewCommits {
        latest_tag: "v1.0.0".to_string(),
        current_commit_hash: "abc1234def5678".to_string(),
    };

    let display_msg = warning.to_string();
    assert!(
        display_msg.contains("No new commits"),
        "Message should contain 'No new commits', got: {}",
        display_msg
    );
    assert!(
        display_msg.contains("v1.0.0"),
        "Message should contain tag 'v1.0.0', got: {}",
        display_msg
    );
    assert!(
        display_msg.contains("abc1234") && !display_msg.contains("abc1234d"),
        "Message should contain shortened commit hash 'abc1234', got: {}",
        display_msg
    );
}

#[test]
fn test_boundary_warning_unparsable_tag_display() {
    let warning = BoundaryWarning::UnparsableTag {
        tag: "v1.2.3-rc".to_string(),
        reason: "Invalid format".to_string(),
    };

    let display_msg = warning.to_string();
    assert!(display_msg.contains("Ignoring tag 'v1.2.3-rc'"), "got: {}", display_msg);
    assert!(display_msg.contains("Invalid format"), "got: {}", display_msg);
}

#[test]
fn test_boundary_warning_formatted_for_terminal() {
    let warning = BoundaryWarning::MissingAsset {
        path: "dist/webhook.tar.gz".to_string(),
    };
    let line = console::strip_ansi_codes(&formatter::format_warning(&warning)).into_owned();
    assert!(line.starts_with("⚠ WARNING:"));
    assert!(line.contains("dist/webhook.tar.gz"));
}

// ============================================================================
// Tag history boundaries
// ============================================================================

fn history(tags: &[&str]) -> TagHistory {
    let pattern = TagPattern::new("v{{version}}").unwrap();
    TagHistory::from_tags(tags.iter().map(|t| t.to_string()), &pattern)
}

#[test]
fn test_tags_outside_pattern_are_ignored_silently() {
    let history = history(&["release-1.0.0", "latest", "v1.0.0"]);
    assert_eq!(history.tags().len(), 1);
    assert!(history.warnings().is_empty());
}

#[test]
fn test_unusable_matching_tags_warn() {
    let history = history(&["v1.0.0", "v1.1.0-rc", "v1.2.0+build.5"]);
    assert_eq!(history.tags().len(), 1);

    let warned: Vec<String> = history
        .warnings()
        .iter()
        .map(|w| match w {
            BoundaryWarning::UnparsableTag { tag, .. } => tag.clone(),
            other => panic!("unexpected warning {:?}", other),
        })
        .collect();
    assert_eq!(warned, vec!["v1.1.0-rc", "v1.2.0+build.5"]);
}

#[test]
fn test_stable_tags_bound_every_channel() {
    let history = history(&["v1.2.3", "v1.3.0-dev.1", "v1.3.0-beta.1"]);
    let dev = Channel::Prerelease("dev".to_string());

    assert!(history.is_boundary(&Channel::Stable, "v1.2.3"));
    assert!(history.is_boundary(&dev, "v1.2.3"));
    assert!(history.is_boundary(&dev, "v1.3.0-dev.1"));
    assert!(!history.is_boundary(&dev, "v1.3.0-beta.1"));
    assert!(!history.is_boundary(&Channel::Stable, "v1.3.0-dev.1"));
    assert!(!history.is_boundary(&Channel::Stable, "v9.9.9"));
}

#[test]
fn test_custom_tag_format_boundaries() {
    let pattern = TagPattern::new("webhook-{{version}}-final").unwrap();
    let history = TagHistory::from_tags(
        ["webhook-1.0.0-final", "webhook-1.0.0", "v2.0.0"]
            .iter()
            .map(|t| t.to_string()),
        &pattern,
    );
    assert_eq!(history.tags().len(), 1);
    assert_eq!(history.highest_stable().unwrap().name, "webhook-1.0.0-final");
}
