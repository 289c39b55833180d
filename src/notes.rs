//! Release notes rendered from a classified commit range.

use crate::analyzer::{Classification, ClassifiedCommit};
use crate::config::CommitTypesConfig;
use crate::domain::Version;
use chrono::NaiveDate;
use std::fmt::Write;

const BREAKING_HEADING: &str = "⚠ BREAKING CHANGES";
const FEATURES_HEADING: &str = "Features";
const FIXES_HEADING: &str = "Bug Fixes";

/// Header line of a version's notes, also used to find its changelog section
pub fn heading(version: &Version, date: NaiveDate) -> String {
    format!("## {} ({})", version, date.format("%Y-%m-%d"))
}

fn entry(commit: &ClassifiedCommit, text: &str) -> String {
    let scope = commit
        .parsed
        .as_ref()
        .and_then(|p| p.scope.as_deref())
        .filter(|s| !s.is_empty())
        .map(|s| format!("**{}:** ", s))
        .unwrap_or_default();
    format!("* {}{} ({})", scope, text, commit.commit.short_hash())
}

fn section(out: &mut String, title: &str, entries: &[String]) {
    if entries.is_empty() {
        return;
    }
    let _ = write!(out, "\n### {}\n\n", title);
    for e in entries {
        out.push_str(e);
        out.push('\n');
    }
}

/// Render markdown notes for a release.
///
/// Commits whose type is neither a feature nor a fix type only appear when
/// they carry a breaking change.
pub fn render(
    version: &Version,
    date: NaiveDate,
    classification: &Classification,
    types: &CommitTypesConfig,
) -> String {
    let mut breaking = Vec::new();
    let mut features = Vec::new();
    let mut fixes = Vec::new();

    for commit in &classification.commits {
        let Some(parsed) = &commit.parsed else {
            continue;
        };

        if parsed.is_breaking_change {
            let note = parsed
                .breaking_note
                .as_deref()
                .unwrap_or(parsed.description.as_str());
            breaking.push(entry(commit, note));
        }
        if types.feature_types.contains(&parsed.r#type) {
            features.push(entry(commit, &parsed.description));
        } else if types.fix_types.contains(&parsed.r#type) {
            fixes.push(entry(commit, &parsed.description));
        }
    }

    let mut out = heading(version, date);
    out.push('\n');
    section(&mut out, BREAKING_HEADING, &breaking);
    section(&mut out, FEATURES_HEADING, &features);
    section(&mut out, FIXES_HEADING, &fixes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::CommitClassifier;
    use crate::domain::{Commit, Core};

    fn classification(messages: &[&str]) -> Classification {
        let commits: Vec<Commit> = messages
            .iter()
            .enumerate()
            .map(|(i, m)| Commit {
                hash: format!("{:07x}{}", i + 0xabc0, "0".repeat(33)),
                message: m.to_string(),
                author: "a".to_string(),
                timestamp: 0,
                branch: "master".to_string(),
            })
            .collect();
        CommitClassifier::new(CommitTypesConfig::default()).classify(&commits)
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    #[test]
    fn test_sections() {
        let c = classification(&[
            "feat(api): add endpoint",
            "fix: handle empty body",
            "docs: readme",
            "feat!: drop v1\n\nBREAKING CHANGE: v1 routes removed",
        ]);
        let notes = render(&Version::stable(Core::new(2, 0, 0)), date(), &c, &CommitTypesConfig::default());

        assert!(notes.starts_with("## 2.0.0 (2024-05-17)\n"));
        assert!(notes.contains("### ⚠ BREAKING CHANGES\n\n* v1 routes removed (000abc3)"));
        assert!(notes.contains("### Features\n\n* **api:** add endpoint (000abc0)\n* drop v1 (000abc3)"));
        assert!(notes.contains("### Bug Fixes\n\n* handle empty body (000abc1)"));
        assert!(!notes.contains("readme"));
    }

    #[test]
    fn test_empty_sections_are_omitted() {
        let c = classification(&["fix: one"]);
        let notes = render(
            &Version::prerelease(Core::new(1, 2, 4), "dev", 1),
            date(),
            &c,
            &CommitTypesConfig::default(),
        );
        assert_eq!(notes, "## 1.2.4-dev.1 (2024-05-17)\n\n### Bug Fixes\n\n* one (000abc0)\n");
    }

    #[test]
    fn test_render_is_deterministic() {
        let c = classification(&["feat: x", "fix: y"]);
        let v = Version::stable(Core::new(1, 1, 0));
        let types = CommitTypesConfig::default();
        assert_eq!(render(&v, date(), &c, &types), render(&v, date(), &c, &types));
    }
}
