//! Pure formatting functions for UI output.
//!
//! Everything here builds strings; printing happens in the parent module.

use crate::analyzer::{Classification, CommitKind};
use crate::boundary::BoundaryWarning;
use crate::coordinator::{RunReport, RunState};
use crate::domain::BranchRule;
use crate::steps::{Outcome, StepResult};
use console::style;

const MAX_LISTED_COMMITS: usize = 10;
const MAX_SUBJECT_LEN: usize = 60;

pub fn format_error(message: &str) -> String {
    format!("{} {}", style("ERROR:").red().bold(), message)
}

pub fn format_success(message: &str) -> String {
    format!("{} {}", style("✓").green(), message)
}

pub fn format_status(message: &str) -> String {
    format!("{} {}", style("→").yellow(), message)
}

pub fn format_warning(warning: &BoundaryWarning) -> String {
    format!("{} {}", style("⚠ WARNING:").yellow(), warning)
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn kind_label(kind: CommitKind) -> String {
    match kind {
        CommitKind::Breaking => style("breaking").red().to_string(),
        CommitKind::Feature => style("feature").green().to_string(),
        CommitKind::Fix => style("fix").cyan().to_string(),
        CommitKind::Other => style("other").dim().to_string(),
    }
}

/// Branch header plus up to ten classified commits, newest first
pub fn format_commit_analysis(classification: &Classification, branch: &str) -> String {
    let commits = &classification.commits;
    let mut out = format!(
        "{}\n",
        style(format!("Analyzing commits on branch '{}'", branch)).bold()
    );
    out.push_str(&format!(
        "{}\n",
        style(format!("{} commits:", commits.len())).underlined()
    ));

    for (i, entry) in commits.iter().rev().take(MAX_LISTED_COMMITS).enumerate() {
        out.push_str(&format!(
            "  {}. [{}] {} {}\n",
            i + 1,
            kind_label(entry.kind),
            style(entry.commit.short_hash()).dim(),
            truncate(entry.commit.subject(), MAX_SUBJECT_LEN)
        ));
    }
    if commits.len() > MAX_LISTED_COMMITS {
        out.push_str(&format!(
            "  ... and {} more commits\n",
            commits.len() - MAX_LISTED_COMMITS
        ));
    }

    let delta = &classification.delta;
    out.push_str(&format!(
        "  breaking: {}, features: {}, fixes: {}, other: {}\n",
        if delta.breaking { "yes" } else { "no" },
        delta.features,
        delta.fixes,
        delta.other
    ));
    out
}

/// Shows "From -> To", or the initial tag when nothing was released yet
pub fn format_proposed_tag(old_tag: Option<&str>, new_tag: &str) -> String {
    match old_tag {
        Some(old) => format!(
            "{}\n  From: {}\n  To:   {}\n",
            style("Proposed Tag Change:").bold(),
            style(old).red(),
            style(new_tag).green()
        ),
        None => format!(
            "{}\n  New tag: {}\n",
            style("Initial Tag:").bold(),
            style(new_tag).green()
        ),
    }
}

fn outcome_label(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Ok => style("ok").green().to_string(),
        Outcome::Skipped(reason) => style(format!("skipped ({})", reason)).yellow().to_string(),
        Outcome::Failed(reason) => style(format!("failed: {}", reason)).red().to_string(),
    }
}

/// One line per step invocation with its artifacts indented beneath
pub fn format_run_log(log: &[StepResult]) -> String {
    let mut out = format!("{}\n", style("Run log:").bold());
    if log.is_empty() {
        out.push_str("  (no steps ran)\n");
        return out;
    }
    for entry in log {
        out.push_str(&format!(
            "  {:<8} {} ({}): {}\n",
            entry.phase,
            entry.step,
            entry.kind,
            outcome_label(&entry.outcome)
        ));
        for artifact in &entry.artifacts {
            out.push_str(&format!("           - {}\n", artifact));
        }
    }
    out
}

/// Final one-line summary of a run
pub fn format_summary(report: &RunReport) -> String {
    let tag = report.tag.as_deref().unwrap_or("-");
    match report.state {
        RunState::Skipped => {
            let reason = report
                .skip_reason
                .map(|r| r.to_string())
                .unwrap_or_else(|| "no release needed".to_string());
            format_status(&format!("No release for branch '{}': {}", report.branch, reason))
        }
        RunState::Succeeded if report.dry_run => format_success(&format!(
            "Dry run complete: {} would be released from branch '{}'",
            tag, report.branch
        )),
        RunState::Succeeded => format_success(&format!(
            "Released {} from branch '{}'",
            tag, report.branch
        )),
        _ => {
            let mut msg = match &report.failure {
                Some(e) => format!("Release {} failed: {}", tag, e),
                None => format!("Release {} failed", tag),
            };
            if let Some(version) = &report.released {
                msg.push_str(&format!(
                    " (version {} was already published and stays released)",
                    version
                ));
            }
            format_error(&msg)
        }
    }
}

/// Configured branches and the channel each one releases on
pub fn format_available_branches(rules: &[BranchRule]) -> String {
    let mut out = format!("{}\n", style("Configured branches:").bold());
    for rule in rules {
        out.push_str(&format!("  - {} ({})\n", rule.branch, rule.channel));
    }
    out
}
