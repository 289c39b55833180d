//! User interface module.
//!
//! - `formatter` builds the strings
//! - this module prints them, messages to stdout and problems to stderr

use crate::boundary::BoundaryWarning;
use crate::coordinator::RunReport;
use crate::domain::BranchRule;

pub mod formatter;

pub use formatter::{
    format_available_branches, format_commit_analysis, format_proposed_tag, format_run_log,
    format_summary,
};

pub fn display_error(message: &str) {
    eprintln!("{}", formatter::format_error(message));
}

pub fn display_status(message: &str) {
    println!("{}", formatter::format_status(message));
}

pub fn display_boundary_warning(warning: &BoundaryWarning) {
    eprintln!("{}", formatter::format_warning(warning));
}

pub fn display_available_branches(rules: &[BranchRule]) {
    print!("{}", format_available_branches(rules));
}

/// Print everything a run produced: analysis, proposed tag, run log,
/// warnings and the final summary line.
pub fn display_run_report(report: &RunReport) {
    if report.dry_run {
        display_status("Dry run: nothing will be written or published");
    }
    if let Some(channel) = &report.channel {
        display_status(&format!(
            "Branch '{}' releases on the {} channel",
            report.branch, channel
        ));
    }

    if let Some(classification) = &report.classification {
        println!();
        print!("{}", format_commit_analysis(classification, &report.branch));
    }
    if let Some(tag) = &report.tag {
        println!();
        print!("{}", format_proposed_tag(report.previous_tag.as_deref(), tag));
    }
    if report.tag.is_some() {
        println!();
        print!("{}", format_run_log(&report.log));
    }

    if !report.warnings.is_empty() {
        println!();
        for warning in &report.warnings {
            display_boundary_warning(warning);
        }
    }

    println!();
    if report.is_success() {
        println!("{}", format_summary(report));
    } else {
        eprintln!("{}", format_summary(report));
    }
}
