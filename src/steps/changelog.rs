use crate::config::ChangelogConfig;
use crate::context::ReleaseContext;
use crate::error::Result;
use crate::steps::{resolve_path, Artifact, Collaborators, Completion};
use std::fs;

/// Writes the release notes into a changelog file, newest release first
#[derive(Debug, Clone)]
pub struct ChangelogStep {
    path: String,
    title: Option<String>,
}

impl ChangelogStep {
    pub fn new(config: &ChangelogConfig) -> Self {
        ChangelogStep {
            path: config.path.clone(),
            title: config.title.clone(),
        }
    }

    pub fn prepare(&self, ctx: &ReleaseContext, env: &Collaborators<'_>) -> Result<Completion> {
        let path = resolve_path(env.workdir, &self.path);
        let existing = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let version_heading = format!("## {}", ctx.version());
        let updated = update(&existing, self.title.as_deref(), &version_heading, ctx.notes());
        let artifacts = vec![Artifact::File(path.clone())];

        if ctx.is_dry_run() {
            return Ok(Completion::dry_run(format!("write {}", self.path), artifacts));
        }
        if updated == existing {
            log::debug!("{} already up to date", path.display());
            return Ok(Completion::done(artifacts));
        }

        fs::write(&path, updated)?;
        log::info!("Updated {}", path.display());
        Ok(Completion::done(artifacts))
    }
}

/// Whether a section heading belongs to the release whose heading starts
/// with `version_heading`, e.g. `## 1.2.4 (2024-05-17)` for `## 1.2.4`.
fn is_heading_of(line: &str, version_heading: &str) -> bool {
    match line.strip_prefix(version_heading) {
        Some(rest) => rest.is_empty() || rest.starts_with(' '),
        None => false,
    }
}

/// Insert `notes` as the newest section, replacing an existing section for
/// the same version so repeated runs produce the same file.
pub(crate) fn update(existing: &str, title: Option<&str>, version_heading: &str, notes: &str) -> String {
    let mut body = existing;
    if let Some(title) = title {
        body = body.trim_start().strip_prefix(title).unwrap_or(body);
    }
    let body = body.trim_start_matches('\n');

    // Split into sections at every release heading
    let mut sections: Vec<String> = Vec::new();
    let mut preamble = String::new();
    for line in body.lines() {
        if line.starts_with("## ") {
            sections.push(String::new());
        }
        let target = sections.last_mut().unwrap_or(&mut preamble);
        target.push_str(line);
        target.push('\n');
    }

    sections.retain(|s| !is_heading_of(s.lines().next().unwrap_or(""), version_heading));

    let mut out = String::new();
    if let Some(title) = title {
        out.push_str(title.trim_end());
        out.push_str("\n\n");
    }
    if !preamble.trim().is_empty() {
        out.push_str(preamble.trim_end());
        out.push_str("\n\n");
    }
    out.push_str(notes.trim_end());
    out.push('\n');
    for section in sections {
        out.push('\n');
        out.push_str(section.trim_end());
        out.push('\n');
    }
    out
}
