use crate::boundary::BoundaryWarning;
use crate::config::GitConfig;
use crate::context::ReleaseContext;
use crate::error::{ReleaseError, Result};
use crate::steps::{resolve_path, Artifact, Collaborators, Completion};
use crate::template::Template;
use std::path::PathBuf;

/// Commits release assets and records the release as an annotated tag.
///
/// The tag is the durable record of a release: the run counts as released
/// only once this step's publish phase succeeds.
#[derive(Debug, Clone)]
pub struct GitStep {
    assets: Vec<String>,
    message: Template,
    push: bool,
}

impl GitStep {
    pub fn new(config: &GitConfig) -> Result<Self> {
        Ok(GitStep {
            assets: config.assets.clone(),
            message: Template::parse(&config.message)?,
            push: config.push,
        })
    }

    pub fn verify(&self, ctx: &ReleaseContext, env: &Collaborators<'_>) -> Result<Completion> {
        if env.repo.tag_target(ctx.tag())?.is_some() {
            return Err(ReleaseError::config(format!("tag '{}' already exists", ctx.tag())));
        }

        let current = env.repo.current_branch()?;
        if current != ctx.branch() {
            return Err(ReleaseError::config(format!(
                "release branch '{}' is not checked out (HEAD is on '{}')",
                ctx.branch(),
                current
            )));
        }

        if self.push && env.repo.remote_url(env.remote)?.is_none() {
            return Err(ReleaseError::remote(format!(
                "No remote named '{}' found",
                env.remote
            )));
        }

        Ok(Completion::default())
    }

    /// Split configured assets into existing relative paths and warnings
    fn existing_assets(&self, env: &Collaborators<'_>) -> (Vec<PathBuf>, Vec<BoundaryWarning>) {
        let mut found = Vec::new();
        let mut warnings = Vec::new();
        for asset in &self.assets {
            if resolve_path(env.workdir, asset).exists() {
                found.push(PathBuf::from(asset));
            } else {
                log::warn!("Release asset {} not found, skipping", asset);
                warnings.push(BoundaryWarning::MissingAsset {
                    path: asset.clone(),
                });
            }
        }
        (found, warnings)
    }

    fn refspecs(&self, ctx: &ReleaseContext, committed: bool) -> Vec<String> {
        let mut refspecs = Vec::new();
        if committed {
            refspecs.push(format!("refs/heads/{}", ctx.branch()));
        }
        refspecs.push(format!("refs/tags/{}", ctx.tag()));
        refspecs
    }

    pub fn publish(&self, ctx: &ReleaseContext, env: &Collaborators<'_>) -> Result<Completion> {
        let (assets, warnings) = self.existing_assets(env);
        let message = self.message.render(ctx);

        if ctx.is_dry_run() {
            let would_commit = !assets.is_empty();
            let mut artifacts: Vec<Artifact> = assets.into_iter().map(Artifact::File).collect();
            artifacts.push(Artifact::Tag(ctx.tag().to_string()));
            if self.push {
                for spec in self.refspecs(ctx, would_commit) {
                    artifacts.push(Artifact::Pushed(format!("{} {}", env.remote, spec)));
                }
            }
            return Ok(Completion::dry_run(format!("tag {}", ctx.tag()), artifacts).with_warnings(warnings));
        }

        let mut artifacts = Vec::new();
        let committed = env.repo.commit_files(&assets, &message)?;
        if let Some(oid) = committed {
            log::info!("Committed release assets as {}", oid);
            artifacts.push(Artifact::Commit(oid.to_string()));
        }

        let target = env.repo.branch_head(ctx.branch())?;
        let tag_message = format!("Release {}\n\n{}", ctx.version(), ctx.notes());
        env.repo.create_tag(ctx.tag(), target, &tag_message)?;
        artifacts.push(Artifact::Tag(ctx.tag().to_string()));

        if self.push {
            let refspecs = self.refspecs(ctx, committed.is_some());
            if let Err(e) = env.repo.push(env.remote, &refspecs) {
                // An unpushed tag must not look like a release on the next run
                if let Err(cleanup) = env.repo.delete_tag(ctx.tag()) {
                    log::warn!("Failed to remove local tag {}: {}", ctx.tag(), cleanup);
                }
                return Err(e);
            }
            for spec in refspecs {
                artifacts.push(Artifact::Pushed(format!("{} {}", env.remote, spec)));
            }
        }

        Ok(Completion::done(artifacts).with_warnings(warnings))
    }
}
