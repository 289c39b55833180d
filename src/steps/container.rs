use crate::config::ContainerConfig;
use crate::context::ReleaseContext;
use crate::error::{ReleaseError, Result};
use crate::process::run_with_timeout;
use crate::steps::{Artifact, Collaborators, Completion};
use crate::template::{parse_all, render_all, Template};
use regex::Regex;
use std::process::Command;
use std::sync::LazyLock;
use std::time::Duration;

static DOCKER_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}$").expect("docker tag pattern is valid")
});

/// Container registry operations on previously built images
pub trait ContainerRegistry {
    fn image_exists(&self, reference: &str) -> Result<bool>;

    /// Associate `target` with the image `source`
    fn tag(&self, source: &str, target: &str) -> Result<()>;

    fn push(&self, target: &str) -> Result<()>;
}

/// Registry access through the `docker` command line
pub struct DockerCli {
    program: String,
    timeout: Duration,
}

impl DockerCli {
    pub fn new(timeout: Duration) -> Self {
        DockerCli {
            program: "docker".to_string(),
            timeout,
        }
    }

    fn docker(&self, args: &[&str]) -> Result<crate::process::CommandOutput> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        run_with_timeout(cmd, self.timeout)
    }

    fn checked(&self, args: &[&str]) -> Result<()> {
        let output = self.docker(args)?;
        if output.success() {
            Ok(())
        } else {
            Err(ReleaseError::command(format!(
                "docker {} failed: {}",
                args.join(" "),
                output.summary()
            )))
        }
    }
}

impl ContainerRegistry for DockerCli {
    fn image_exists(&self, reference: &str) -> Result<bool> {
        Ok(self.docker(&["image", "inspect", reference])?.success())
    }

    fn tag(&self, source: &str, target: &str) -> Result<()> {
        self.checked(&["tag", source, target])
    }

    fn push(&self, target: &str) -> Result<()> {
        self.checked(&["push", target])
    }
}

/// Tags a previously built image with rendered tags and pushes them
#[derive(Debug, Clone)]
pub struct ContainerStep {
    registry: String,
    image: String,
    source: String,
    tags: Vec<Template>,
}

impl ContainerStep {
    pub fn new(config: &ContainerConfig) -> Result<Self> {
        if config.registry.trim().is_empty() || config.image.trim().is_empty() {
            return Err(ReleaseError::config(
                "container step needs a registry and an image",
            ));
        }
        if config.tags.is_empty() {
            return Err(ReleaseError::config("container step needs at least one tag"));
        }
        Ok(ContainerStep {
            registry: config.registry.trim_end_matches('/').to_string(),
            image: config.image.clone(),
            source: config.source_image(),
            tags: parse_all(&config.tags)?,
        })
    }

    /// Rendered tags in declaration order, duplicates removed
    pub fn render_tags(&self, ctx: &ReleaseContext) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        for tag in render_all(&self.tags, ctx) {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        tags
    }

    /// Fully qualified references, e.g. `ghcr.io/owner/app:1.3.0-dev.1`
    pub fn targets(&self, ctx: &ReleaseContext) -> Vec<String> {
        self.render_tags(ctx)
            .into_iter()
            .map(|tag| format!("{}/{}:{}", self.registry, self.image, tag))
            .collect()
    }

    fn artifacts(&self, ctx: &ReleaseContext) -> Vec<Artifact> {
        self.targets(ctx).into_iter().map(Artifact::Image).collect()
    }

    pub fn verify(&self, ctx: &ReleaseContext, env: &Collaborators<'_>) -> Result<Completion> {
        for tag in self.render_tags(ctx) {
            if !DOCKER_TAG.is_match(&tag) {
                return Err(ReleaseError::config(format!(
                    "rendered image tag '{}' is not a valid tag",
                    tag
                )));
            }
        }
        if !env.registry.image_exists(&self.source)? {
            return Err(ReleaseError::command(format!(
                "source image '{}' not found",
                self.source
            )));
        }
        Ok(Completion::done(self.artifacts(ctx)))
    }

    pub fn prepare(&self, ctx: &ReleaseContext, env: &Collaborators<'_>) -> Result<Completion> {
        let targets = self.targets(ctx);
        if ctx.is_dry_run() {
            return Ok(Completion::dry_run(
                format!("tag {} as {} references", self.source, targets.len()),
                self.artifacts(ctx),
            ));
        }
        for target in &targets {
            env.registry.tag(&self.source, target)?;
        }
        Ok(Completion::done(self.artifacts(ctx)))
    }

    pub fn publish(&self, ctx: &ReleaseContext, env: &Collaborators<'_>) -> Result<Completion> {
        let targets = self.targets(ctx);
        if ctx.is_dry_run() {
            return Ok(Completion::dry_run(
                format!("push {} references", targets.len()),
                self.artifacts(ctx),
            ));
        }
        for target in &targets {
            log::info!("Pushing {}", target);
            env.registry.push(target)?;
        }
        Ok(Completion::done(self.artifacts(ctx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StepCommon;
    use crate::context::tests::dev_context;

    fn step(tags: &[&str]) -> ContainerStep {
        ContainerStep::new(&ContainerConfig {
            common: StepCommon::default(),
            registry: "ghcr.io/".to_string(),
            image: "acme/webhook".to_string(),
            source: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        })
        .unwrap()
    }

    #[test]
    fn test_targets() {
        let s = step(&["{{version}}", "{{major}}-{{channel}}"]);
        assert_eq!(
            s.targets(&dev_context()),
            vec![
                "ghcr.io/acme/webhook:1.3.0-dev.1",
                "ghcr.io/acme/webhook:1-dev"
            ]
        );
        assert_eq!(s.source, "acme/webhook:latest");
    }

    #[test]
    fn test_duplicates_collapse_in_order() {
        let s = step(&["{{channel}}", "{{version}}", "dev"]);
        assert_eq!(s.render_tags(&dev_context()), vec!["dev", "1.3.0-dev.1"]);
    }

    #[test]
    fn test_docker_tag_validity() {
        assert!(DOCKER_TAG.is_match("1.3.0-dev.1"));
        assert!(DOCKER_TAG.is_match("latest"));
        assert!(!DOCKER_TAG.is_match(""));
        assert!(!DOCKER_TAG.is_match("-dev"));
        assert!(!DOCKER_TAG.is_match("a/b"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = ContainerConfig {
            common: StepCommon::default(),
            registry: "ghcr.io".to_string(),
            image: "acme/webhook".to_string(),
            source: None,
            tags: vec![],
        };
        assert!(ContainerStep::new(&config).is_err());
        config.tags = vec!["{{unknown}}".to_string()];
        assert!(ContainerStep::new(&config).is_err());
    }
}
