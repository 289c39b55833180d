use crate::config::ExecConfig;
use crate::context::ReleaseContext;
use crate::domain::Phase;
use crate::error::{ReleaseError, Result};
use crate::process::{run_with_timeout, shell};
use crate::steps::{Artifact, Collaborators, Completion};
use crate::template::Template;

/// Runs configured shell commands with the release exported in `RELEASE_*`
/// environment variables.
#[derive(Debug, Clone)]
pub struct ExecStep {
    verify: Option<Template>,
    prepare: Option<Template>,
    publish: Option<Template>,
}

impl ExecStep {
    pub fn new(config: &ExecConfig) -> Result<Self> {
        let parse = |cmd: &Option<String>| cmd.as_deref().map(Template::parse).transpose();
        let step = ExecStep {
            verify: parse(&config.verify)?,
            prepare: parse(&config.prepare)?,
            publish: parse(&config.publish)?,
        };
        if step.phases().is_empty() {
            return Err(ReleaseError::config(
                "exec step needs at least one of verify, prepare or publish",
            ));
        }
        Ok(step)
    }

    fn command(&self, phase: Phase) -> Option<&Template> {
        match phase {
            Phase::Verify => self.verify.as_ref(),
            Phase::Prepare => self.prepare.as_ref(),
            Phase::Publish => self.publish.as_ref(),
        }
    }

    /// Phases with a configured command
    pub fn phases(&self) -> Vec<Phase> {
        Phase::ALL
            .into_iter()
            .filter(|p| self.command(*p).is_some())
            .collect()
    }

    /// Execute the command of `phase`.
    ///
    /// Verify commands also run in a dry run; they must not change anything.
    /// Exit code 0 is success, anything else fails the step.
    pub fn run(&self, phase: Phase, ctx: &ReleaseContext, env: &Collaborators<'_>) -> Result<Completion> {
        let template = self
            .command(phase)
            .ok_or_else(|| ReleaseError::config(format!("exec step has no {} command", phase)))?;
        let script = template.render(ctx);

        if ctx.is_dry_run() && phase != Phase::Verify {
            return Ok(Completion::dry_run(format!("run `{}`", script), Vec::new()));
        }

        let mut cmd = shell(&script);
        cmd.current_dir(env.workdir);
        for (key, value) in ctx.to_env_vars() {
            cmd.env(key, value);
        }

        let output = run_with_timeout(cmd, env.timeout)?;
        if !output.success() {
            let code = output
                .code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(ReleaseError::command(format!(
                "`{}` exited with {}: {}",
                script,
                code,
                output.summary()
            )));
        }

        let stdout = output.stdout.trim();
        let artifacts = if stdout.is_empty() {
            Vec::new()
        } else {
            vec![Artifact::Output(stdout.to_string())]
        };
        Ok(Completion::done(artifacts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StepCommon;

    fn config(verify: Option<&str>, prepare: Option<&str>, publish: Option<&str>) -> ExecConfig {
        ExecConfig {
            common: StepCommon::default(),
            verify: verify.map(String::from),
            prepare: prepare.map(String::from),
            publish: publish.map(String::from),
        }
    }

    #[test]
    fn test_phases_follow_commands() {
        let step = ExecStep::new(&config(None, Some("echo {{version}}"), Some("true"))).unwrap();
        assert_eq!(step.phases(), vec![Phase::Prepare, Phase::Publish]);
    }

    #[test]
    fn test_requires_a_command() {
        assert!(ExecStep::new(&config(None, None, None)).is_err());
    }

    #[test]
    fn test_unknown_placeholder_rejected() {
        let err = ExecStep::new(&config(Some("echo {{nextRelease.version}}"), None, None)).unwrap_err();
        assert!(matches!(err, ReleaseError::Config(_)));
    }
}
