//! Ordered step execution with a phase barrier.
//!
//! Every step's verify phase runs before any prepare phase, and every
//! prepare phase before any publish phase. Within a phase, steps run in
//! declaration order on the calling thread. The first failure halts the run.

use crate::boundary::BoundaryWarning;
use crate::config::StepConfig;
use crate::context::ReleaseContext;
use crate::domain::Phase;
use crate::error::{ReleaseError, Result};
use crate::steps::{Collaborators, Outcome, Step, StepResult};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const RUNNING: u8 = 0;
const CANCEL_REQUESTED: u8 = 1;
const PUBLISHING: u8 = 2;

/// Requests cancellation of a run from another thread.
///
/// Cancellation is honoured before the publish phase starts. Once any
/// publish action may have run, it is refused.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    state: Arc<AtomicU8>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the publish phase has already started
    pub fn cancel(&self) -> bool {
        match self
            .state
            .compare_exchange(RUNNING, CANCEL_REQUESTED, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => {
                log::info!("Cancellation requested");
                true
            }
            Err(CANCEL_REQUESTED) => true,
            Err(_) => {
                log::warn!("Cancellation refused: publish phase already started");
                false
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::SeqCst) == CANCEL_REQUESTED
    }

    /// Enter the publish phase; fails if cancellation won the race
    fn begin_publish(&self) -> bool {
        self.state
            .compare_exchange(RUNNING, PUBLISHING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

/// A step with its display name and the phases it runs
#[derive(Debug, Clone)]
pub struct PipelineStep {
    pub name: String,
    pub phases: Vec<Phase>,
    pub step: Step,
}

/// Result of executing the pipeline
#[derive(Debug, Default)]
pub struct PipelineRun {
    /// Every invocation attempted, in order
    pub log: Vec<StepResult>,
    pub warnings: Vec<BoundaryWarning>,
    /// Set when a step failed or the run was cancelled
    pub error: Option<ReleaseError>,
}

impl PipelineRun {
    /// Whether a step of `kind` completed its publish phase
    pub fn published(&self, kind: &str) -> bool {
        self.log
            .iter()
            .any(|r| r.kind == kind && r.phase == Phase::Publish && r.outcome == Outcome::Ok)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    steps: Vec<PipelineStep>,
}

impl Pipeline {
    /// Build and validate the pipeline from step declarations.
    ///
    /// Step names must be unique, every key must be known to the step kind,
    /// declared phases must be supported by the step kind, and a hosted
    /// release needs an earlier git step to create the tag it refers to.
    pub fn compile(configs: &[StepConfig]) -> Result<Self> {
        let mut names = HashSet::new();
        let mut steps = Vec::with_capacity(configs.len());
        let mut has_git = false;

        for config in configs {
            let name = config.name();
            if !names.insert(name.clone()) {
                return Err(ReleaseError::config(format!("duplicate step name '{}'", name)));
            }

            if let Some(key) = config.common().unknown.keys().next() {
                return Err(ReleaseError::config(format!(
                    "step '{}' ({}) has unknown key '{}'",
                    name,
                    config.kind(),
                    key
                )));
            }

            let step = Step::from_config(config)
                .map_err(|e| ReleaseError::config(format!("step '{}': {}", name, strip_config(e))))?;
            let capabilities = step.capabilities();

            let phases = match &config.common().phases {
                None => capabilities,
                Some(declared) => {
                    if declared.is_empty() {
                        return Err(ReleaseError::config(format!(
                            "step '{}' declares no phases",
                            name
                        )));
                    }
                    if let Some(p) = declared.iter().find(|p| !capabilities.contains(*p)) {
                        return Err(ReleaseError::config(format!(
                            "step '{}' ({}) does not support the {} phase",
                            name,
                            step.kind(),
                            p
                        )));
                    }
                    Phase::ALL
                        .into_iter()
                        .filter(|p| declared.contains(p))
                        .collect()
                }
            };

            match &step {
                Step::Git(_) => has_git = true,
                Step::HostedRelease(_) if !has_git => {
                    return Err(ReleaseError::config(format!(
                        "hosted release step '{}' must come after a git step",
                        name
                    )));
                }
                _ => {}
            }

            steps.push(PipelineStep { name, phases, step });
        }

        Ok(Pipeline { steps })
    }

    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Execute every declared phase of every step, phase by phase.
    ///
    /// Never fails itself: a failing step or a cancellation is recorded in
    /// [PipelineRun::error] with the log up to that point preserved.
    pub fn run(
        &self,
        ctx: &ReleaseContext,
        env: &Collaborators<'_>,
        cancel: &CancelHandle,
    ) -> PipelineRun {
        let mut run = PipelineRun::default();

        for phase in Phase::ALL {
            if phase == Phase::Publish && !cancel.begin_publish() {
                run.error = Some(ReleaseError::Cancelled(
                    "cancelled before the publish phase".to_string(),
                ));
                return run;
            }

            for entry in self.steps.iter().filter(|s| s.phases.contains(&phase)) {
                if phase != Phase::Publish && cancel.is_cancelled() {
                    run.error = Some(ReleaseError::Cancelled(format!(
                        "cancelled before {} of '{}'",
                        phase, entry.name
                    )));
                    return run;
                }

                log::debug!("Step '{}' entering {}", entry.name, phase);
                match entry.step.run(phase, ctx, env) {
                    Ok(completion) => {
                        let outcome = match completion.skipped {
                            Some(reason) => Outcome::Skipped(reason),
                            None => Outcome::Ok,
                        };
                        run.warnings.extend(completion.warnings);
                        run.log.push(StepResult {
                            step: entry.name.clone(),
                            kind: entry.step.kind(),
                            phase,
                            outcome,
                            artifacts: completion.artifacts,
                        });
                    }
                    Err(e) => {
                        log::error!("Step '{}' failed during {}: {}", entry.name, phase, e);
                        run.log.push(StepResult {
                            step: entry.name.clone(),
                            kind: entry.step.kind(),
                            phase,
                            outcome: Outcome::Failed(e.to_string()),
                            artifacts: Vec::new(),
                        });
                        run.error = Some(ReleaseError::step(&entry.name, phase, e.to_string()));
                        return run;
                    }
                }
            }
        }

        run
    }
}

fn strip_config(err: ReleaseError) -> String {
    match err {
        ReleaseError::Config(msg) => msg,
        other => other.to_string(),
    }
}
