use crate::config::CommitTypesConfig;
use crate::domain::{Commit, ParsedCommit, VersionBump};

/// Semantic category of a single commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitKind {
    Breaking,
    Feature,
    Fix,
    /// Unrecognized or non-bumping type; never triggers a release
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedCommit {
    pub commit: Commit,
    pub parsed: Option<ParsedCommit>,
    pub kind: CommitKind,
}

/// Aggregated classification over a commit range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitDelta {
    pub breaking: bool,
    pub features: usize,
    pub fixes: usize,
    pub other: usize,
}

impl CommitDelta {
    /// True when the range held no commits at all
    pub fn is_empty(&self) -> bool {
        !self.breaking && self.features == 0 && self.fixes == 0 && self.other == 0
    }

    /// Highest-precedence bump present; bumps are not cumulative
    pub fn bump(&self) -> Option<VersionBump> {
        if self.breaking {
            Some(VersionBump::Major)
        } else if self.features > 0 {
            Some(VersionBump::Minor)
        } else if self.fixes > 0 {
            Some(VersionBump::Patch)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Classification {
    pub delta: CommitDelta,
    pub commits: Vec<ClassifiedCommit>,
}

impl Classification {
    pub fn of_kind(&self, kind: CommitKind) -> impl Iterator<Item = &ClassifiedCommit> {
        self.commits.iter().filter(move |c| c.kind == kind)
    }

    /// Commits carrying a breaking change, whatever their type
    pub fn breaking(&self) -> impl Iterator<Item = &ClassifiedCommit> {
        self.commits
            .iter()
            .filter(|c| c.parsed.as_ref().is_some_and(|p| p.is_breaking_change))
    }
}

/// Classifies commit messages against a fixed taxonomy
#[derive(Debug, Clone)]
pub struct CommitClassifier {
    config: CommitTypesConfig,
}

impl CommitClassifier {
    pub fn new(config: CommitTypesConfig) -> Self {
        CommitClassifier { config }
    }

    /// Classify one message by its leading token
    pub fn classify_message(&self, message: &str) -> (Option<ParsedCommit>, CommitKind) {
        let parsed = ParsedCommit::parse(message, &self.config.breaking_change_indicators);

        let kind = match &parsed {
            None => CommitKind::Other,
            Some(p) if p.is_breaking_change => CommitKind::Breaking,
            Some(p) if self.config.feature_types.contains(&p.r#type) => CommitKind::Feature,
            Some(p) if self.config.fix_types.contains(&p.r#type) => CommitKind::Fix,
            Some(_) => CommitKind::Other,
        };

        (parsed, kind)
    }

    /// Classify an ordered commit range into a delta.
    ///
    /// An empty range yields an all-zero delta.
    pub fn classify(&self, commits: &[Commit]) -> Classification {
        let mut delta = CommitDelta::default();
        let mut classified = Vec::with_capacity(commits.len());

        for commit in commits {
            let (parsed, kind) = self.classify_message(&commit.message);

            if let Some(p) = &parsed {
                if p.is_breaking_change {
                    delta.breaking = true;
                }
                if self.config.feature_types.contains(&p.r#type) {
                    delta.features += 1;
                } else if self.config.fix_types.contains(&p.r#type) {
                    delta.fixes += 1;
                } else {
                    delta.other += 1;
                }
            } else {
                delta.other += 1;
            }

            log::debug!("{} classified as {:?}", commit.short_hash(), kind);
            classified.push(ClassifiedCommit {
                commit: commit.clone(),
                parsed,
                kind,
            });
        }

        Classification {
            delta,
            commits: classified,
        }
    }
}
