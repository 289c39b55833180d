use crate::analyzer::CommitDelta;
use crate::boundary::BoundaryWarning;
use crate::domain::{Channel, Core, TagPattern, Version};
use crate::error::{ReleaseError, Result};
use std::cmp::Ordering;

/// A release tag from the durable tag history
#[derive(Debug, Clone, PartialEq)]
pub struct ReleasedTag {
    pub name: String,
    pub version: Version,
}

/// All release tags of the repository, parsed once per run
#[derive(Debug, Clone, Default)]
pub struct TagHistory {
    tags: Vec<ReleasedTag>,
    warnings: Vec<BoundaryWarning>,
}

impl TagHistory {
    /// Build the history from raw tag names.
    ///
    /// Tags that do not match the pattern are ignored; tags that match but
    /// carry an unusable version are ignored with a warning.
    pub fn from_tags<I>(tags: I, pattern: &TagPattern) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut history = TagHistory::default();

        for name in tags {
            match pattern.parse(&name) {
                None => continue,
                Some(Ok(version)) => history.tags.push(ReleasedTag { name, version }),
                Some(Err(e)) => {
                    log::warn!("Ignoring tag '{}': {}", name, e);
                    history.warnings.push(BoundaryWarning::UnparsableTag {
                        tag: name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        history
    }

    pub fn tags(&self) -> &[ReleasedTag] {
        &self.tags
    }

    pub fn warnings(&self) -> &[BoundaryWarning] {
        &self.warnings
    }

    pub fn contains_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t.name == name)
    }

    fn highest<'a>(
        &'a self,
        filter: impl Fn(&ReleasedTag) -> bool,
    ) -> Option<&'a ReleasedTag> {
        self.tags.iter().filter(|t| filter(t)).max_by(|a, b| {
            a.version
                .partial_cmp(&b.version)
                .unwrap_or(Ordering::Equal)
        })
    }

    /// Highest stable release, the baseline for every channel
    pub fn highest_stable(&self) -> Option<&ReleasedTag> {
        self.highest(|t| !t.version.is_prerelease())
    }

    pub fn highest_prerelease(&self, qualifier: &str) -> Option<&ReleasedTag> {
        self.highest(|t| t.version.qualifier() == Some(qualifier))
    }

    /// Prior highest version on a channel
    pub fn highest_on_channel(&self, channel: &Channel) -> Option<&ReleasedTag> {
        match channel {
            Channel::Stable => self.highest_stable(),
            Channel::Prerelease(q) => self.highest_prerelease(q),
        }
    }

    /// Whether a tag marks the start of the commit range for a channel:
    /// stable releases always do, prereleases only for their own channel.
    pub fn is_boundary(&self, channel: &Channel, tag: &str) -> bool {
        self.tags.iter().any(|t| {
            t.name == tag
                && match t.version.qualifier() {
                    None => true,
                    Some(q) => channel.name() == Some(q),
                }
        })
    }
}

/// Compute the next version for a channel, or `None` when the delta holds
/// nothing that warrants a release.
///
/// The bump is always applied to the highest stable release (or `0.0.0`).
/// On a prerelease channel, when a prerelease with an equal or higher core
/// already exists, that core is kept and only the sequence advances.
pub fn next_version(delta: &CommitDelta, channel: &Channel, history: &TagHistory) -> Option<Version> {
    let bump = delta.bump()?;

    let baseline = history
        .highest_stable()
        .map(|t| t.version.core)
        .unwrap_or(Core::new(0, 0, 0));
    let candidate = baseline.bump(bump);

    let version = match channel {
        Channel::Stable => Version::stable(candidate),
        Channel::Prerelease(qualifier) => {
            let core = match history.highest_prerelease(qualifier) {
                Some(latest) if latest.version.core >= candidate => latest.version.core,
                _ => candidate,
            };
            let sequence = history
                .tags
                .iter()
                .filter(|t| t.version.core == core && t.version.qualifier() == Some(qualifier))
                .filter_map(|t| t.version.sequence())
                .max()
                .map(|n| n + 1)
                .unwrap_or(1);
            Version::prerelease(core, qualifier.clone(), sequence)
        }
    };

    log::debug!(
        "Baseline {} + {:?} on {} -> {}",
        baseline,
        bump,
        channel,
        version
    );
    Some(version)
}

/// Refuse versions that do not strictly exceed the prior version on their
/// channel, or whose tag already exists.
///
/// [next_version] always derives from the same history, so a run only trips
/// this guard if the calculation itself regresses. The run aborts before any
/// step when it does.
pub fn check_consistency(
    version: &Version,
    tag: &str,
    channel: &Channel,
    history: &TagHistory,
) -> Result<()> {
    let inconsistent = |prior: String| ReleaseError::VersionConsistency {
        computed: version.to_string(),
        prior,
        channel: channel.key().to_string(),
    };

    if version.qualifier() != channel.name() {
        return Err(inconsistent(format!(
            "channel qualifier {:?}",
            channel.name()
        )));
    }

    if history.contains_tag(tag) {
        return Err(inconsistent(format!("existing tag {}", tag)));
    }

    if let Some(prior) = history.highest_on_channel(channel) {
        if version.partial_cmp(&prior.version) != Some(Ordering::Greater) {
            return Err(inconsistent(prior.version.to_string()));
        }
    }

    Ok(())
}
