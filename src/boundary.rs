use std::fmt;

/// Non-fatal conditions met during a run. They never change the outcome
/// but are reported to the user next to the run log.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryWarning {
    /// No new commits since the latest release tag of the channel
    NoNewCommits {
        latest_tag: String,
        current_commit_hash: String,
    },
    /// Tag matches the tag format but its version cannot be used
    UnparsableTag { tag: String, reason: String },
    /// Configured release asset does not exist and was not committed
    MissingAsset { path: String },
}

impl fmt::Display for BoundaryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryWarning::NoNewCommits {
                latest_tag,
                current_commit_hash,
            } => {
                let short_hash = if current_commit_hash.len() > 7 {
                    &current_commit_hash[..7]
                } else {
                    current_commit_hash.as_str()
                };
                write!(
                    f,
                    "No new commits since tag '{}' (current: {})",
                    latest_tag, short_hash
                )
            }
            BoundaryWarning::UnparsableTag { tag, reason } => {
                write!(f, "Ignoring tag '{}': {}", tag, reason)
            }
            BoundaryWarning::MissingAsset { path } => {
                write!(f, "Release asset '{}' not found, not committed", path)
            }
        }
    }
}
