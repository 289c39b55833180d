//! Commit analysis and version calculation

pub mod calculator;
pub mod classifier;

pub use calculator::{check_consistency, next_version, ReleasedTag, TagHistory};
pub use classifier::{Classification, ClassifiedCommit, CommitClassifier, CommitDelta, CommitKind};
