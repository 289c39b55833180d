//! Domain logic - pure release rules independent of git operations

pub mod channel;
pub mod commit;
pub mod phase;
pub mod prerelease;
pub mod tag;
pub mod version;

pub use channel::{BranchRule, Channel, ChannelResolver, Resolution};
pub use commit::{Commit, ParsedCommit};
pub use phase::Phase;
pub use prerelease::PreRelease;
pub use tag::TagPattern;
pub use version::{Core, Version, VersionBump};
