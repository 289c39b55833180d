use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline phase. All steps' verify actions run before any prepare action,
/// which all run before any publish action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Verify,
    Prepare,
    Publish,
}

impl Phase {
    /// Phases in execution order
    pub const ALL: [Phase; 3] = [Phase::Verify, Phase::Prepare, Phase::Publish];

    pub fn name(&self) -> &'static str {
        match self {
            Phase::Verify => "verify",
            Phase::Prepare => "prepare",
            Phase::Publish => "publish",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order() {
        assert!(Phase::Verify < Phase::Prepare);
        assert!(Phase::Prepare < Phase::Publish);
        assert_eq!(Phase::ALL.to_vec(), vec![Phase::Verify, Phase::Prepare, Phase::Publish]);
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(Phase::Verify.to_string(), "verify");
        assert_eq!(Phase::Publish.name(), "publish");
    }
}
