use crate::domain::Version;
use crate::error::{ReleaseError, Result};
use regex::Regex;

const VERSION_PLACEHOLDER: &str = "{{version}}";

/// Tag naming pattern (e.g., "v{{version}}", "release-{{version}}")
#[derive(Debug, Clone)]
pub struct TagPattern {
    pattern: String,
    matcher: Regex,
}

impl TagPattern {
    /// Create a tag pattern; it must contain exactly one `{{version}}` placeholder
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        if pattern.matches(VERSION_PLACEHOLDER).count() != 1 {
            return Err(ReleaseError::config(format!(
                "Tag format '{}' must contain exactly one {} placeholder",
                pattern, VERSION_PLACEHOLDER
            )));
        }

        // Escape everything, then let the placeholder capture a semver-ish string
        let escaped = regex::escape(&pattern);
        let regex_pattern = escaped.replace(&regex::escape(VERSION_PLACEHOLDER), r"(\d+\.\d+\.\d+.*)");
        let matcher = Regex::new(&format!("^{}$", regex_pattern))
            .map_err(|e| ReleaseError::config(format!("Invalid tag format '{}': {}", pattern, e)))?;

        Ok(TagPattern { pattern, matcher })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Format a version according to pattern
    /// Example: pattern="v{{version}}", version=1.2.3 -> "v1.2.3"
    pub fn format(&self, version: &Version) -> String {
        self.pattern
            .replace(VERSION_PLACEHOLDER, &version.to_string())
    }

    /// The version text of a tag, if the tag matches this pattern
    pub fn version_part<'a>(&self, tag: &'a str) -> Option<&'a str> {
        self.matcher
            .captures(tag)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }

    /// Parse a tag that matches this pattern.
    ///
    /// Returns `None` when the tag does not match the pattern at all, and
    /// `Some(Err(..))` when it matches but the version cannot be parsed.
    pub fn parse(&self, tag: &str) -> Option<Result<Version>> {
        self.version_part(tag).map(Version::parse)
    }
}
