use regex::Regex;
use std::sync::LazyLock;

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<type>[A-Za-z]+)(?:\((?P<scope>[^)]*)\))?(?P<bang>!)?:\s*(?P<desc>.*)$")
        .expect("commit header pattern is valid")
});

/// A commit read from the VCS log. Never mutated after it is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub hash: String,
    pub message: String,
    pub author: String,
    /// Author timestamp, seconds since the epoch
    pub timestamp: i64,
    /// Branch the commit was read from
    pub branch: String,
}

impl Commit {
    pub fn short_hash(&self) -> &str {
        if self.hash.len() > 7 {
            &self.hash[..7]
        } else {
            &self.hash
        }
    }

    /// First line of the message
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

/// Parsed representation of a conventional commit message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommit {
    pub r#type: String,
    pub scope: Option<String>,
    pub description: String,
    pub is_breaking_change: bool,
    /// Text following a breaking change footer, if any
    pub breaking_note: Option<String>,
}

impl ParsedCommit {
    /// Parse a commit message according to the conventional commits format.
    ///
    /// Supports `type(scope)!: description`, `type(scope): description`,
    /// `type!: description` and `type: description`, with breaking change
    /// footers recognised anywhere in the body. Returns `None` for messages
    /// that do not follow the format.
    pub fn parse(message: &str, breaking_indicators: &[String]) -> Option<Self> {
        let header = message.lines().next()?.trim();
        let captures = HEADER.captures(header)?;

        let r#type = captures.name("type")?.as_str().to_lowercase();
        let scope = captures
            .name("scope")
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty());
        let description = captures
            .name("desc")
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        let has_bang = captures.name("bang").is_some();

        let breaking_note = breaking_indicators.iter().find_map(|indicator| {
            message
                .find(indicator.as_str())
                .map(|idx| message[idx + indicator.len()..].trim().to_string())
        });

        Some(ParsedCommit {
            r#type,
            scope,
            description,
            is_breaking_change: has_bang || breaking_note.is_some(),
            breaking_note: breaking_note.filter(|n| !n.is_empty()),
        })
    }
}
