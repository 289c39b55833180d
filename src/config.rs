use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::{BranchRule, Channel, ChannelResolver, Phase, TagPattern};
use crate::error::{ReleaseError, Result};
use crate::pipeline::Pipeline;

/// File name searched for in the working directory and the user config directory
pub const CONFIG_FILE_NAME: &str = "release.toml";

/// Represents the complete configuration for git-release.
///
/// Contains branch to channel mappings, commit taxonomy, tag naming, run
/// behavior and the ordered list of publication steps.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "default_branches")]
    pub branches: Vec<BranchConfig>,

    #[serde(default = "default_tag_format")]
    pub tag_format: String,

    #[serde(default)]
    pub commits: CommitTypesConfig,

    #[serde(default)]
    pub behavior: BehaviorConfig,

    #[serde(default = "default_steps")]
    pub steps: Vec<StepConfig>,
}

/// One release branch. A branch without `prerelease` is the stable channel.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BranchConfig {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prerelease: Option<PrereleaseSetting>,
}

/// `prerelease = true` uses the branch name as qualifier, a string sets it explicitly
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum PrereleaseSetting {
    Enabled(bool),
    Qualifier(String),
}

impl BranchConfig {
    pub fn rule(&self) -> BranchRule {
        let channel = match &self.prerelease {
            None | Some(PrereleaseSetting::Enabled(false)) => Channel::Stable,
            Some(PrereleaseSetting::Enabled(true)) => Channel::Prerelease(self.name.clone()),
            Some(PrereleaseSetting::Qualifier(q)) => Channel::Prerelease(q.clone()),
        };
        BranchRule {
            branch: self.name.clone(),
            channel,
        }
    }
}

fn default_branches() -> Vec<BranchConfig> {
    vec![
        BranchConfig {
            name: "master".to_string(),
            prerelease: None,
        },
        BranchConfig {
            name: "dev".to_string(),
            prerelease: Some(PrereleaseSetting::Enabled(true)),
        },
    ]
}

fn default_tag_format() -> String {
    "v{{version}}".to_string()
}

/// Returns the default commit types that trigger a minor bump.
fn default_feature_types() -> Vec<String> {
    vec!["feat".to_string()]
}

/// Returns the default commit types that trigger a patch bump.
fn default_fix_types() -> Vec<String> {
    vec!["fix".to_string(), "perf".to_string()]
}

/// Returns the default list of breaking change indicators.
fn default_breaking_change_indicators() -> Vec<String> {
    vec![
        "BREAKING CHANGE:".to_string(),
        "BREAKING-CHANGE:".to_string(),
    ]
}

/// Commit taxonomy used by the classifier.
///
/// Any other type, and any non-conventional message, classifies as `other`
/// and never bumps the version.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CommitTypesConfig {
    #[serde(default = "default_feature_types")]
    pub feature_types: Vec<String>,

    #[serde(default = "default_fix_types")]
    pub fix_types: Vec<String>,

    #[serde(default = "default_breaking_change_indicators")]
    pub breaking_change_indicators: Vec<String>,
}

impl Default for CommitTypesConfig {
    fn default() -> Self {
        CommitTypesConfig {
            feature_types: default_feature_types(),
            fix_types: default_fix_types(),
            breaking_change_indicators: default_breaking_change_indicators(),
        }
    }
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

/// Runtime behavior that does not affect version analysis.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BehaviorConfig {
    #[serde(default = "default_remote")]
    pub remote: String,

    /// Upper bound for every external call (commands, registry, hosting API)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl BehaviorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        BehaviorConfig {
            remote: default_remote(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Fields shared by every step declaration
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct StepCommon {
    /// Name used in the run log; defaults to the step kind
    #[serde(default)]
    pub name: Option<String>,

    /// Restrict the step to a subset of the phases its kind supports
    #[serde(default)]
    pub phases: Option<Vec<Phase>>,

    /// Keys the step kind does not know; rejected at compile time
    #[serde(flatten)]
    pub unknown: BTreeMap<String, toml::Value>,
}

/// A step declaration, tagged by `kind`
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepConfig {
    Changelog(ChangelogConfig),
    Exec(ExecConfig),
    Container(ContainerConfig),
    Git(GitConfig),
    HostedRelease(HostedReleaseConfig),
}

impl StepConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            StepConfig::Changelog(_) => "changelog",
            StepConfig::Exec(_) => "exec",
            StepConfig::Container(_) => "container",
            StepConfig::Git(_) => "git",
            StepConfig::HostedRelease(_) => "hosted_release",
        }
    }

    pub fn common(&self) -> &StepCommon {
        match self {
            StepConfig::Changelog(c) => &c.common,
            StepConfig::Exec(c) => &c.common,
            StepConfig::Container(c) => &c.common,
            StepConfig::Git(c) => &c.common,
            StepConfig::HostedRelease(c) => &c.common,
        }
    }

    pub fn name(&self) -> String {
        self.common()
            .name
            .clone()
            .unwrap_or_else(|| self.kind().to_string())
    }
}

fn default_changelog_path() -> String {
    "CHANGELOG.md".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ChangelogConfig {
    #[serde(flatten)]
    pub common: StepCommon,

    #[serde(default = "default_changelog_path")]
    pub path: String,

    /// Heading kept at the top of the file
    #[serde(default)]
    pub title: Option<String>,
}

/// Commands are templates; each one present adds its phase to the step
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ExecConfig {
    #[serde(flatten)]
    pub common: StepCommon,

    #[serde(default)]
    pub verify: Option<String>,

    #[serde(default)]
    pub prepare: Option<String>,

    #[serde(default)]
    pub publish: Option<String>,
}

fn default_container_tags() -> Vec<String> {
    vec![
        "{{version}}".to_string(),
        "{{#if channel}}{{channel}}{{else}}latest{{/if}}".to_string(),
    ]
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ContainerConfig {
    #[serde(flatten)]
    pub common: StepCommon,

    /// Registry host, e.g. "ghcr.io"
    pub registry: String,

    /// Repository name inside the registry, e.g. "owner/app"
    pub image: String,

    /// Previously built local image; defaults to "<image>:latest"
    #[serde(default)]
    pub source: Option<String>,

    #[serde(default = "default_container_tags")]
    pub tags: Vec<String>,
}

impl ContainerConfig {
    pub fn source_image(&self) -> String {
        self.source
            .clone()
            .unwrap_or_else(|| format!("{}:latest", self.image))
    }
}

fn default_git_assets() -> Vec<String> {
    vec!["CHANGELOG.md".to_string()]
}

fn default_commit_message() -> String {
    "chore(release): {{version}} [skip ci]\n\n{{notes}}".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GitConfig {
    #[serde(flatten)]
    pub common: StepCommon,

    #[serde(default = "default_git_assets")]
    pub assets: Vec<String>,

    #[serde(default = "default_commit_message")]
    pub message: String,

    #[serde(default = "default_true")]
    pub push: bool,
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_release_title() -> String {
    "{{tag}}".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct HostedReleaseConfig {
    #[serde(flatten)]
    pub common: StepCommon,

    /// "owner/name"; derived from the remote URL when absent
    #[serde(default)]
    pub repository: Option<String>,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Title of the hosted release
    #[serde(default = "default_release_title")]
    pub title: String,

    #[serde(default)]
    pub assets: Vec<String>,
}

fn default_steps() -> Vec<StepConfig> {
    vec![
        StepConfig::Changelog(ChangelogConfig {
            common: StepCommon::default(),
            path: default_changelog_path(),
            title: None,
        }),
        StepConfig::Git(GitConfig {
            common: StepCommon::default(),
            assets: default_git_assets(),
            message: default_commit_message(),
            push: true,
        }),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Config {
            branches: default_branches(),
            tag_format: default_tag_format(),
            commits: CommitTypesConfig::default(),
            behavior: BehaviorConfig::default(),
            steps: default_steps(),
        }
    }
}

/// Configuration after validation: everything a run needs, with templates
/// already parsed.
#[derive(Debug, Clone)]
pub struct CompiledConfig {
    pub resolver: ChannelResolver,
    pub tag_pattern: TagPattern,
    pub commits: CommitTypesConfig,
    pub behavior: BehaviorConfig,
    pub pipeline: Pipeline,
}

impl Config {
    /// Validate and compile the configuration.
    ///
    /// Fails with a configuration error before any side effect: invalid
    /// branch mappings, tag format, unknown template placeholders, or
    /// malformed step declarations.
    pub fn compile(&self) -> Result<CompiledConfig> {
        let resolver = ChannelResolver::new(self.branches.iter().map(|b| b.rule()).collect())?;
        let tag_pattern = TagPattern::new(self.tag_format.clone())?;

        if self.behavior.timeout_secs == 0 {
            return Err(ReleaseError::config("behavior.timeout_secs must be positive"));
        }
        if self.behavior.remote.trim().is_empty() {
            return Err(ReleaseError::config("behavior.remote must not be empty"));
        }

        let pipeline = Pipeline::compile(&self.steps)?;

        Ok(CompiledConfig {
            resolver,
            tag_pattern,
            commits: self.commits.clone(),
            behavior: self.behavior.clone(),
            pipeline,
        })
    }
}

/// Paths searched when no explicit configuration file is given
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(".").join(CONFIG_FILE_NAME)];
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("git-release").join(CONFIG_FILE_NAME));
    }
    paths
}

/// Parse configuration text
pub fn parse_config(text: &str) -> Result<Config> {
    Ok(toml::from_str(text)?)
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `release.toml` in current directory
/// 3. `<config dir>/git-release/release.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If the file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    if let Some(path) = config_path {
        log::debug!("Loading configuration from {}", path);
        let text = fs::read_to_string(path).map_err(|e| {
            ReleaseError::config(format!("Cannot read configuration '{}': {}", path, e))
        })?;
        return parse_config(&text);
    }

    for candidate in config_search_paths() {
        if Path::new(&candidate).exists() {
            log::debug!("Loading configuration from {}", candidate.display());
            let text = fs::read_to_string(&candidate)?;
            return parse_config(&text);
        }
    }

    log::debug!("No configuration file found, using defaults");
    Ok(Config::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_branches() {
        let config = Config::default();
        let rules: Vec<BranchRule> = config.branches.iter().map(|b| b.rule()).collect();
        assert_eq!(rules[0].channel, Channel::Stable);
        assert_eq!(rules[1].channel, Channel::Prerelease("dev".to_string()));
    }

    #[test]
    fn test_default_compiles() {
        let compiled = Config::default().compile().unwrap();
        assert_eq!(compiled.tag_pattern.as_str(), "v{{version}}");
        assert_eq!(compiled.pipeline.steps().len(), 2);
    }

    #[test]
    fn test_prerelease_setting_variants() {
        let config = parse_config(
            r#"
[[branches]]
name = "main"

[[branches]]
name = "next"
prerelease = "beta"

[[branches]]
name = "legacy"
prerelease = false
"#,
        )
        .unwrap();
        assert_eq!(config.branches[1].rule().channel, Channel::Prerelease("beta".into()));
        assert_eq!(config.branches[2].rule().channel, Channel::Stable);
        // two stable branches
        assert!(config.compile().is_err());
    }

    #[test]
    fn test_step_kinds_parse() {
        let config = parse_config(
            r#"
[[steps]]
kind = "exec"
name = "readme"
prepare = "echo {{version}}"

[[steps]]
kind = "container"
registry = "ghcr.io"
image = "owner/app"

[[steps]]
kind = "hosted_release"
phases = ["publish"]
"#,
        )
        .unwrap();
        assert_eq!(config.steps.len(), 3);
        assert_eq!(config.steps[0].name(), "readme");
        assert_eq!(config.steps[1].name(), "container");
        match &config.steps[1] {
            StepConfig::Container(c) => {
                assert_eq!(c.source_image(), "owner/app:latest");
                assert_eq!(c.tags.len(), 2);
            }
            other => panic!("unexpected step {:?}", other),
        }
        assert_eq!(
            config.steps[2].common().phases,
            Some(vec![Phase::Publish])
        );
    }

    #[test]
    fn test_unknown_step_kind_is_configuration_error() {
        let err = parse_config(
            r#"
[[steps]]
kind = "npm"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ReleaseError::Config(_)));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = Config::default();
        config.behavior.timeout_secs = 0;
        assert!(config.compile().is_err());
    }

    #[test]
    fn test_bad_tag_format_rejected() {
        let mut config = Config::default();
        config.tag_format = "release".to_string();
        assert!(matches!(config.compile(), Err(ReleaseError::Config(_))));
    }
}
