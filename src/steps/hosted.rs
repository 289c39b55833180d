use crate::config::HostedReleaseConfig;
use crate::context::ReleaseContext;
use crate::error::{ReleaseError, Result};
use crate::steps::{resolve_path, Artifact, Collaborators, Completion};
use crate::template::Template;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

static REMOTE_SLUG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[:/](?P<owner>[^/:]+)/(?P<name>[^/]+?)(?:\.git)?/?$")
        .expect("remote slug pattern is valid")
});

/// Release object to create on the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRelease {
    pub tag_name: String,
    pub name: String,
    pub body: String,
    pub prerelease: bool,
    pub draft: bool,
}

/// Release object as returned by the host
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PublishedRelease {
    pub id: u64,
    pub html_url: String,
    #[serde(default)]
    pub upload_url: String,
}

/// A remote release host such as GitHub.
///
/// `api_url` and `slug` (`owner/name`) select the repository on the host.
pub trait ReleaseHost {
    /// Fail unless the repository is reachable with the available credentials
    fn check_access(&self, api_url: &str, slug: &str) -> Result<()>;

    fn create_release(&self, api_url: &str, slug: &str, release: &NewRelease) -> Result<PublishedRelease>;

    /// Upload a file to a created release; returns its download URL
    fn upload_asset(&self, release: &PublishedRelease, path: &Path) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct UploadedAsset {
    browser_download_url: String,
}

/// GitHub REST API client
pub struct GitHubHost {
    client: reqwest::blocking::Client,
    token: Option<String>,
}

impl GitHubHost {
    /// Create a client authenticated from `GH_TOKEN` or `GITHUB_TOKEN`
    pub fn from_env(timeout: Duration) -> Result<Self> {
        let token = std::env::var("GH_TOKEN")
            .or_else(|_| std::env::var("GITHUB_TOKEN"))
            .ok()
            .filter(|t| !t.trim().is_empty());
        Self::new(token, timeout)
    }

    pub fn new(token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("git-release/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(GitHubHost { client, token })
    }

    fn token(&self) -> Result<&str> {
        self.token.as_deref().ok_or_else(|| {
            ReleaseError::remote("no GitHub token found; set GH_TOKEN or GITHUB_TOKEN")
        })
    }

    fn request(&self, method: reqwest::Method, url: &str) -> Result<reqwest::blocking::RequestBuilder> {
        Ok(self
            .client
            .request(method, url)
            .bearer_auth(self.token()?)
            .header("Accept", "application/vnd.github+json"))
    }
}

fn check_status(response: reqwest::blocking::Response, action: &str) -> Result<reqwest::blocking::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(ReleaseError::remote(format!(
        "{} failed with HTTP {}: {}",
        action,
        status,
        body.trim()
    )))
}

impl ReleaseHost for GitHubHost {
    fn check_access(&self, api_url: &str, slug: &str) -> Result<()> {
        let url = format!("{}/repos/{}", api_url.trim_end_matches('/'), slug);
        let response = self.request(reqwest::Method::GET, &url)?.send()?;
        check_status(response, &format!("access check for {}", slug))?;
        Ok(())
    }

    fn create_release(&self, api_url: &str, slug: &str, release: &NewRelease) -> Result<PublishedRelease> {
        let url = format!("{}/repos/{}/releases", api_url.trim_end_matches('/'), slug);
        let response = self
            .request(reqwest::Method::POST, &url)?
            .json(release)
            .send()?;
        Ok(check_status(response, "creating release")?.json()?)
    }

    fn upload_asset(&self, release: &PublishedRelease, path: &Path) -> Result<String> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ReleaseError::config(format!("invalid asset path {}", path.display())))?;
        // upload_url is a URI template: ".../assets{?name,label}"
        let base = release
            .upload_url
            .split('{')
            .next()
            .unwrap_or(&release.upload_url);
        let bytes = std::fs::read(path)?;

        let response = self
            .request(reqwest::Method::POST, base)?
            .query(&[("name", file_name)])
            .header("Content-Type", "application/octet-stream")
            .body(bytes)
            .send()?;
        let asset: UploadedAsset = check_status(response, &format!("uploading {}", file_name))?.json()?;
        Ok(asset.browser_download_url)
    }
}

/// Extract `owner/name` from a git remote URL
pub fn slug_from_remote(url: &str) -> Option<String> {
    let caps = REMOTE_SLUG.captures(url.trim())?;
    Some(format!("{}/{}", &caps["owner"], &caps["name"]))
}

/// Publishes the release notes as a hosted release of the VCS tag
#[derive(Debug, Clone)]
pub struct HostedReleaseStep {
    repository: Option<String>,
    api_url: String,
    title: Template,
    assets: Vec<String>,
}

impl HostedReleaseStep {
    pub fn new(config: &HostedReleaseConfig) -> Result<Self> {
        if let Some(repo) = &config.repository {
            if repo.split('/').filter(|p| !p.is_empty()).count() != 2 {
                return Err(ReleaseError::config(format!(
                    "hosted release repository '{}' must be 'owner/name'",
                    repo
                )));
            }
        }
        Ok(HostedReleaseStep {
            repository: config.repository.clone(),
            api_url: config.api_url.clone(),
            title: Template::parse(&config.title)?,
            assets: config.assets.clone(),
        })
    }

    fn slug(&self, env: &Collaborators<'_>) -> Result<String> {
        if let Some(repo) = &self.repository {
            return Ok(repo.clone());
        }
        let url = env.repo.remote_url(env.remote)?.ok_or_else(|| {
            ReleaseError::config(format!(
                "remote '{}' not found; set the hosted release repository",
                env.remote
            ))
        })?;
        slug_from_remote(&url).ok_or_else(|| {
            ReleaseError::config(format!("cannot derive owner/name from remote URL '{}'", url))
        })
    }

    fn asset_paths(&self, env: &Collaborators<'_>) -> Vec<PathBuf> {
        self.assets
            .iter()
            .map(|a| resolve_path(env.workdir, a))
            .collect()
    }

    pub fn verify(&self, _ctx: &ReleaseContext, env: &Collaborators<'_>) -> Result<Completion> {
        let slug = self.slug(env)?;
        env.host.check_access(&self.api_url, &slug)?;
        log::debug!("Release host access to {} verified", slug);
        Ok(Completion::default())
    }

    pub fn publish(&self, ctx: &ReleaseContext, env: &Collaborators<'_>) -> Result<Completion> {
        let slug = self.slug(env)?;
        let release = NewRelease {
            tag_name: ctx.tag().to_string(),
            name: self.title.render(ctx),
            body: ctx.notes().to_string(),
            prerelease: ctx.channel().is_prerelease(),
            draft: false,
        };
        let assets = self.asset_paths(env);

        if ctx.is_dry_run() {
            let artifacts = assets.into_iter().map(Artifact::File).collect();
            return Ok(Completion::dry_run(
                format!("create release '{}' on {}", release.name, slug),
                artifacts,
            ));
        }

        for asset in &assets {
            if !asset.is_file() {
                return Err(ReleaseError::config(format!(
                    "release asset {} does not exist",
                    asset.display()
                )));
            }
        }

        let published = env.host.create_release(&self.api_url, &slug, &release)?;
        log::info!("Created release {}", published.html_url);

        let mut artifacts = vec![Artifact::Url(published.html_url.clone())];
        for asset in &assets {
            artifacts.push(Artifact::Url(env.host.upload_asset(&published, asset)?));
        }
        Ok(Completion::done(artifacts))
    }
}
