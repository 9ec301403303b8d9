// src/binary/source.rs

//! Where assets come from: release lookup and download.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::errors::{DevwatchError, Result};

pub const GITHUB_API: &str = "https://api.github.com";
pub const NPM_REGISTRY: &str = "https://registry.npmjs.org";

/// Remote locator of an asset bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    /// Latest GitHub release of `owner/repo`.
    GitHub { repo: String },
    /// npm package at a dist tag.
    Npm { package: String, dist_tag: String },
}

impl AssetSource {
    pub fn describe(&self) -> String {
        match self {
            AssetSource::GitHub { repo } => format!("github:{repo}"),
            AssetSource::Npm { package, dist_tag } => format!("npm:{package}@{dist_tag}"),
        }
    }
}

/// A resolved version and its downloadable files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub version: String,
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    pub name: String,
    pub url: String,
}

impl Release {
    pub fn asset(&self, name: &str) -> Option<&ReleaseAsset> {
        self.assets.iter().find(|a| a.name == name)
    }
}

pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Network access used by `BinaryAssetManager`.
///
/// Production uses [`HttpSource`]; tests substitute an in-memory source.
pub trait RemoteSource: Send + Sync {
    /// Latest applicable release for `source`.
    fn resolve<'a>(&'a self, source: &'a AssetSource) -> SourceFuture<'a, Release>;

    fn download<'a>(&'a self, url: &'a str) -> SourceFuture<'a, Vec<u8>>;
}

#[derive(Debug, Deserialize)]
struct GithubRelease {
    tag_name: String,
    #[serde(default)]
    assets: Vec<GithubAsset>,
}

#[derive(Debug, Deserialize)]
struct GithubAsset {
    name: String,
    browser_download_url: String,
}

/// GitHub releases API + npm registry over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    github_api: String,
    npm_registry: String,
    github_token: Option<String>,
}

impl HttpSource {
    /// Reads `GITHUB_TOKEN` for authenticated GitHub lookups.
    pub fn new() -> Result<Self> {
        Self::with_endpoints(GITHUB_API, NPM_REGISTRY)
    }

    pub fn with_endpoints(github_api: impl Into<String>, npm_registry: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("devwatch/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(300))
            .build()?;
        Ok(Self {
            client,
            github_api: github_api.into().trim_end_matches('/').to_string(),
            npm_registry: npm_registry.into().trim_end_matches('/').to_string(),
            github_token: std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
        })
    }

    async fn resolve_github(&self, repo: &str) -> Result<Release> {
        let url = format!("{}/repos/{}/releases/latest", self.github_api, repo);
        debug!(%url, "resolving GitHub release");

        let mut request = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.github_token {
            request = request.bearer_auth(token);
        }

        let release: GithubRelease = request.send().await?.error_for_status()?.json().await?;
        Ok(Release {
            version: release.tag_name,
            assets: release
                .assets
                .into_iter()
                .map(|a| ReleaseAsset {
                    name: a.name,
                    url: a.browser_download_url,
                })
                .collect(),
        })
    }

    async fn resolve_npm(&self, package: &str, dist_tag: &str) -> Result<Release> {
        let url = format!("{}/{}", self.npm_registry, npm_path(package));
        debug!(%url, dist_tag, "resolving npm dist tag");

        let doc: serde_json::Value = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        npm_release(&doc, package, dist_tag)
    }
}

impl RemoteSource for HttpSource {
    fn resolve<'a>(&'a self, source: &'a AssetSource) -> SourceFuture<'a, Release> {
        Box::pin(async move {
            match source {
                AssetSource::GitHub { repo } => self.resolve_github(repo).await,
                AssetSource::Npm { package, dist_tag } => self.resolve_npm(package, dist_tag).await,
            }
        })
    }

    fn download<'a>(&'a self, url: &'a str) -> SourceFuture<'a, Vec<u8>> {
        Box::pin(async move {
            debug!(%url, "downloading");
            let bytes = self
                .client
                .get(url)
                .send()
                .await?
                .error_for_status()?
                .bytes()
                .await?;
            Ok(bytes.to_vec())
        })
    }
}

/// Scoped names keep the `@` but escape the slash.
fn npm_path(package: &str) -> String {
    if package.starts_with('@') {
        package.replacen('/', "%2f", 1)
    } else {
        package.to_string()
    }
}

/// Pick `dist-tags[tag]` out of a registry document. The single asset is
/// named `package`, matching the layout of npm tarballs.
pub fn npm_release(doc: &serde_json::Value, package: &str, dist_tag: &str) -> Result<Release> {
    let version = doc["dist-tags"][dist_tag].as_str().ok_or_else(|| {
        DevwatchError::AcquisitionError(format!("npm package {package} has no dist tag '{dist_tag}'"))
    })?;
    let tarball = doc["versions"][version]["dist"]["tarball"]
        .as_str()
        .ok_or_else(|| {
            DevwatchError::AcquisitionError(format!(
                "npm package {package}@{version} has no tarball URL"
            ))
        })?;

    Ok(Release {
        version: version.to_string(),
        assets: vec![ReleaseAsset {
            name: "package".to_string(),
            url: tarball.to_string(),
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn npm_dist_tag_lookup() {
        let doc = serde_json::json!({
            "dist-tags": { "latest": "1.0.0", "next": "2.0.0-rc.1" },
            "versions": {
                "1.0.0": { "dist": { "tarball": "https://r/x-1.0.0.tgz" } },
                "2.0.0-rc.1": { "dist": { "tarball": "https://r/x-2.0.0-rc.1.tgz" } }
            }
        });

        let rel = npm_release(&doc, "x", "next").unwrap();
        assert_eq!(rel.version, "2.0.0-rc.1");
        assert_eq!(rel.asset("package").unwrap().url, "https://r/x-2.0.0-rc.1.tgz");

        assert!(npm_release(&doc, "x", "beta").is_err());
    }

    #[test]
    fn scoped_npm_path_is_escaped() {
        assert_eq!(npm_path("@valksor/valksor"), "@valksor%2fvalksor");
        assert_eq!(npm_path("htmx.org"), "htmx.org");
    }
}
