use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use cgp_core::{ReleaseTag, ResolvedRelease};

use crate::GithubRepo;

const USER_AGENT: &str = "cgp-deploy";
const METADATA_TIMEOUT: Duration = Duration::from_secs(60);

/// Outcome of tag resolution. `fallback` carries the metadata failure when
/// the run degraded to the literal `latest` token, so status commands can
/// surface it; installs proceed regardless.
#[derive(Debug, Clone)]
pub struct TagResolution {
    pub release: ResolvedRelease,
    pub fallback: Option<String>,
}

/// Resolve the requested tag to a concrete release. Explicit tags are used
/// verbatim. `latest` asks the release-metadata endpoint for the newest tag;
/// any failure to reach or parse it falls back to the literal `latest`
/// token rather than failing the run — availability over precision, since
/// the provider's own redirect still serves the newest assets.
pub fn resolve_tag(repo: &GithubRepo, requested: &ReleaseTag) -> TagResolution {
    resolve_tag_with_fetch(repo, requested, fetch_release_metadata)
}

pub fn resolve_tag_with_fetch<F>(
    repo: &GithubRepo,
    requested: &ReleaseTag,
    fetch: F,
) -> TagResolution
where
    F: FnOnce(&str) -> Result<String>,
{
    let ReleaseTag::Latest = requested else {
        return TagResolution {
            release: ResolvedRelease::from_tag(requested.as_str()),
            fallback: None,
        };
    };

    match fetch(&repo.latest_release_api_url()).and_then(|raw| parse_tag_name(&raw)) {
        Ok(tag) => TagResolution {
            release: ResolvedRelease::from_tag(&tag),
            fallback: None,
        },
        Err(err) => TagResolution {
            release: ResolvedRelease::from_tag("latest"),
            fallback: Some(format!("{err:#}")),
        },
    }
}

fn parse_tag_name(raw: &str) -> Result<String> {
    let value: serde_json::Value =
        serde_json::from_str(raw).context("release metadata is not valid JSON")?;
    value
        .get("tag_name")
        .and_then(|tag| tag.as_str())
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(ToOwned::to_owned)
        .ok_or_else(|| anyhow!("release metadata has no tag_name"))
}

fn fetch_release_metadata(url: &str) -> Result<String> {
    let client = reqwest::blocking::Client::builder()
        .timeout(METADATA_TIMEOUT)
        .build()
        .context("failed to build http client")?;
    let response = client
        .get(url)
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .header(reqwest::header::ACCEPT, "application/vnd.github+json")
        .send()
        .with_context(|| format!("failed to query {url}"))?
        .error_for_status()
        .with_context(|| format!("release metadata request rejected: {url}"))?;
    response
        .text()
        .with_context(|| format!("failed to read release metadata from {url}"))
}
