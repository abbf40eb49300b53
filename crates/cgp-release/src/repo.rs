use anyhow::{anyhow, Result};

pub const ENV_GITHUB_REPO: &str = "CGP_GITHUB_REPO";
pub const DEFAULT_GITHUB_REPO: &str = "baaaaaaaka/cursor_gui_patch";

/// Release source identity, `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubRepo {
    pub owner: String,
    pub name: String,
}

impl GithubRepo {
    pub fn parse(spec: &str) -> Result<Self> {
        let trimmed = spec.trim();
        let Some((owner, name)) = trimmed.split_once('/') else {
            return Err(anyhow!(
                "invalid GitHub repo '{spec}': expected 'owner/name'"
            ));
        };
        let owner = owner.trim();
        let name = name.trim();
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(anyhow!(
                "invalid GitHub repo '{spec}': expected 'owner/name'"
            ));
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    pub fn latest_release_api_url(&self) -> String {
        format!(
            "https://api.github.com/repos/{}/{}/releases/latest",
            self.owner, self.name
        )
    }

    /// Download URL for one release asset. The literal `latest` tag rides the
    /// provider's own redirect, which is what the tag-resolution fallback
    /// relies on.
    pub fn asset_download_url(&self, tag: &str, asset_name: &str) -> String {
        if tag.eq_ignore_ascii_case("latest") {
            format!(
                "https://github.com/{}/{}/releases/latest/download/{asset_name}",
                self.owner, self.name
            )
        } else {
            format!(
                "https://github.com/{}/{}/releases/download/{tag}/{asset_name}",
                self.owner, self.name
            )
        }
    }
}
