use semver::Version;

/// Requested release: the `latest` sentinel or an explicit tag used verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseTag {
    Latest,
    Explicit(String),
}

impl ReleaseTag {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("latest") {
            Self::Latest
        } else {
            Self::Explicit(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Latest => "latest",
            Self::Explicit(tag) => tag,
        }
    }
}

/// Outcome of tag resolution for one run. `version` is absent when the run
/// fell back to the provider's literal `latest` redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRelease {
    pub tag: String,
    pub version: Option<String>,
}

impl ResolvedRelease {
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.trim();
        let version = if tag.eq_ignore_ascii_case("latest") {
            None
        } else {
            Some(tag.strip_prefix('v').unwrap_or(tag).to_string())
        };
        Self {
            tag: tag.to_string(),
            version,
        }
    }
}

/// Compare release versions leniently: `true` if `remote` is newer than
/// `local`, `None` when either side cannot be interpreted as a version.
/// Well-formed tags go through semver; sloppier tags (`v1.2`, `0.4.1-3-gabc`)
/// fall back to a numeric-component comparison.
pub fn is_version_newer(remote: &str, local: &str) -> Option<bool> {
    if let (Some(remote), Some(local)) = (parse_semver(remote), parse_semver(local)) {
        return Some(remote > local);
    }

    let remote = parse_version_components(remote)?;
    let local = parse_version_components(local)?;
    let width = remote.len().max(local.len());
    let pad = |components: &[u64]| -> Vec<u64> {
        let mut padded = components.to_vec();
        padded.resize(width, 0);
        padded
    };
    Some(pad(&remote) > pad(&local))
}

fn parse_semver(raw: &str) -> Option<Version> {
    let trimmed = raw.trim();
    Version::parse(trimmed.strip_prefix('v').unwrap_or(trimmed)).ok()
}

fn parse_version_components(raw: &str) -> Option<Vec<u64>> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return None;
    }

    let mut components = Vec::new();
    for part in trimmed.split('.') {
        let digits: String = part.chars().take_while(|ch| ch.is_ascii_digit()).collect();
        if digits.is_empty() {
            break;
        }
        components.push(digits.parse().ok()?);
    }

    if components.is_empty() {
        None
    } else {
        Some(components)
    }
}
