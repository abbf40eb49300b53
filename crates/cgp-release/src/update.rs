use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use cgp_core::{is_version_newer, ReleaseTag};

use crate::resolve::{resolve_tag, resolve_tag_with_fetch};
use crate::GithubRepo;

/// Background update checks are throttled to one per interval per
/// installation root.
pub const UPDATE_CHECK_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateStatus {
    pub repo: String,
    pub installed_version: Option<String>,
    pub remote_tag: String,
    pub remote_version: Option<String>,
    /// `None` when either side has no comparable version (fresh install,
    /// `latest` fallback, or an unparseable tag).
    pub update_available: Option<bool>,
    /// Metadata failure that forced the `latest` fallback, if any.
    pub resolution_fallback: Option<String>,
}

pub fn check_for_update(repo: &GithubRepo, installed_version: Option<&str>) -> UpdateStatus {
    let resolution = resolve_tag(repo, &ReleaseTag::Latest);
    status_from_resolution(repo, installed_version, resolution)
}

pub fn check_for_update_with_fetch<F>(
    repo: &GithubRepo,
    installed_version: Option<&str>,
    fetch: F,
) -> UpdateStatus
where
    F: FnOnce(&str) -> Result<String>,
{
    let resolution = resolve_tag_with_fetch(repo, &ReleaseTag::Latest, fetch);
    status_from_resolution(repo, installed_version, resolution)
}

fn status_from_resolution(
    repo: &GithubRepo,
    installed_version: Option<&str>,
    resolution: crate::TagResolution,
) -> UpdateStatus {
    let remote_version = resolution.release.version.clone();
    let update_available = match (&remote_version, installed_version) {
        (Some(remote), Some(installed)) => is_version_newer(remote, installed),
        _ => None,
    };

    UpdateStatus {
        repo: repo.slug(),
        installed_version: installed_version.map(ToOwned::to_owned),
        remote_tag: resolution.release.tag,
        remote_version,
        update_available,
        resolution_fallback: resolution.fallback,
    }
}

/// Installed version derived from the Current Pointer's target directory
/// name, so it works even when the destination link is broken. Uniqueness
/// suffixes (`v1.2.0-1771001234[-pid]`) are stripped; a `latest-*` directory
/// has no comparable version.
pub fn installed_version_from_current(current_link: &Path) -> Option<String> {
    let target = fs::read_link(current_link).ok()?;
    let name = target.file_name()?.to_str()?;
    let tag = strip_uniqueness_suffix(name);
    if tag.eq_ignore_ascii_case("latest") {
        return None;
    }
    Some(tag.strip_prefix('v').unwrap_or(tag).to_string())
}

fn strip_uniqueness_suffix(name: &str) -> &str {
    let mut tag = name;
    // at most two numeric suffixes: timestamp, then pid
    for _ in 0..2 {
        let Some((head, last)) = tag.rsplit_once('-') else {
            break;
        };
        // a six-digit floor keeps version components like "-3" intact
        if last.len() >= 6 && last.chars().all(|ch| ch.is_ascii_digit()) && !head.is_empty() {
            tag = head;
        } else {
            break;
        }
    }
    tag
}

/// True when enough time has passed since the recorded check. Any unreadable
/// or malformed stamp means "check now" — the throttle must never break a
/// run.
pub fn should_check_for_update(stamp_path: &Path, now_unix: u64) -> bool {
    let Ok(raw) = fs::read_to_string(stamp_path) else {
        return true;
    };
    let Ok(stamp) = raw.trim().parse::<u64>() else {
        return true;
    };
    now_unix.saturating_sub(stamp) >= UPDATE_CHECK_INTERVAL.as_secs()
}

/// Best-effort: a failure to record the stamp never fails the run.
pub fn record_update_check(stamp_path: &Path, now_unix: u64) {
    if let Some(parent) = stamp_path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let _ = fs::write(stamp_path, now_unix.to_string());
}
