use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Filesystem layout of one installation root:
///
/// ```text
/// <root>/versions/<tag>/cgp/cgp    extracted bundles, one per version
/// <root>/current                   symlink to the active version directory
/// <root>/cache                     per-process download staging
/// <root>/.lock                     transient install mutex directory
/// <root>/.last-update-check        update-check throttle stamp
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    root: PathBuf,
}

impl InstallLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    pub fn version_dir(&self, name: &str) -> PathBuf {
        self.versions_dir().join(name)
    }

    pub fn current_link(&self) -> PathBuf {
        self.root.join("current")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    pub fn lock_dir(&self) -> PathBuf {
        self.root.join(".lock")
    }

    pub fn last_update_check_path(&self) -> PathBuf {
        self.root.join(".last-update-check")
    }

    pub fn ensure_base_dirs(&self) -> Result<()> {
        for dir in [self.root.clone(), self.versions_dir(), self.cache_dir()] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}

pub fn default_install_root() -> Result<PathBuf> {
    if cfg!(windows) {
        let app_data = std::env::var("LOCALAPPDATA")
            .context("LOCALAPPDATA is not set; cannot resolve the install root")?;
        return Ok(PathBuf::from(app_data).join("cgp"));
    }

    let home = std::env::var("HOME").context("HOME is not set; cannot resolve the install root")?;
    Ok(PathBuf::from(home).join(".local").join("lib").join("cgp"))
}

pub fn default_dest_dir() -> Result<PathBuf> {
    if cfg!(windows) {
        let app_data = std::env::var("LOCALAPPDATA")
            .context("LOCALAPPDATA is not set; cannot resolve the destination directory")?;
        return Ok(PathBuf::from(app_data).join("cgp"));
    }

    let home =
        std::env::var("HOME").context("HOME is not set; cannot resolve the destination directory")?;
    Ok(PathBuf::from(home).join(".local").join("bin"))
}
