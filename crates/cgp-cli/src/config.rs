use std::path::PathBuf;

use anyhow::Result;
use cgp_core::{Platform, ReleaseTag};
use cgp_installer::{default_dest_dir, default_install_root, InstallLayout};
use cgp_release::{FetchSource, GithubRepo, DEFAULT_GITHUB_REPO, ENV_GITHUB_REPO};

pub const ENV_RELEASE_TAG: &str = "CGP_RELEASE_TAG";
pub const ENV_INSTALL_ROOT: &str = "CGP_INSTALL_ROOT";
pub const ENV_INSTALL_DEST: &str = "CGP_INSTALL_DEST";
pub const ENV_LOCAL_SOURCE: &str = "CGP_LOCAL_SOURCE";
pub const ENV_OS: &str = "CGP_OS";
pub const ENV_ARCH: &str = "CGP_ARCH";

/// Per-invocation flag values; everything is optional and falls back to the
/// environment, then to the platform defaults.
#[derive(Debug, Default, Clone)]
pub struct ConfigFlags {
    pub repo: Option<String>,
    pub root: Option<PathBuf>,
    pub dest: Option<PathBuf>,
    pub tag: Option<String>,
    pub local_source: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub repo: GithubRepo,
    pub tag: ReleaseTag,
    pub layout: InstallLayout,
    pub dest_dir: PathBuf,
    pub source: FetchSource,
    pub platform: Platform,
}

impl DeployConfig {
    pub fn resolve(flags: ConfigFlags) -> Result<Self> {
        Self::resolve_with_env(flags, |name| std::env::var(name).ok())
    }

    /// Environment lookup is injected so tests stay free of process-global
    /// state.
    pub fn resolve_with_env<F>(flags: ConfigFlags, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_non_empty = |name: &str| -> Option<String> {
            env(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let repo_spec = flags
            .repo
            .or_else(|| env_non_empty(ENV_GITHUB_REPO))
            .unwrap_or_else(|| DEFAULT_GITHUB_REPO.to_string());
        let repo = GithubRepo::parse(&repo_spec)?;

        let tag = flags
            .tag
            .or_else(|| env_non_empty(ENV_RELEASE_TAG))
            .map(|raw| ReleaseTag::parse(&raw))
            .unwrap_or(ReleaseTag::Latest);

        let root = match flags.root.or_else(|| env_non_empty(ENV_INSTALL_ROOT).map(PathBuf::from))
        {
            Some(root) => root,
            None => default_install_root()?,
        };
        let dest_dir =
            match flags.dest.or_else(|| env_non_empty(ENV_INSTALL_DEST).map(PathBuf::from)) {
                Some(dest) => dest,
                None => default_dest_dir()?,
            };

        let local_source = flags
            .local_source
            .or_else(|| env_non_empty(ENV_LOCAL_SOURCE).map(PathBuf::from));
        let source = match local_source {
            Some(dir) => FetchSource::LocalDir(dir),
            None => FetchSource::Remote(repo.clone()),
        };

        let os_override = env_non_empty(ENV_OS);
        let arch_override = env_non_empty(ENV_ARCH);
        let platform = Platform::detect(os_override.as_deref(), arch_override.as_deref())?;

        Ok(Self {
            repo,
            tag,
            layout: InstallLayout::new(root),
            dest_dir,
            source,
            platform,
        })
    }

    /// Path of the user-visible symlink this configuration manages.
    pub fn dest_link(&self) -> PathBuf {
        self.dest_dir
            .join(self.platform.os.exe_file_name(cgp_core::TOOL_NAME))
    }
}
