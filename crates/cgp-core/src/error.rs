use std::path::PathBuf;

use thiserror::Error;

/// Fatal deployment failures.
///
/// Each variant maps to a stable process exit code, since unattended
/// installers parse them:
///
/// | variant | exit code |
/// |---|---|
/// | `UnsupportedPlatform` | 2 |
/// | `DownloadUnavailable` | 3 |
/// | `ChecksumMismatch` | 4 |
/// | `InvalidBundle` | 5 |
/// | `DestinationConflict` | 6 |
/// | `LockHeld` | 7 |
/// | `InstallFailed` | 8 |
///
/// Anything outside the taxonomy exits 1. Messages name the remediation
/// because these surface in piped installers with no interactive session.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error(
        "unsupported platform {os}/{arch}: release bundles exist for \
         linux/macos on x86_64 and arm64, and windows on x86_64"
    )]
    UnsupportedPlatform { os: String, arch: String },

    #[error(
        "no download tool available: install curl or wget (powershell on \
         Windows) and retry"
    )]
    DownloadUnavailable,

    #[error(
        "checksum mismatch for {asset}: expected {expected}, got {actual}; \
         the download is corrupt or tampered with, retry or pin an explicit \
         release tag"
    )]
    ChecksumMismatch {
        asset: String,
        expected: String,
        actual: String,
    },

    #[error("invalid bundle: {reason}; the release asset is broken, report it upstream")]
    InvalidBundle { reason: String },

    #[error(
        "destination {path} already exists and is a real directory; move it \
         out of the way and retry"
    )]
    DestinationConflict { path: PathBuf },

    #[error(
        "another install or upgrade is already in progress (lock: {lock_dir}); \
         if none is running, remove that directory and retry"
    )]
    LockHeld { lock_dir: PathBuf },

    #[error(
        "install failed: {dest} is not usable after a clean-slate retry; \
         remove the installation root manually and reinstall"
    )]
    InstallFailed { dest: PathBuf },
}

impl DeployError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::UnsupportedPlatform { .. } => 2,
            Self::DownloadUnavailable => 3,
            Self::ChecksumMismatch { .. } => 4,
            Self::InvalidBundle { .. } => 5,
            Self::DestinationConflict { .. } => 6,
            Self::LockHeld { .. } => 7,
            Self::InstallFailed { .. } => 8,
        }
    }
}
