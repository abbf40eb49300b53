use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{anyhow, Context, Result};
use cgp_core::{ChecksumManifest, DeployError};

use crate::GithubRepo;

pub const CHECKSUMS_ASSET_NAME: &str = "checksums.txt";

/// Where release files come from: the GitHub release, or a local directory
/// for offline installs and tests. Both yield the same downstream contract.
#[derive(Debug, Clone)]
pub enum FetchSource {
    Remote(GithubRepo),
    LocalDir(PathBuf),
}

/// A fetched release archive plus its best-effort checksum manifest, staged
/// in a private per-process directory on the destination filesystem. The
/// directory is removed when this is dropped, success or failure.
#[derive(Debug)]
pub struct FetchedAsset {
    staging_dir: PathBuf,
    pub archive_path: PathBuf,
    pub manifest: Option<ChecksumManifest>,
}

impl Drop for FetchedAsset {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.staging_dir);
    }
}

/// Fetch the asset archive (fatal on failure) and the checksum manifest
/// (best-effort) for a resolved tag.
pub fn fetch_asset(
    source: &FetchSource,
    cache_dir: &Path,
    tag: &str,
    asset_name: &str,
) -> Result<FetchedAsset> {
    match source {
        FetchSource::LocalDir(dir) => fetch_from_local_dir(dir, cache_dir, asset_name),
        FetchSource::Remote(repo) => {
            let mut download = download_with_transport_tool;
            fetch_from_remote(repo, cache_dir, tag, asset_name, &mut download)
        }
    }
}

pub fn fetch_from_remote<D>(
    repo: &GithubRepo,
    cache_dir: &Path,
    tag: &str,
    asset_name: &str,
    download: &mut D,
) -> Result<FetchedAsset>
where
    D: FnMut(&str, &Path) -> Result<()>,
{
    let staging_dir = create_staging_dir(cache_dir)?;
    let archive_path = staging_dir.join(asset_name);

    let url = repo.asset_download_url(tag, asset_name);
    if let Err(err) = download_into(&url, &archive_path, download) {
        let _ = fs::remove_dir_all(&staging_dir);
        return Err(err.context(format!("failed to download {url}")));
    }

    let manifest_path = staging_dir.join(CHECKSUMS_ASSET_NAME);
    let manifest_url = repo.asset_download_url(tag, CHECKSUMS_ASSET_NAME);
    let manifest = match download_into(&manifest_url, &manifest_path, download) {
        Ok(()) => read_manifest(&manifest_path),
        // older releases publish no manifest; verification degrades to skipped
        Err(_) => None,
    };

    Ok(FetchedAsset {
        staging_dir,
        archive_path,
        manifest,
    })
}

/// Local-directory mode: same contract, different source. The archive is
/// copied into the private staging dir; a missing manifest is not an error.
pub fn fetch_from_local_dir(
    source_dir: &Path,
    cache_dir: &Path,
    asset_name: &str,
) -> Result<FetchedAsset> {
    let source_archive = source_dir.join(asset_name);
    if !source_archive.is_file() {
        return Err(anyhow!(
            "local source {} has no {asset_name}",
            source_dir.display()
        ));
    }

    let staging_dir = create_staging_dir(cache_dir)?;
    let archive_path = staging_dir.join(asset_name);
    if let Err(err) = fs::copy(&source_archive, &archive_path) {
        let _ = fs::remove_dir_all(&staging_dir);
        return Err(err).with_context(|| {
            format!(
                "failed to copy {} to {}",
                source_archive.display(),
                archive_path.display()
            )
        });
    }

    let manifest = read_manifest(&source_dir.join(CHECKSUMS_ASSET_NAME));

    Ok(FetchedAsset {
        staging_dir,
        archive_path,
        manifest,
    })
}

fn read_manifest(path: &Path) -> Option<ChecksumManifest> {
    let raw = fs::read_to_string(path).ok()?;
    Some(ChecksumManifest::parse(&raw))
}

fn create_staging_dir(cache_dir: &Path) -> Result<PathBuf> {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .context("system time is before unix epoch")?
        .as_nanos();
    let dir = cache_dir.join(format!(".fetch-{}-{nanos}", std::process::id()));
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create staging dir: {}", dir.display()))?;
    Ok(dir)
}

/// Download to `<out>.part`, then rename into place so a partial download is
/// never mistaken for a complete one.
fn download_into<D>(url: &str, out_path: &Path, download: &mut D) -> Result<()>
where
    D: FnMut(&str, &Path) -> Result<()>,
{
    let file_name = out_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("asset");
    let part_path = out_path.with_file_name(format!("{file_name}.part"));

    if let Err(err) = download(url, &part_path) {
        let _ = fs::remove_file(&part_path);
        return Err(err);
    }

    fs::rename(&part_path, out_path).with_context(|| {
        format!(
            "failed to move downloaded file into place: {}",
            out_path.display()
        )
    })
}

/// The transport chain: `curl` then `wget` on Unix, `powershell` on Windows.
/// Every candidate missing from PATH is `DownloadUnavailable`; a present
/// tool failing is an ordinary fatal download error.
fn download_with_transport_tool(url: &str, out_path: &Path) -> Result<()> {
    if cfg!(windows) {
        return download_with_powershell(url, out_path).map_err(|err| {
            if error_chain_has_not_found(&err) {
                anyhow::Error::from(DeployError::DownloadUnavailable)
            } else {
                err
            }
        });
    }

    match download_with_curl(url, out_path) {
        Ok(()) => Ok(()),
        Err(curl_err) => match download_with_wget(url, out_path) {
            Ok(()) => Ok(()),
            Err(wget_err) => {
                if error_chain_has_not_found(&curl_err) && error_chain_has_not_found(&wget_err) {
                    return Err(DeployError::DownloadUnavailable.into());
                }
                // report the tool that actually ran
                if error_chain_has_not_found(&wget_err) {
                    Err(curl_err)
                } else {
                    Err(wget_err)
                }
            }
        },
    }
}

fn download_with_curl(url: &str, out_path: &Path) -> Result<()> {
    let mut command = Command::new("curl");
    command
        .arg("-fsSL")
        .arg("--retry")
        .arg("2")
        .arg("--connect-timeout")
        .arg("60")
        .arg("-o")
        .arg(out_path)
        .arg(url);
    run_command(&mut command, "curl download failed")
}

fn download_with_wget(url: &str, out_path: &Path) -> Result<()> {
    let mut command = Command::new("wget");
    command
        .arg("-q")
        .arg("--timeout=60")
        .arg("-O")
        .arg(out_path)
        .arg(url);
    run_command(&mut command, "wget download failed")
}

fn download_with_powershell(url: &str, out_path: &Path) -> Result<()> {
    let mut command = Command::new("powershell");
    command.arg("-NoProfile").arg("-Command").arg(format!(
        "Invoke-WebRequest -Uri '{}' -OutFile '{}'",
        url.replace('\'', "''"),
        out_path.to_string_lossy().replace('\'', "''")
    ));
    run_command(&mut command, "powershell download failed")
}

fn run_command(command: &mut Command, context_message: &str) -> Result<()> {
    let output = command
        .output()
        .with_context(|| format!("{context_message}: command failed to start"))?;
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    Err(anyhow!(
        "{context_message}: status={} stdout='{}' stderr='{}'",
        output.status,
        stdout.trim(),
        stderr.trim()
    ))
}

fn error_chain_has_not_found(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<io::Error>()
            .is_some_and(|io_err| io_err.kind() == io::ErrorKind::NotFound)
    })
}
