use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use cgp_core::{ArchiveType, DeployError, Platform, TOOL_NAME};

use crate::extract::extract_archive;
use crate::fs_utils::{atomic_symlink, current_unix_timestamp, set_executable};
use crate::InstallLayout;

/// One install attempt's inputs: an already fetched and verified archive plus
/// the resolved tag it came from.
#[derive(Debug)]
pub struct InstallRequest<'a> {
    pub platform: &'a Platform,
    pub tag: &'a str,
    pub archive_path: &'a Path,
    pub archive_type: ArchiveType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledBundle {
    pub version_dir: PathBuf,
    pub current_link: PathBuf,
    pub dest_link: PathBuf,
    /// Executable path through the Current Pointer — the path the
    /// Destination Symlink carries, not a resolved one.
    pub exe_path: PathBuf,
}

/// Final-verification failure: the Destination Symlink does not lead to a
/// usable executable. Distinguished from the other install errors because it
/// is the one condition the repair controller retries.
#[derive(Debug)]
pub struct BrokenDestination {
    pub dest_link: PathBuf,
    pub reason: String,
}

impl fmt::Display for BrokenDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "destination {} is not usable: {}",
            self.dest_link.display(),
            self.reason
        )
    }
}

impl std::error::Error for BrokenDestination {}

/// Install an extracted-and-validated bundle and atomically switch the
/// installation over to it.
///
/// Steps, in order: extract into a private scratch directory inside the
/// versions root, validate the bundle layout, publish the scratch directory
/// under its version name, swap the Current Pointer, relink the Destination
/// Symlink through it, and verify the result. A failure at any step leaves a
/// previously published version and pointer untouched; scratch artifacts are
/// removed on every exit path.
pub fn install_bundle(
    layout: &InstallLayout,
    dest_dir: &Path,
    request: &InstallRequest<'_>,
) -> Result<InstalledBundle> {
    let mut extract =
        |archive: &Path, dst: &Path| extract_archive(archive, dst, request.archive_type);
    install_bundle_with_extractor(layout, dest_dir, request, &mut extract)
}

/// Same as [`install_bundle`] with the archive extraction injected, so tests
/// can stage bundle trees without shelling out.
pub fn install_bundle_with_extractor<E>(
    layout: &InstallLayout,
    dest_dir: &Path,
    request: &InstallRequest<'_>,
    extract: &mut E,
) -> Result<InstalledBundle>
where
    E: FnMut(&Path, &Path) -> Result<()>,
{
    layout.ensure_base_dirs()?;
    ensure_dest_outside_root(layout, dest_dir)?;

    // Extracting
    let scratch = ScratchDir::create(layout)?;
    extract(request.archive_path, scratch.path())?;

    // Validating
    let exe_rel = request.platform.bundle_exe_rel_path();
    let bundle_exe = scratch.path().join(&exe_rel);
    if !bundle_exe.is_file() {
        return Err(DeployError::InvalidBundle {
            reason: format!("archive does not contain {}", exe_rel.display()),
        }
        .into());
    }
    set_executable(&bundle_exe)?;

    // Publishing
    let version_dir = publish_version_dir(layout, scratch, request.tag)?;

    // Switching
    let current_link = layout.current_link();
    switch_current(&current_link, &version_dir)?;

    // Relinking
    let exe_name = request.platform.os.exe_file_name(TOOL_NAME);
    let exe_path = current_link.join(TOOL_NAME).join(&exe_name);
    let dest_link = dest_dir.join(&exe_name);
    relink_destination(&exe_path, &dest_link)?;

    // Verifying
    verify_destination(&dest_link)?;

    Ok(InstalledBundle {
        version_dir,
        current_link,
        dest_link,
        exe_path,
    })
}

/// The destination must not live inside the bundle root: a destination under
/// `current/` or `versions/` would be deleted by the next upgrade.
fn ensure_dest_outside_root(layout: &InstallLayout, dest_dir: &Path) -> Result<()> {
    for owned in [layout.current_link(), layout.versions_dir()] {
        if dest_dir.starts_with(&owned) {
            return Err(anyhow!(
                "refusing to install into {}: it is inside the bundle root {}; \
                 set CGP_INSTALL_DEST to a directory outside it (e.g. ~/.local/bin)",
                dest_dir.display(),
                layout.root().display()
            ));
        }
    }
    Ok(())
}

/// Private extraction target inside the versions root, so the later publish
/// rename stays on one filesystem. Removed on drop unless published.
struct ScratchDir {
    path: Option<PathBuf>,
}

impl ScratchDir {
    fn create(layout: &InstallLayout) -> Result<Self> {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .context("system time is before unix epoch")?
            .as_nanos();
        let path = layout
            .versions_dir()
            .join(format!(".extract-{}-{nanos}", std::process::id()));
        fs::create_dir_all(&path)
            .with_context(|| format!("failed to create scratch dir: {}", path.display()))?;
        Ok(Self { path: Some(path) })
    }

    fn path(&self) -> &Path {
        self.path.as_deref().expect("scratch dir already published")
    }

    fn publish_to(mut self, target: &Path) -> Result<()> {
        let path = self.path.take().expect("scratch dir already published");
        match fs::rename(&path, target) {
            Ok(()) => Ok(()),
            Err(err) => {
                // rearm so the drop guard still cleans up
                let context = format!(
                    "failed to publish {} as {}",
                    path.display(),
                    target.display()
                );
                self.path = Some(path);
                Err(err).context(context)
            }
        }
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Some(path) = &self.path {
            let _ = fs::remove_dir_all(path);
        }
    }
}

/// Rename the scratch directory into its final version-directory name.
/// `latest` installs and name collisions get a timestamp suffix; an existing
/// directory is never overwritten.
fn publish_version_dir(
    layout: &InstallLayout,
    scratch: ScratchDir,
    tag: &str,
) -> Result<PathBuf> {
    let base = sanitize_version_dir_name(tag);
    let mut target = layout.version_dir(&base);

    if tag.eq_ignore_ascii_case("latest") || target.exists() {
        let stamp = current_unix_timestamp()?;
        target = layout.version_dir(&format!("{base}-{stamp}"));
        if target.exists() {
            target = layout.version_dir(&format!("{base}-{stamp}-{}", std::process::id()));
        }
    }

    scratch.publish_to(&target)?;
    Ok(target)
}

/// Tags may contain path separators (release tags are arbitrary strings);
/// the version directory name must be a single component.
pub(crate) fn sanitize_version_dir_name(tag: &str) -> String {
    let name: String = tag
        .chars()
        .map(|ch| if ch == '/' || ch == '\\' { '-' } else { ch })
        .collect();
    if name.is_empty() || name.starts_with('.') {
        format!("v{name}")
    } else {
        name
    }
}

/// Swap the Current Pointer to a new version directory. A symlink occupant
/// is replaced atomically by the rename; a stale real directory or file is
/// removed first.
fn switch_current(current_link: &Path, version_dir: &Path) -> Result<()> {
    match fs::symlink_metadata(current_link) {
        Ok(meta) if !meta.file_type().is_symlink() => {
            if meta.is_dir() {
                fs::remove_dir_all(current_link).with_context(|| {
                    format!(
                        "failed to remove stale current directory: {}",
                        current_link.display()
                    )
                })?;
            } else {
                fs::remove_file(current_link).with_context(|| {
                    format!(
                        "failed to remove stale current entry: {}",
                        current_link.display()
                    )
                })?;
            }
        }
        _ => {}
    }

    atomic_symlink(version_dir, current_link)
}

/// Point the Destination Symlink through the Current Pointer. A real
/// directory at the destination is user data and is never deleted.
fn relink_destination(exe_path: &Path, dest_link: &Path) -> Result<()> {
    if let Ok(meta) = fs::symlink_metadata(dest_link) {
        if meta.is_dir() {
            return Err(DeployError::DestinationConflict {
                path: dest_link.to_path_buf(),
            }
            .into());
        }
    }

    atomic_symlink(exe_path, dest_link)
}

/// Final check: the Destination Symlink must name an existing regular
/// executable, reached through exactly one symlinked path component (the
/// Current Pointer) — the file itself must not be another symlink.
pub fn verify_destination(dest_link: &Path) -> Result<()> {
    let broken = |reason: &str| -> anyhow::Error {
        BrokenDestination {
            dest_link: dest_link.to_path_buf(),
            reason: reason.to_string(),
        }
        .into()
    };

    let target = match fs::read_link(dest_link) {
        Ok(target) => target,
        Err(_) => return Err(broken("destination entry is missing or not a symlink")),
    };
    let target = if target.is_absolute() {
        target
    } else {
        dest_link
            .parent()
            .map(|parent| parent.join(&target))
            .unwrap_or(target)
    };

    // symlink_metadata follows intermediate components (the Current Pointer)
    // but not the final one.
    let meta = match fs::symlink_metadata(&target) {
        Ok(meta) => meta,
        Err(_) => return Err(broken("link target does not exist")),
    };
    if meta.file_type().is_symlink() {
        return Err(broken("link target is itself a symlink"));
    }
    if !meta.is_file() {
        return Err(broken("link target is not a regular file"));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if meta.permissions().mode() & 0o111 == 0 {
            return Err(broken("link target is not executable"));
        }
    }

    Ok(())
}
