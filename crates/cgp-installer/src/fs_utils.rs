use std::fs;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};

/// Symlink-aware removal: a dangling symlink still gets removed.
pub fn remove_link_or_file_if_exists(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => Err(anyhow!(
            "refusing to remove directory as file: {}",
            path.display()
        )),
        Ok(_) => fs::remove_file(path)
            .with_context(|| format!("failed to remove {}", path.display())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => {
            Err(err).with_context(|| format!("failed to inspect {}", path.display()))
        }
    }
}

pub fn remove_dir_all_if_exists(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("failed to remove {}", path.display())),
    }
}

pub fn current_unix_timestamp() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system time is before unix epoch")?
        .as_secs())
}

fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link).with_context(|| {
            format!(
                "failed to create symlink {} -> {}",
                link.display(),
                target.display()
            )
        })
    }

    #[cfg(windows)]
    {
        let result = if target.is_dir() {
            std::os::windows::fs::symlink_dir(target, link)
        } else {
            std::os::windows::fs::symlink_file(target, link)
        };
        result.with_context(|| {
            format!(
                "failed to create symlink {} -> {}",
                link.display(),
                target.display()
            )
        })
    }
}

/// Publish-then-swap symlink update: build the new link under a temporary
/// name, then move it over `link` so readers observe either the old target
/// or the new one. A non-symlink occupant of `link` is the caller's problem
/// and fails the rename rather than being clobbered here.
pub fn atomic_symlink(target: &Path, link: &Path) -> Result<()> {
    if let Ok(existing) = fs::read_link(link) {
        if existing == target {
            return Ok(());
        }
    }
    if target == link {
        return Err(anyhow!(
            "refusing to create self-referential symlink: {}",
            link.display()
        ));
    }

    if let Some(parent) = link.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let link_name = link
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("invalid symlink path: {}", link.display()))?;
    let tmp = link.with_file_name(format!(".{}.{}.tmp", link_name, std::process::id()));
    remove_link_or_file_if_exists(&tmp)?;
    create_symlink(target, &tmp)?;

    // Windows cannot rename over an existing entry; the swap degrades to
    // remove-then-rename there.
    #[cfg(windows)]
    remove_link_or_file_if_exists(link)?;

    if let Err(err) = fs::rename(&tmp, link) {
        let _ = fs::remove_file(&tmp);
        return Err(err).with_context(|| {
            format!(
                "failed to move symlink {} into place at {}",
                tmp.display(),
                link.display()
            )
        });
    }
    Ok(())
}

pub(crate) fn set_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut permissions = fs::metadata(path)
            .with_context(|| format!("failed to stat {}", path.display()))?
            .permissions();
        permissions.set_mode(permissions.mode() | 0o755);
        fs::set_permissions(path, permissions)
            .with_context(|| format!("failed to set executable mode on {}", path.display()))?;
    }

    #[cfg(not(unix))]
    let _ = path;

    Ok(())
}

pub(crate) fn hostname() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "unknown-host".to_string())
}
