use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cgp_core::DeployError;

use crate::fs_utils::hostname;
use crate::InstallLayout;

/// Cross-process install mutex: a directory at `<root>/.lock` whose creation
/// is the atomic acquisition. Contention is reported immediately as
/// `LockHeld` — there is no wait loop, so unattended runs never stall.
///
/// The guard removes the directory when dropped, on success and failure
/// alike. The recorded owner pid/host are diagnostics only.
#[derive(Debug)]
pub struct InstallLock {
    dir: PathBuf,
}

impl InstallLock {
    pub fn acquire(layout: &InstallLayout) -> Result<Self> {
        fs::create_dir_all(layout.root())
            .with_context(|| format!("failed to create {}", layout.root().display()))?;

        let dir = layout.lock_dir();
        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                return Err(DeployError::LockHeld { lock_dir: dir }.into());
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to acquire install lock at {}", dir.display()));
            }
        }

        let owner = format!("pid={}\nhost={}\n", std::process::id(), hostname());
        let _ = fs::write(dir.join("owner"), owner);

        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.dir);
    }
}
