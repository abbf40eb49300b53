use std::fs;
use std::path::Path;

use anyhow::Result;
use cgp_core::{DeployError, TOOL_NAME};

use crate::extract::extract_archive;
use crate::fs_utils::{remove_dir_all_if_exists, remove_link_or_file_if_exists};
use crate::install::{
    install_bundle_with_extractor, BrokenDestination, InstallRequest, InstalledBundle,
};
use crate::InstallLayout;

/// The recovery policy is two explicit states, not a loop with a counter: a
/// first attempt, then at most one clean-slate repair attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallAttempt {
    First,
    Repair,
}

/// Install, and if the freshly installed destination fails its final
/// verification, wipe the installation root state and run the whole install
/// sequence once more. Any failure of the repair attempt is terminal
/// `InstallFailed`; all other first-attempt errors propagate untouched — a
/// checksum or bundle problem is not something a wipe can fix.
pub fn install_with_repair(
    layout: &InstallLayout,
    dest_dir: &Path,
    request: &InstallRequest<'_>,
) -> Result<(InstalledBundle, InstallAttempt)> {
    let mut extract =
        |archive: &Path, dst: &Path| extract_archive(archive, dst, request.archive_type);
    install_with_repair_with_extractor(layout, dest_dir, request, &mut extract)
}

pub fn install_with_repair_with_extractor<E>(
    layout: &InstallLayout,
    dest_dir: &Path,
    request: &InstallRequest<'_>,
    extract: &mut E,
) -> Result<(InstalledBundle, InstallAttempt)>
where
    E: FnMut(&Path, &Path) -> Result<()>,
{
    match install_bundle_with_extractor(layout, dest_dir, request, extract) {
        Ok(bundle) => Ok((bundle, InstallAttempt::First)),
        Err(err) if err.downcast_ref::<BrokenDestination>().is_some() => {
            wipe_installation(layout)?;
            match install_bundle_with_extractor(layout, dest_dir, request, extract) {
                Ok(bundle) => Ok((bundle, InstallAttempt::Repair)),
                Err(err) => {
                    let exe_name = request.platform.os.exe_file_name(TOOL_NAME);
                    Err(err.context(DeployError::InstallFailed {
                        dest: dest_dir.join(exe_name),
                    }))
                }
            }
        }
        Err(err) => Err(err),
    }
}

/// Clean-slate wipe before a repair attempt: removes the Current Pointer and
/// the entire versions root. The destination directory is never touched.
pub fn wipe_installation(layout: &InstallLayout) -> Result<()> {
    let current = layout.current_link();
    match fs::symlink_metadata(&current) {
        Ok(meta) if !meta.file_type().is_symlink() && meta.is_dir() => {
            remove_dir_all_if_exists(&current)?;
        }
        Ok(_) => remove_link_or_file_if_exists(&current)?,
        Err(_) => {}
    }
    remove_dir_all_if_exists(&layout.versions_dir())
}
