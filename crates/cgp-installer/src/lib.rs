mod extract;
mod fs_utils;
mod install;
mod layout;
mod lock;
mod repair;

pub use extract::extract_archive;
pub use fs_utils::{
    atomic_symlink, current_unix_timestamp, remove_dir_all_if_exists, remove_link_or_file_if_exists,
};
pub use install::{
    install_bundle, install_bundle_with_extractor, verify_destination, BrokenDestination,
    InstallRequest, InstalledBundle,
};
pub use layout::{default_dest_dir, default_install_root, InstallLayout};
pub use lock::InstallLock;
pub use repair::{install_with_repair, install_with_repair_with_extractor, wipe_installation, InstallAttempt};
