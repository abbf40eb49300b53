mod fetch;
mod repo;
mod resolve;
mod update;
mod verify;

pub use fetch::{
    fetch_asset, fetch_from_local_dir, fetch_from_remote, FetchSource, FetchedAsset,
    CHECKSUMS_ASSET_NAME,
};
pub use repo::{GithubRepo, DEFAULT_GITHUB_REPO, ENV_GITHUB_REPO};
pub use resolve::{resolve_tag, resolve_tag_with_fetch, TagResolution};
pub use update::{
    check_for_update, check_for_update_with_fetch, installed_version_from_current,
    record_update_check, should_check_for_update, UpdateStatus, UPDATE_CHECK_INTERVAL,
};
pub use verify::{verify_archive, Verification};

#[cfg(test)]
mod tests;
