use std::path::Path;

use anyhow::Result;
use cgp_core::{ChecksumManifest, DeployError};
use cgp_security::sha256_hex_file;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Verified,
    /// No manifest, or no entry for this asset. Older releases publish no
    /// `checksums.txt`, so this is a designed degradation, not an error.
    Skipped,
}

/// Verify the downloaded archive against its manifest entry. "No manifest"
/// and "manifest mismatch" are never conflated: a present entry is enforced,
/// an absent one explicitly bypasses the check.
pub fn verify_archive(
    archive_path: &Path,
    asset_name: &str,
    manifest: Option<&ChecksumManifest>,
) -> Result<Verification> {
    let Some(expected) = manifest.and_then(|manifest| manifest.digest_for(asset_name)) else {
        return Ok(Verification::Skipped);
    };

    let actual = sha256_hex_file(archive_path)?;
    if actual.eq_ignore_ascii_case(expected) {
        Ok(Verification::Verified)
    } else {
        Err(DeployError::ChecksumMismatch {
            asset: asset_name.to_string(),
            expected: expected.to_string(),
            actual,
        }
        .into())
    }
}
