mod archive;
mod error;
mod manifest;
mod platform;
mod release;

pub use archive::ArchiveType;
pub use error::DeployError;
pub use manifest::{ChecksumEntry, ChecksumManifest};
pub use platform::{Arch, Os, Platform};
pub use release::{is_version_newer, ReleaseTag, ResolvedRelease};

/// Name of the managed tool; also the bundle directory and executable stem
/// inside every release archive.
pub const TOOL_NAME: &str = "cgp";
