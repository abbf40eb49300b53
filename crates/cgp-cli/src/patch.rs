use std::path::Path;
use std::process::Command;

use anyhow::{anyhow, Context, Result};

/// The patch engine is the installed tool itself. Its stdio passes straight
/// through; only the exit code matters here (0 = success).
pub fn run_patch_engine(dest_exe: &Path, args: &[&str]) -> Result<()> {
    let status = Command::new(dest_exe)
        .args(args)
        .status()
        .with_context(|| format!("failed to launch {}", dest_exe.display()))?;
    if status.success() {
        return Ok(());
    }

    Err(anyhow!(
        "'{} {}' exited with {}",
        dest_exe.display(),
        args.join(" "),
        status
    ))
}
