use std::fs;

use anyhow::{anyhow, Context, Result};
use cgp_core::{ArchiveType, DeployError, ResolvedRelease};
use cgp_installer::{
    current_unix_timestamp, install_with_repair, remove_dir_all_if_exists,
    remove_link_or_file_if_exists, verify_destination, InstallAttempt, InstallLock, InstallRequest,
};
use cgp_release::{
    check_for_update, fetch_asset, installed_version_from_current, record_update_check,
    resolve_tag, should_check_for_update, verify_archive, FetchSource, TagResolution, Verification,
};

use crate::config::{ConfigFlags, DeployConfig};
use crate::patch::run_patch_engine;
use crate::render::TerminalRenderer;
use crate::{Cli, Commands};

pub fn run_cli(cli: Cli) -> Result<()> {
    let base_flags = ConfigFlags {
        repo: cli.repo,
        root: cli.root,
        dest: cli.dest,
        ..Default::default()
    };

    match cli.command {
        Commands::Install {
            tag,
            local_source,
            no_patch,
        } => {
            let config = DeployConfig::resolve(ConfigFlags {
                tag,
                local_source,
                ..base_flags
            })?;
            install_flow(&config, no_patch)
        }
        Commands::Upgrade {
            local_source,
            force,
            no_patch,
        } => {
            let config = DeployConfig::resolve(ConfigFlags {
                local_source,
                ..base_flags
            })?;
            upgrade_flow(&config, force, no_patch)
        }
        Commands::Check => check_flow(&DeployConfig::resolve(base_flags)?),
        Commands::Status => status_flow(&DeployConfig::resolve(base_flags)?),
        Commands::Patch => proxy_flow(&DeployConfig::resolve(base_flags)?, &["patch"]),
        Commands::Unpatch => proxy_flow(&DeployConfig::resolve(base_flags)?, &["unpatch"]),
        Commands::Uninstall { no_patch } => {
            uninstall_flow(&DeployConfig::resolve(base_flags)?, no_patch)
        }
        Commands::Doctor => doctor_flow(&DeployConfig::resolve(base_flags)?),
        Commands::Completions { shell } => {
            crate::completion::print_completions(shell);
            Ok(())
        }
    }
}

/// The full deployment sequence: resolve platform and tag, fetch, verify,
/// then install under the cross-process lock with one repair attempt.
pub(crate) fn install_flow(config: &DeployConfig, no_patch: bool) -> Result<()> {
    let renderer = TerminalRenderer::current();

    // unsupported platforms fail here, before any network access
    let asset_name = config.platform.release_asset_name()?;
    let archive_type = ArchiveType::from_asset_name(asset_name)
        .ok_or_else(|| anyhow!("unrecognized archive type for asset {asset_name}"))?;

    let resolution = resolve_release(config);
    if let Some(reason) = &resolution.fallback {
        renderer.print_warning(&format!(
            "release metadata unavailable ({reason}); using the provider's latest redirect"
        ));
    }
    let release = &resolution.release;
    renderer.print_status(
        "resolve",
        &format!(
            "{} {} for {}/{}",
            config.repo.slug(),
            release.tag,
            config.platform.os.as_str(),
            config.platform.arch.as_str()
        ),
    );

    let spinner = renderer.start_step(&format!("fetching {asset_name}"));
    let fetched = fetch_asset(
        &config.source,
        &config.layout.cache_dir(),
        &release.tag,
        asset_name,
    )?;
    spinner.finish();
    renderer.print_status("fetch", asset_name);

    match verify_archive(&fetched.archive_path, asset_name, fetched.manifest.as_ref())? {
        Verification::Verified => renderer.print_status("verify", "sha256 ok"),
        Verification::Skipped => renderer.print_status("verify", "no manifest entry; skipped"),
    }

    let lock = InstallLock::acquire(&config.layout)?;
    let request = InstallRequest {
        platform: &config.platform,
        tag: &release.tag,
        archive_path: &fetched.archive_path,
        archive_type,
    };
    let result = install_with_repair(&config.layout, &config.dest_dir, &request);
    drop(lock);
    drop(fetched);
    let (installed, attempt) = result?;

    if attempt == InstallAttempt::Repair {
        renderer.print_status(
            "repair",
            "previous installation was unusable; reinstalled from a clean slate",
        );
    }
    renderer.print_status(
        "install",
        &format!(
            "{} -> {}",
            installed.dest_link.display(),
            installed.version_dir.display()
        ),
    );

    if !no_patch {
        run_patch_engine(&installed.dest_link, &["auto", "install"])
            .context("installed, but the tool's auto-patch step failed")?;
        renderer.print_status("patch", "auto install applied");
    }

    Ok(())
}

fn resolve_release(config: &DeployConfig) -> TagResolution {
    match &config.source {
        FetchSource::Remote(repo) => resolve_tag(repo, &config.tag),
        // local mode never queries metadata; the configured tag is used as-is
        FetchSource::LocalDir(_) => TagResolution {
            release: ResolvedRelease::from_tag(config.tag.as_str()),
            fallback: None,
        },
    }
}

fn upgrade_flow(config: &DeployConfig, force: bool, no_patch: bool) -> Result<()> {
    let renderer = TerminalRenderer::current();

    if let FetchSource::Remote(repo) = &config.source {
        let stamp = config.layout.last_update_check_path();
        let now = current_unix_timestamp()?;
        if !force && !should_check_for_update(&stamp, now) {
            renderer.print_status("check", "checked recently; use --force to override");
            return Ok(());
        }

        let installed_version = installed_version_from_current(&config.layout.current_link());
        let status = check_for_update(repo, installed_version.as_deref());
        record_update_check(&stamp, now);
        if let Some(reason) = &status.resolution_fallback {
            renderer.print_warning(&format!("release metadata unavailable ({reason})"));
        }

        match status.update_available {
            Some(false) if !force => {
                renderer.print_status(
                    "check",
                    &format!(
                        "already up to date ({})",
                        status.installed_version.as_deref().unwrap_or("unknown")
                    ),
                );
                return Ok(());
            }
            Some(false) => renderer.print_status("check", "already up to date; reinstalling"),
            Some(true) => renderer.print_status(
                "check",
                &format!(
                    "{} -> {}",
                    status.installed_version.as_deref().unwrap_or("none"),
                    status
                        .remote_version
                        .as_deref()
                        .unwrap_or(&status.remote_tag)
                ),
            ),
            None => renderer.print_status("check", "version comparison inconclusive; installing"),
        }
    }

    install_flow(config, no_patch)
}

fn check_flow(config: &DeployConfig) -> Result<()> {
    let renderer = TerminalRenderer::current();

    let FetchSource::Remote(repo) = &config.source else {
        renderer.print_status("check", "local source mode; no remote check");
        return Ok(());
    };

    let installed_version = installed_version_from_current(&config.layout.current_link());
    let status = check_for_update(repo, installed_version.as_deref());
    record_update_check(
        &config.layout.last_update_check_path(),
        current_unix_timestamp()?,
    );

    renderer.print_status("repo", &status.repo);
    renderer.print_status(
        "installed",
        status.installed_version.as_deref().unwrap_or("not installed"),
    );
    renderer.print_status("remote", &status.remote_tag);
    if let Some(reason) = &status.resolution_fallback {
        renderer.print_warning(&format!("release metadata unavailable: {reason}"));
    }
    match status.update_available {
        Some(true) => renderer.print_status("update", "available (run 'cgp-deploy upgrade')"),
        Some(false) => renderer.print_status("update", "up to date"),
        None => renderer.print_status("update", "unknown"),
    }

    Ok(())
}

fn status_flow(config: &DeployConfig) -> Result<()> {
    let renderer = TerminalRenderer::current();

    renderer.print_status("root", &config.layout.root().display().to_string());
    let current = config.layout.current_link();
    match fs::read_link(&current) {
        Ok(target) => renderer.print_status("current", &target.display().to_string()),
        Err(_) => renderer.print_status("current", "absent"),
    }
    if let Some(version) = installed_version_from_current(&current) {
        renderer.print_status("version", &version);
    }

    let dest_link = config.dest_link();
    match verify_destination(&dest_link) {
        Ok(()) => {
            renderer.print_status("destination", &format!("{} ok", dest_link.display()));
            run_patch_engine(&dest_link, &["status"])?;
        }
        Err(err) => renderer.print_warning(&format!("{err:#}")),
    }

    Ok(())
}

fn proxy_flow(config: &DeployConfig, args: &[&str]) -> Result<()> {
    let dest_link = config.dest_link();
    verify_destination(&dest_link)
        .context("cgp is not installed; run 'cgp-deploy install' first")?;
    run_patch_engine(&dest_link, args)
}

fn uninstall_flow(config: &DeployConfig, no_patch: bool) -> Result<()> {
    let renderer = TerminalRenderer::current();
    let dest_link = config.dest_link();

    if !no_patch && verify_destination(&dest_link).is_ok() {
        if let Err(err) = run_patch_engine(&dest_link, &["auto", "uninstall"]) {
            renderer.print_warning(&format!(
                "auto uninstall failed: {err:#}; removing the installation anyway"
            ));
        }
    }

    match fs::symlink_metadata(&dest_link) {
        Ok(meta) if meta.file_type().is_symlink() => {
            remove_link_or_file_if_exists(&dest_link)?;
            renderer.print_status("remove", &dest_link.display().to_string());
        }
        Ok(meta) if meta.is_dir() => {
            return Err(DeployError::DestinationConflict { path: dest_link }.into());
        }
        Ok(_) => {
            return Err(anyhow!(
                "refusing to remove {}: it is a regular file, not a symlink this tool manages",
                dest_link.display()
            ));
        }
        Err(_) => {}
    }

    remove_dir_all_if_exists(config.layout.root())?;
    renderer.print_status("remove", &config.layout.root().display().to_string());

    Ok(())
}

fn doctor_flow(config: &DeployConfig) -> Result<()> {
    let renderer = TerminalRenderer::current();

    renderer.print_status("repo", &config.repo.slug());
    renderer.print_status("tag", config.tag.as_str());
    renderer.print_status("root", &config.layout.root().display().to_string());
    renderer.print_status("dest", &config.dest_dir.display().to_string());
    if let FetchSource::LocalDir(dir) = &config.source {
        renderer.print_status("source", &format!("local directory {}", dir.display()));
    }
    renderer.print_status(
        "platform",
        &format!(
            "{}/{}",
            config.platform.os.as_str(),
            config.platform.arch.as_str()
        ),
    );
    match config.platform.release_asset_name() {
        Ok(asset) => renderer.print_status("asset", asset),
        Err(err) => renderer.print_warning(&err.to_string()),
    }

    let lock_dir = config.layout.lock_dir();
    if lock_dir.exists() {
        let owner = fs::read_to_string(lock_dir.join("owner")).unwrap_or_default();
        renderer.print_warning(&format!(
            "install lock present at {} ({}); remove it if no install is running",
            lock_dir.display(),
            owner.trim().replace('\n', ", ")
        ));
    }

    Ok(())
}
