use super::*;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use cgp_core::{ChecksumManifest, DeployError, ReleaseTag};
use cgp_security::sha256_hex;

fn test_dir(label: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("cgp-release-{label}-{nanos}"));
    fs::create_dir_all(&dir).expect("must create test dir");
    dir
}

fn test_repo() -> GithubRepo {
    GithubRepo::parse("baaaaaaaka/cursor_gui_patch").expect("must parse")
}

#[test]
fn repo_parse_accepts_owner_name_only() {
    let repo = GithubRepo::parse(" owner/name ").expect("must parse");
    assert_eq!(repo.owner, "owner");
    assert_eq!(repo.name, "name");
    assert_eq!(repo.slug(), "owner/name");

    GithubRepo::parse("no-slash").expect_err("must reject");
    GithubRepo::parse("/name").expect_err("must reject");
    GithubRepo::parse("owner/").expect_err("must reject");
    GithubRepo::parse("a/b/c").expect_err("must reject");
}

#[test]
fn download_urls_use_latest_redirect_for_fallback_tag() {
    let repo = test_repo();
    assert_eq!(
        repo.asset_download_url("v0.1.0", "cgp-linux-x86_64.tar.gz"),
        "https://github.com/baaaaaaaka/cursor_gui_patch/releases/download/v0.1.0/cgp-linux-x86_64.tar.gz"
    );
    assert_eq!(
        repo.asset_download_url("latest", "cgp-linux-x86_64.tar.gz"),
        "https://github.com/baaaaaaaka/cursor_gui_patch/releases/latest/download/cgp-linux-x86_64.tar.gz"
    );
    assert_eq!(
        repo.latest_release_api_url(),
        "https://api.github.com/repos/baaaaaaaka/cursor_gui_patch/releases/latest"
    );
}

#[test]
fn explicit_tag_is_used_verbatim_without_metadata_query() {
    let repo = test_repo();
    let resolution = resolve_tag_with_fetch(
        &repo,
        &ReleaseTag::Explicit("v0.9.9".to_string()),
        |_| panic!("explicit tags must not hit the network"),
    );
    assert_eq!(resolution.release.tag, "v0.9.9");
    assert_eq!(resolution.release.version.as_deref(), Some("0.9.9"));
    assert!(resolution.fallback.is_none());
}

#[test]
fn latest_tag_resolves_from_release_metadata() {
    let repo = test_repo();
    let resolution = resolve_tag_with_fetch(&repo, &ReleaseTag::Latest, |url| {
        assert!(url.ends_with("/releases/latest"), "unexpected url: {url}");
        Ok(r#"{"tag_name": "v1.4.0", "name": "release 1.4"}"#.to_string())
    });
    assert_eq!(resolution.release.tag, "v1.4.0");
    assert_eq!(resolution.release.version.as_deref(), Some("1.4.0"));
    assert!(resolution.fallback.is_none());
}

#[test]
fn metadata_failure_falls_back_to_literal_latest() {
    let repo = test_repo();

    let unreachable =
        resolve_tag_with_fetch(&repo, &ReleaseTag::Latest, |_| Err(anyhow!("connection refused")));
    assert_eq!(unreachable.release.tag, "latest");
    assert!(unreachable.release.version.is_none());
    assert!(unreachable
        .fallback
        .as_deref()
        .expect("must record fallback reason")
        .contains("connection refused"));

    let malformed =
        resolve_tag_with_fetch(&repo, &ReleaseTag::Latest, |_| Ok("<html>rate limited".to_string()));
    assert_eq!(malformed.release.tag, "latest");
    assert!(malformed.fallback.is_some());

    let missing_field =
        resolve_tag_with_fetch(&repo, &ReleaseTag::Latest, |_| Ok(r#"{"name": "x"}"#.to_string()));
    assert_eq!(missing_field.release.tag, "latest");
    assert!(missing_field
        .fallback
        .as_deref()
        .expect("must record fallback reason")
        .contains("tag_name"));
}

#[test]
fn local_dir_fetch_copies_archive_and_reads_manifest() {
    let source = test_dir("local-source");
    let cache = test_dir("local-cache");
    fs::write(source.join("cgp-linux-x86_64.tar.gz"), b"archive bytes")
        .expect("must write archive");
    fs::write(
        source.join("checksums.txt"),
        format!("{}  cgp-linux-x86_64.tar.gz\n", sha256_hex(b"archive bytes")),
    )
    .expect("must write manifest");

    let fetched = fetch_from_local_dir(&source, &cache, "cgp-linux-x86_64.tar.gz")
        .expect("must fetch locally");
    assert_eq!(
        fs::read(&fetched.archive_path).expect("must read staged archive"),
        b"archive bytes"
    );
    let manifest = fetched.manifest.as_ref().expect("manifest must be present");
    assert!(manifest.digest_for("cgp-linux-x86_64.tar.gz").is_some());

    let staging = fetched.archive_path.parent().expect("staging dir").to_path_buf();
    assert!(staging.starts_with(&cache));
    drop(fetched);
    assert!(!staging.exists(), "staging dir must be cleaned up on drop");

    let _ = fs::remove_dir_all(&source);
    let _ = fs::remove_dir_all(&cache);
}

#[test]
fn local_dir_fetch_without_manifest_degrades_to_none() {
    let source = test_dir("local-nomanifest");
    let cache = test_dir("local-nomanifest-cache");
    fs::write(source.join("cgp-linux-x86_64.tar.gz"), b"bytes").expect("must write archive");

    let fetched = fetch_from_local_dir(&source, &cache, "cgp-linux-x86_64.tar.gz")
        .expect("must fetch locally");
    assert!(fetched.manifest.is_none());

    drop(fetched);
    let _ = fs::remove_dir_all(&source);
    let _ = fs::remove_dir_all(&cache);
}

#[test]
fn local_dir_fetch_fails_without_archive() {
    let source = test_dir("local-missing");
    let cache = test_dir("local-missing-cache");

    let err = fetch_from_local_dir(&source, &cache, "cgp-linux-x86_64.tar.gz")
        .expect_err("missing archive must be fatal");
    assert!(format!("{err:#}").contains("cgp-linux-x86_64.tar.gz"));

    let _ = fs::remove_dir_all(&source);
    let _ = fs::remove_dir_all(&cache);
}

#[test]
fn remote_fetch_downloads_archive_and_best_effort_manifest() {
    let cache = test_dir("remote-cache");
    let repo = test_repo();

    let mut requested = Vec::new();
    let mut download = |url: &str, out: &Path| {
        requested.push(url.to_string());
        if url.ends_with("checksums.txt") {
            fs::write(out, b"deadbeefdeadbeefdeadbeefdeadbeef  cgp-linux-x86_64.tar.gz\n")?;
        } else {
            fs::write(out, b"archive bytes")?;
        }
        Ok(())
    };
    let fetched = fetch_from_remote(
        &repo,
        &cache,
        "v1.2.0",
        "cgp-linux-x86_64.tar.gz",
        &mut download,
    )
    .expect("must fetch");

    assert_eq!(requested.len(), 2);
    assert!(requested[0].ends_with("/releases/download/v1.2.0/cgp-linux-x86_64.tar.gz"));
    assert!(requested[1].ends_with("/releases/download/v1.2.0/checksums.txt"));
    assert_eq!(
        fs::read(&fetched.archive_path).expect("must read archive"),
        b"archive bytes"
    );
    assert!(fetched.manifest.is_some());
    // no .part leftovers
    let staging = fetched.archive_path.parent().expect("staging dir");
    let parts: Vec<_> = fs::read_dir(staging)
        .expect("must read staging")
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".part"))
        .collect();
    assert!(parts.is_empty());

    drop(fetched);
    let _ = fs::remove_dir_all(&cache);
}

#[test]
fn remote_fetch_manifest_failure_is_not_fatal() {
    let cache = test_dir("remote-nomanifest");
    let repo = test_repo();

    let mut download = |url: &str, out: &Path| {
        if url.ends_with("checksums.txt") {
            return Err(anyhow!("404 not found"));
        }
        fs::write(out, b"archive bytes")?;
        Ok(())
    };
    let fetched = fetch_from_remote(
        &repo,
        &cache,
        "v1.2.0",
        "cgp-linux-x86_64.tar.gz",
        &mut download,
    )
    .expect("archive alone must suffice");
    assert!(fetched.manifest.is_none());

    drop(fetched);
    let _ = fs::remove_dir_all(&cache);
}

#[test]
fn remote_fetch_archive_failure_is_fatal_and_cleans_staging() {
    let cache = test_dir("remote-fail");
    let repo = test_repo();

    let mut download = |_: &str, _: &Path| Err(anyhow!("connection reset"));
    fetch_from_remote(
        &repo,
        &cache,
        "v1.2.0",
        "cgp-linux-x86_64.tar.gz",
        &mut download,
    )
    .expect_err("archive failure must be fatal");

    let leftovers: Vec<_> = fs::read_dir(&cache)
        .expect("must read cache")
        .filter_map(|entry| entry.ok())
        .collect();
    assert!(leftovers.is_empty(), "staging dir must be removed on failure");

    let _ = fs::remove_dir_all(&cache);
}

#[test]
fn verify_archive_enforces_present_manifest_entry() {
    let dir = test_dir("verify");
    let archive = dir.join("cgp-linux-x86_64.tar.gz");
    fs::write(&archive, b"archive bytes").expect("must write archive");

    let good = ChecksumManifest::parse(&format!(
        "{}  cgp-linux-x86_64.tar.gz\n",
        sha256_hex(b"archive bytes")
    ));
    assert_eq!(
        verify_archive(&archive, "cgp-linux-x86_64.tar.gz", Some(&good)).expect("must verify"),
        Verification::Verified
    );

    let bad = ChecksumManifest::parse(
        "deadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef  cgp-linux-x86_64.tar.gz\n",
    );
    let err = verify_archive(&archive, "cgp-linux-x86_64.tar.gz", Some(&bad))
        .expect_err("mismatch must be fatal");
    match err.downcast_ref::<DeployError>() {
        Some(DeployError::ChecksumMismatch {
            asset,
            expected,
            actual,
        }) => {
            assert_eq!(asset, "cgp-linux-x86_64.tar.gz");
            assert!(expected.starts_with("deadbeef"));
            assert_eq!(actual, &sha256_hex(b"archive bytes"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(
        err.downcast_ref::<DeployError>().expect("deploy error").exit_code(),
        4
    );

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn verify_archive_skips_when_nothing_to_verify() {
    let dir = test_dir("verify-skip");
    let archive = dir.join("cgp-linux-x86_64.tar.gz");
    fs::write(&archive, b"archive bytes").expect("must write archive");

    assert_eq!(
        verify_archive(&archive, "cgp-linux-x86_64.tar.gz", None).expect("must skip"),
        Verification::Skipped
    );

    let empty = ChecksumManifest::parse("");
    assert_eq!(
        verify_archive(&archive, "cgp-linux-x86_64.tar.gz", Some(&empty)).expect("must skip"),
        Verification::Skipped
    );

    let other_entry = ChecksumManifest::parse(
        "deadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef  cgp-macos-arm64.tar.gz\n",
    );
    assert_eq!(
        verify_archive(&archive, "cgp-linux-x86_64.tar.gz", Some(&other_entry))
            .expect("must skip"),
        Verification::Skipped
    );

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn update_status_compares_remote_and_installed_versions() {
    let repo = test_repo();

    let status = check_for_update_with_fetch(&repo, Some("1.2.0"), |_| {
        Ok(r#"{"tag_name": "v1.3.0"}"#.to_string())
    });
    assert_eq!(status.remote_tag, "v1.3.0");
    assert_eq!(status.remote_version.as_deref(), Some("1.3.0"));
    assert_eq!(status.update_available, Some(true));
    assert!(status.resolution_fallback.is_none());

    let current = check_for_update_with_fetch(&repo, Some("1.3.0"), |_| {
        Ok(r#"{"tag_name": "v1.3.0"}"#.to_string())
    });
    assert_eq!(current.update_available, Some(false));

    let degraded =
        check_for_update_with_fetch(&repo, Some("1.3.0"), |_| Err(anyhow!("offline")));
    assert_eq!(degraded.remote_tag, "latest");
    assert_eq!(degraded.update_available, None);
    assert!(degraded.resolution_fallback.is_some());

    let fresh = check_for_update_with_fetch(&repo, None, |_| {
        Ok(r#"{"tag_name": "v1.3.0"}"#.to_string())
    });
    assert_eq!(fresh.update_available, None);
}

#[cfg(unix)]
#[test]
fn installed_version_is_derived_from_current_target_name() {
    let dir = test_dir("installed-version");

    let link = |name: &str| -> PathBuf {
        let link_path = dir.join(format!("current-{name}"));
        std::os::unix::fs::symlink(dir.join("versions").join(name), &link_path)
            .expect("must symlink");
        link_path
    };

    assert_eq!(
        installed_version_from_current(&link("v1.2.0")).as_deref(),
        Some("1.2.0")
    );
    assert_eq!(
        installed_version_from_current(&link("v1.2.0-1771001234")).as_deref(),
        Some("1.2.0")
    );
    assert_eq!(
        installed_version_from_current(&link("v1.2.0-1771001234-4242424")).as_deref(),
        Some("1.2.0")
    );
    // version components shorter than a timestamp survive
    assert_eq!(
        installed_version_from_current(&link("v1.2.0-3")).as_deref(),
        Some("1.2.0-3")
    );
    assert_eq!(installed_version_from_current(&link("latest-1771001234")), None);
    assert_eq!(installed_version_from_current(&dir.join("missing")), None);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn update_check_throttle_tolerates_garbage() {
    let dir = test_dir("throttle");
    let stamp = dir.join(".last-update-check");

    assert!(should_check_for_update(&stamp, 1_771_001_234));

    record_update_check(&stamp, 1_771_001_234);
    assert!(!should_check_for_update(&stamp, 1_771_001_234 + 10));
    assert!(should_check_for_update(
        &stamp,
        1_771_001_234 + UPDATE_CHECK_INTERVAL.as_secs()
    ));

    fs::write(&stamp, "not a number").expect("must write garbage");
    assert!(should_check_for_update(&stamp, 1_771_001_234));

    // a stamp from the future counts as freshly checked, same as the original
    record_update_check(&stamp, 2_000_000_000);
    assert!(!should_check_for_update(&stamp, 1_771_001_234));

    let _ = fs::remove_dir_all(&dir);
}
