// tests/binary_manager.rs

mod common;

use std::sync::Arc;

use common::*;
use devwatch::binary::source::AssetSource;
use devwatch::binary::tailwind::TAILWIND_REPO;
use devwatch::binary::{GenericNpmBinaryProvider, PackageSpec, Platform, TailwindBinary, VersionManifest};
use devwatch::errors::DevwatchError;

fn linux_x64() -> Platform {
    Platform::from_parts("linux", "x86_64").unwrap()
}

fn tailwind_source() -> AssetSource {
    AssetSource::GitHub {
        repo: TAILWIND_REPO.to_string(),
    }
}

fn publish_tailwind(source: &FakeSource, version: &str) {
    source.publish(
        &tailwind_source(),
        version,
        vec![
            ("tailwindcss-linux-x64", format!("#!/bin/sh\necho {version}\n").into_bytes()),
            ("tailwindcss-macos-arm64", b"mac".to_vec()),
        ],
    );
}

#[tokio::test]
async fn installs_platform_binary_and_writes_manifest() {
    init_tracing();
    let var = tempfile::tempdir().unwrap();
    let source = Arc::new(FakeSource::new());
    publish_tailwind(&source, "v4.0.0");
    let log = CapturedLog::new();

    let manager = TailwindBinary::manager_for(var.path(), linux_x64(), source.clone());
    let version = manager.ensure_latest(&log.narrator()).await.unwrap();

    assert_eq!(version, "v4.0.0");
    let exe = TailwindBinary::executable_path(var.path());
    assert_eq!(std::fs::read_to_string(&exe).unwrap(), "#!/bin/sh\necho v4.0.0\n");
    assert_eq!(
        VersionManifest::read(manager.target_dir()).map(|m| m.version),
        Some("v4.0.0".to_string())
    );
    assert_eq!(source.download_count(), 1);
    assert!(log.contains("Tailwind CSS v4.0.0 installed"), "{:?}", log.lines());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&exe).unwrap().permissions().mode();
        assert_eq!(mode & 0o755, 0o755);
    }
}

#[tokio::test]
async fn second_call_against_current_cache_downloads_nothing() {
    let var = tempfile::tempdir().unwrap();
    let source = Arc::new(FakeSource::new());
    publish_tailwind(&source, "v4.0.0");
    let log = CapturedLog::new();
    let manager = TailwindBinary::manager_for(var.path(), linux_x64(), source.clone());

    manager.ensure_latest(&log.narrator()).await.unwrap();
    let downloads = source.download_count();
    let version = manager.ensure_latest(&log.narrator()).await.unwrap();

    assert_eq!(version, "v4.0.0");
    assert_eq!(source.download_count(), downloads);
    assert!(log.contains("Tailwind CSS already current (v4.0.0)"));
}

#[tokio::test]
async fn newer_release_replaces_the_cache() {
    let var = tempfile::tempdir().unwrap();
    let source = Arc::new(FakeSource::new());
    publish_tailwind(&source, "v4.0.0");
    let manager = TailwindBinary::manager_for(var.path(), linux_x64(), source.clone());
    let log = CapturedLog::new();

    manager.ensure_latest(&log.narrator()).await.unwrap();
    publish_tailwind(&source, "v4.1.0");
    let version = manager.ensure_latest(&log.narrator()).await.unwrap();

    assert_eq!(version, "v4.1.0");
    assert_eq!(source.download_count(), 2);
    assert_eq!(manager.cached_version().as_deref(), Some("v4.1.0"));
}

#[tokio::test]
async fn manifest_without_binary_is_not_a_cache_hit() {
    let var = tempfile::tempdir().unwrap();
    let source = Arc::new(FakeSource::new());
    publish_tailwind(&source, "v4.0.0");
    let manager = TailwindBinary::manager_for(var.path(), linux_x64(), source.clone());
    let log = CapturedLog::new();

    manager.ensure_latest(&log.narrator()).await.unwrap();
    std::fs::remove_file(TailwindBinary::executable_path(var.path())).unwrap();
    assert_eq!(manager.cached_version(), None);

    manager.ensure_latest(&log.narrator()).await.unwrap();
    assert_eq!(source.download_count(), 2);
    assert!(TailwindBinary::executable_path(var.path()).exists());
}

#[tokio::test]
async fn offline_with_cache_falls_back_with_a_warning() {
    let var = tempfile::tempdir().unwrap();
    let source = Arc::new(FakeSource::new());
    publish_tailwind(&source, "v4.0.0");
    let manager = TailwindBinary::manager_for(var.path(), linux_x64(), source.clone());
    let log = CapturedLog::new();

    manager.ensure_latest(&log.narrator()).await.unwrap();
    source.set_offline(true);
    let version = manager.ensure_latest(&log.narrator()).await.unwrap();

    assert_eq!(version, "v4.0.0");
    assert!(log.contains("using cached version v4.0.0"), "{:?}", log.lines());
}

#[tokio::test]
async fn offline_without_cache_is_an_acquisition_error() {
    let var = tempfile::tempdir().unwrap();
    let source = Arc::new(FakeSource::new());
    source.set_offline(true);
    let manager = TailwindBinary::manager_for(var.path(), linux_x64(), source.clone());

    let err = manager.ensure_latest(&CapturedLog::new().narrator()).await.unwrap_err();
    assert!(matches!(err, DevwatchError::AcquisitionError(_)), "got {err:?}");
    assert!(!TailwindBinary::executable_path(var.path()).exists());
}

#[tokio::test]
async fn missing_platform_asset_fails_without_writing_a_manifest() {
    let var = tempfile::tempdir().unwrap();
    let source = Arc::new(FakeSource::new());
    source.publish(&tailwind_source(), "v4.0.0", vec![("tailwindcss-windows-x64.exe", b"x".to_vec())]);
    let manager = TailwindBinary::manager_for(var.path(), linux_x64(), source.clone());

    let err = manager.ensure_latest(&CapturedLog::new().narrator()).await.unwrap_err();
    assert!(err.to_string().contains("tailwindcss-linux-x64"), "{err}");
    assert!(VersionManifest::read(manager.target_dir()).is_none());
}

#[tokio::test]
async fn npm_tarball_is_unpacked_without_the_package_prefix() {
    let var = tempfile::tempdir().unwrap();
    let source = Arc::new(FakeSource::new());
    source.publish(
        &AssetSource::Npm {
            package: "@valksor/valksor".into(),
            dist_tag: "next".into(),
        },
        "1.2.0-next.3",
        vec![("package", npm_tarball("@valksor/valksor", "1.2.0-next.3"))],
    );

    let provider = GenericNpmBinaryProvider::new(vec![PackageSpec::parse("@valksor/valksor@next")]).unwrap();
    let manager = provider
        .manager_for(var.path(), None, linux_x64(), source.clone())
        .unwrap();
    let version = manager.ensure_latest(&CapturedLog::new().narrator()).await.unwrap();

    assert_eq!(version, "1.2.0-next.3");
    let dir = var.path().join("valksor-valksor");
    assert_eq!(manager.target_dir(), dir.as_path());
    assert!(dir.join("package.json").is_file());
    assert!(dir.join("dist/index.js").is_file());
    assert!(!dir.join("package").exists());
}

fn htmx_source() -> AssetSource {
    AssetSource::Npm {
        package: "htmx.org".into(),
        dist_tag: "latest".into(),
    }
}

#[tokio::test]
async fn corrupt_download_keeps_serving_the_installed_version() {
    let var = tempfile::tempdir().unwrap();
    let source = Arc::new(FakeSource::new());
    source.publish(&htmx_source(), "1.0.0", vec![("package", npm_tarball("htmx.org", "1.0.0"))]);
    let provider = GenericNpmBinaryProvider::new(vec![PackageSpec::parse("htmx.org")]).unwrap();
    let manager = provider
        .manager_for(var.path(), None, linux_x64(), source.clone())
        .unwrap();
    let log = CapturedLog::new();

    manager.ensure_latest(&log.narrator()).await.unwrap();
    source.publish(&htmx_source(), "1.1.0", vec![("package", b"<html>503</html>".to_vec())]);
    let version = manager.ensure_latest(&log.narrator()).await.unwrap();

    assert_eq!(version, "1.0.0");
    assert!(log.contains("using cached version 1.0.0"), "{:?}", log.lines());
    assert_eq!(manager.cached_version().as_deref(), Some("1.0.0"));
    assert!(manager.target_dir().join("dist/index.js").is_file());
    assert!(!var.path().join(".htmx.org.staging").exists());
}

#[tokio::test]
async fn corrupt_download_without_cache_leaves_nothing_behind() {
    let var = tempfile::tempdir().unwrap();
    let source = Arc::new(FakeSource::new());
    source.publish(&htmx_source(), "1.1.0", vec![("package", b"<html>503</html>".to_vec())]);
    let provider = GenericNpmBinaryProvider::new(vec![PackageSpec::parse("htmx.org")]).unwrap();
    let manager = provider
        .manager_for(var.path(), None, linux_x64(), source.clone())
        .unwrap();

    let err = manager.ensure_latest(&CapturedLog::new().narrator()).await.unwrap_err();

    assert!(matches!(err, DevwatchError::AcquisitionError(_)), "got {err:?}");
    assert!(err.to_string().contains("not a gzip archive"), "{err}");
    assert!(VersionManifest::read(manager.target_dir()).is_none());
    assert!(!var.path().join(".htmx.org.staging").exists());
}
