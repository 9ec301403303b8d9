// tests/generic_npm_provider.rs

mod common;

use std::sync::Arc;

use common::*;
use devwatch::binary::source::AssetSource;
use devwatch::binary::{
    BinaryProvider, BinaryRegistry, GenericNpmBinaryProvider, InstallPlan, Platform, install_binaries,
};
use devwatch::config::ProviderOptions;
use devwatch::types::ExitStatus;

fn npm(package: &str, tag: &str) -> AssetSource {
    AssetSource::Npm {
        package: package.into(),
        dist_tag: tag.into(),
    }
}

fn publish(source: &FakeSource, package: &str, tag: &str, version: &str) {
    source.publish(&npm(package, tag), version, vec![("package", npm_tarball(package, version))]);
}

#[test]
fn reports_configured_packages() {
    let provider = GenericNpmBinaryProvider::from_list("@valksor/valksor@next, htmx.org").unwrap();
    assert_eq!(provider.packages(), vec!["@valksor/valksor", "htmx.org"]);
    assert_eq!(provider.package_count(), 2);
    assert!(provider.has_package("htmx.org"));
    assert!(!provider.has_package("alpinejs"));
}

#[test]
fn requested_name_with_tag_overrides_configured_tag() {
    let provider = GenericNpmBinaryProvider::from_list("@valksor/valksor, htmx.org").unwrap();
    let var = tempfile::tempdir().unwrap();
    let source: Arc<FakeSource> = Arc::new(FakeSource::new());

    let manager = provider
        .create_manager(var.path(), Some("@valksor/valksor@next"), source.clone())
        .unwrap()
        .unwrap();
    assert_eq!(manager.spec().source, npm("@valksor/valksor", "next"));

    // Unknown names fall back to the first package.
    let manager = provider
        .create_manager(var.path(), Some("left-pad"), source.clone())
        .unwrap()
        .unwrap();
    assert_eq!(manager.spec().source, npm("@valksor/valksor", "latest"));

    let empty = GenericNpmBinaryProvider::new(Vec::new()).unwrap();
    assert!(empty.create_manager(var.path(), None, source).unwrap().is_none());
}

#[tokio::test]
async fn complete_cache_is_reused_without_network() {
    init_tracing();
    let var = tempfile::tempdir().unwrap();
    let source = Arc::new(FakeSource::new());
    publish(&source, "htmx.org", "latest", "2.0.4");
    let provider = GenericNpmBinaryProvider::from_list("htmx.org").unwrap();
    let platform = Platform::from_parts("linux", "x86_64").unwrap();
    let log = CapturedLog::new();

    let first = provider
        .ensure_all(var.path(), platform, source.clone(), &log.narrator())
        .await
        .unwrap();
    assert_eq!(first, vec!["2.0.4"]);
    let resolves = source.resolve_count();

    let second = provider
        .ensure_all(var.path(), platform, source.clone(), &log.narrator())
        .await
        .unwrap();
    assert_eq!(second, vec!["2.0.4"]);
    assert_eq!(source.resolve_count(), resolves);
    assert_eq!(source.download_count(), 1);
    assert!(log.contains("htmx.org assets already current (2.0.4)"));
}

#[tokio::test]
async fn sync_copies_installed_packages_and_warns_about_missing_ones() {
    let var = tempfile::tempdir().unwrap();
    let public = tempfile::tempdir().unwrap();
    let provider = GenericNpmBinaryProvider::from_list("@valksor/valksor, htmx.org").unwrap();

    let installed = var.path().join("valksor-valksor");
    std::fs::create_dir_all(installed.join("dist")).unwrap();
    std::fs::write(installed.join("package.json"), "{}").unwrap();
    std::fs::write(installed.join("dist/app.css"), "body{}").unwrap();

    let log = CapturedLog::new();
    let synced = provider.sync_to_public_vendor(var.path(), public.path(), &log.narrator());

    assert_eq!(synced, vec!["@valksor/valksor"]);
    assert_eq!(
        std::fs::read_to_string(public.path().join("valksor-valksor/dist/app.css")).unwrap(),
        "body{}"
    );
    assert!(log.contains("Source directory not found for htmx.org"), "{:?}", log.lines());
}

#[tokio::test]
async fn install_routine_covers_binaries_and_packages() {
    let root = tempfile::tempdir().unwrap();
    let var_dir = root.path().join("var");
    let public_vendor_dir = root.path().join("public/vendor");
    let source = Arc::new(FakeSource::new());

    let asset = Platform::detect().unwrap().substitute("tailwindcss-{platform}");
    source.publish(
        &AssetSource::GitHub {
            repo: "tailwindlabs/tailwindcss".into(),
        },
        "v4.0.0",
        vec![(asset.as_str(), b"bin".to_vec())],
    );
    publish(&source, "htmx.org", "latest", "2.0.4");

    let options = ProviderOptions::default()
        .with("required", vec!["tailwindcss"])
        .with("generic_npm_packages", "htmx.org");
    let registry = BinaryRegistry::from_options(&options).unwrap();
    let plan = InstallPlan {
        required: options.str_list("required"),
        var_dir: var_dir.clone(),
        public_vendor_dir: public_vendor_dir.clone(),
        remote: source.clone(),
    };
    let log = CapturedLog::new();

    let status = install_binaries(&registry, &plan, &log.narrator()).await;

    assert_eq!(status, ExitStatus::Success, "{:?}", log.lines());
    assert!(var_dir.join("tailwindcss/tailwindcss").is_file());
    assert!(public_vendor_dir.join("htmx.org/package.json").is_file());
    assert!(log.contains("✓ tailwindcss installed (v4.0.0)"));
    assert!(log.contains("✓ htmx.org synced"));
}

#[tokio::test]
async fn unknown_required_binary_fails_the_install() {
    let root = tempfile::tempdir().unwrap();
    let options = ProviderOptions::default().with("required", vec!["esbuild"]);
    let registry = BinaryRegistry::from_options(&options).unwrap();
    let plan = InstallPlan {
        required: options.str_list("required"),
        var_dir: root.path().join("var"),
        public_vendor_dir: root.path().join("public"),
        remote: Arc::new(FakeSource::new()),
    };
    let log = CapturedLog::new();

    let status = install_binaries(&registry, &plan, &log.narrator()).await;
    assert_eq!(status, ExitStatus::Failure);
    assert!(log.contains("Binary esbuild not found in registry"));
}

#[tokio::test]
async fn nothing_required_is_a_warning_not_a_failure() {
    let root = tempfile::tempdir().unwrap();
    let registry = BinaryRegistry::from_options(&ProviderOptions::default()).unwrap();
    let plan = InstallPlan {
        required: Vec::new(),
        var_dir: root.path().join("var"),
        public_vendor_dir: root.path().join("public"),
        remote: Arc::new(FakeSource::new()),
    };
    let log = CapturedLog::new();

    assert_eq!(install_binaries(&registry, &plan, &log.narrator()).await, ExitStatus::Success);
    assert!(log.contains("Warning: No binaries required"));
}
