#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use devwatch::binary::source::SourceFuture;
use devwatch::binary::{AssetSource, Release, ReleaseAsset, RemoteSource};
use devwatch::errors::DevwatchError;
use flate2::Compression;
use flate2::write::GzEncoder;

/// In-memory `RemoteSource` that counts its calls.
#[derive(Default)]
pub struct FakeSource {
    releases: Mutex<HashMap<String, Release>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    resolves: AtomicUsize,
    downloads: AtomicUsize,
    offline: AtomicBool,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish (or replace) the release served for `source`.
    pub fn publish(&self, source: &AssetSource, version: &str, assets: Vec<(&str, Vec<u8>)>) {
        let mut release = Release {
            version: version.to_string(),
            assets: Vec::new(),
        };
        let mut files = self.files.lock().unwrap();
        for (name, bytes) in assets {
            let url = format!("fake://{}/{version}/{name}", source.describe());
            files.insert(url.clone(), bytes);
            release.assets.push(ReleaseAsset {
                name: name.to_string(),
                url,
            });
        }
        self.releases
            .lock()
            .unwrap()
            .insert(source.describe(), release);
    }

    /// Make every call fail as if the network were down.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn resolve_count(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }

    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

impl RemoteSource for FakeSource {
    fn resolve<'a>(&'a self, source: &'a AssetSource) -> SourceFuture<'a, Release> {
        Box::pin(async move {
            self.resolves.fetch_add(1, Ordering::SeqCst);
            if self.offline.load(Ordering::SeqCst) {
                return Err(DevwatchError::AcquisitionError("network unreachable".into()));
            }
            self.releases
                .lock()
                .unwrap()
                .get(&source.describe())
                .cloned()
                .ok_or_else(|| DevwatchError::AcquisitionError(format!("no release for {}", source.describe())))
        })
    }

    fn download<'a>(&'a self, url: &'a str) -> SourceFuture<'a, Vec<u8>> {
        Box::pin(async move {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            if self.offline.load(Ordering::SeqCst) {
                return Err(DevwatchError::AcquisitionError("network unreachable".into()));
            }
            self.files
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or_else(|| DevwatchError::AcquisitionError(format!("404 for {url}")))
        })
    }
}

/// Gzipped tarball holding `entries` (path, contents).
pub fn tgz(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (path, contents) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, *contents).unwrap();
    }
    let mut encoder = builder.into_inner().unwrap();
    encoder.flush().unwrap();
    encoder.finish().unwrap()
}

/// npm-style tarball: everything under `package/`.
pub fn npm_tarball(name: &str, version: &str) -> Vec<u8> {
    let manifest = format!(r#"{{"name":"{name}","version":"{version}"}}"#);
    tgz(&[
        ("package/package.json", manifest.as_bytes()),
        ("package/dist/index.js", b"export default 1;\n"),
    ])
}
