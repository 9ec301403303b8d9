// src/binary/package.rs

//! npm package specs: `name`, `name@tag`, `@scope/name`, `@scope/name@tag`.

use std::fmt;

pub const DEFAULT_TAG: &str = "latest";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageSpec {
    pub package: String,
    pub tag: String,
}

impl PackageSpec {
    pub fn new(package: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            tag: tag.into(),
        }
    }

    /// Split on the last `@`.
    ///
    /// For scoped names the separator must come after the scope's `/`;
    /// otherwise the whole string is the package and the tag is `latest`.
    /// An empty tag is `latest` too.
    pub fn parse(spec: &str) -> Self {
        let spec = spec.trim();
        let whole = || PackageSpec::new(spec, DEFAULT_TAG);

        let Some(last_at) = spec.rfind('@') else {
            return whole();
        };
        if last_at == 0 {
            return whole();
        }
        if spec.starts_with('@') {
            match spec[1..].find('/') {
                Some(slash) if last_at > slash + 1 => {}
                _ => return whole(),
            }
        }

        let package = &spec[..last_at];
        let tag = &spec[last_at + 1..];
        PackageSpec::new(package, if tag.is_empty() { DEFAULT_TAG } else { tag })
    }

    /// Parse a comma-separated list, skipping blanks.
    pub fn parse_list(list: &str) -> Vec<Self> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Self::parse)
            .collect()
    }

    pub fn has_explicit_tag(spec: &str) -> bool {
        let parsed = Self::parse(spec);
        parsed.package != spec.trim()
    }

    pub fn dir_name(&self) -> String {
        package_dir(&self.package)
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.package, self.tag)
    }
}

/// Flat cache directory name: `@` removed, `/` turned into `-`.
///
/// `@valksor/valksor` -> `valksor-valksor`.
pub fn package_dir(package: &str) -> String {
    package.replace('@', "").replace('/', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoped_names() {
        assert_eq!(PackageSpec::parse("@valksor/valksor@next"), PackageSpec::new("@valksor/valksor", "next"));
        assert_eq!(PackageSpec::parse("@valksor/valksor"), PackageSpec::new("@valksor/valksor", "latest"));
        assert_eq!(PackageSpec::parse("@valksor/valksor@"), PackageSpec::new("@valksor/valksor", "latest"));
        assert_eq!(PackageSpec::parse("@scope@tag"), PackageSpec::new("@scope@tag", "latest"));
        assert_eq!(PackageSpec::parse("@sc@pe/name"), PackageSpec::new("@sc@pe/name", "latest"));
    }

    #[test]
    fn unscoped_names() {
        assert_eq!(PackageSpec::parse("htmx.org"), PackageSpec::new("htmx.org", "latest"));
        assert_eq!(PackageSpec::parse("htmx.org@2.0.4"), PackageSpec::new("htmx.org", "2.0.4"));
        assert_eq!(PackageSpec::parse("scope/name@beta"), PackageSpec::new("scope/name", "beta"));
        assert_eq!(PackageSpec::parse("  alpinejs  "), PackageSpec::new("alpinejs", "latest"));
    }

    #[test]
    fn list_and_dirs() {
        let list = PackageSpec::parse_list("@valksor/valksor@next, htmx.org,,");
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].dir_name(), "valksor-valksor");
        assert_eq!(package_dir("@valksor/ui"), "valksor-ui");
        assert_eq!(package_dir(&package_dir("@a/b")), "a-b");
        assert!(PackageSpec::has_explicit_tag("@a/b@next"));
        assert!(!PackageSpec::has_explicit_tag("@a/b"));
    }
}
