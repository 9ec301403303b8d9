// src/binary/platform.rs

use std::fmt;

use crate::errors::{DevwatchError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Linux,
    Macos,
    Windows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X64,
    Arm64,
}

/// Host platform, as used in release asset names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    pub fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    pub fn detect() -> Result<Self> {
        Self::from_parts(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Build from `std::env::consts`-style names.
    pub fn from_parts(os: &str, arch: &str) -> Result<Self> {
        let os = match os {
            "linux" => Os::Linux,
            "macos" => Os::Macos,
            "windows" => Os::Windows,
            other => {
                return Err(DevwatchError::AcquisitionError(format!(
                    "unsupported operating system: {other}"
                )));
            }
        };
        let arch = match arch {
            "x86_64" => Arch::X64,
            "aarch64" => Arch::Arm64,
            other => {
                return Err(DevwatchError::AcquisitionError(format!(
                    "unsupported architecture: {other}"
                )));
            }
        };
        Ok(Self { os, arch })
    }

    /// `linux-x64`, `macos-arm64`, `windows-x64.exe`, ...
    pub fn asset_suffix(&self) -> String {
        let os = match self.os {
            Os::Linux => "linux",
            Os::Macos => "macos",
            Os::Windows => "windows",
        };
        let arch = match self.arch {
            Arch::X64 => "x64",
            Arch::Arm64 => "arm64",
        };
        let ext = if self.os == Os::Windows { ".exe" } else { "" };
        format!("{os}-{arch}{ext}")
    }

    /// Replace `{platform}` in an asset pattern.
    pub fn substitute(&self, pattern: &str) -> String {
        pattern.replace("{platform}", &self.asset_suffix())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.asset_suffix())
    }
}
