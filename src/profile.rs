//! Distribution profiles.
//!
//! A profile is the per-variant configuration record: package manager,
//! base images, pinned versions and download policy. Descriptors read a
//! profile; they never mutate it.

use anyhow::{bail, Result};
use serde::Serialize;
use std::fmt;

use crate::artifact::Artifact;
use crate::versions::VersionSet;

/// Package manager flavor of a base distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageManager {
    Apk,
    AptGet,
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageManager::Apk => write!(f, "apk"),
            PackageManager::AptGet => write!(f, "apt-get"),
        }
    }
}

/// Which distribution variant a profile describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Alpine,
    Hyperkube,
}

impl Variant {
    pub const ALL: [Variant; 2] = [Variant::Alpine, Variant::Hyperkube];

    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Alpine => "alpine",
            Variant::Hyperkube => "hyperkube",
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "alpine" | "linuxkit" => Ok(Variant::Alpine),
            "hyperkube" | "debian" => Ok(Variant::Hyperkube),
            other => bail!(
                "unsupported profile '{}'; expected one of: alpine, hyperkube",
                other
            ),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub variant: Variant,
    pub package_manager: PackageManager,
    /// Base image of the kubelet image.
    pub base_image: String,
    /// Base image of the companion mounts image.
    pub mounts_base_image: String,
    pub versions: VersionSet,
    /// When false, downloads pass `--insecure` to curl.
    pub verify_tls: bool,
    /// Block device mounted at /var/lib by the mounts image.
    pub persistent_disk: String,
    /// Registry namespace for image tags.
    pub tag_prefix: String,
}

impl Profile {
    pub fn alpine() -> Self {
        Self {
            variant: Variant::Alpine,
            package_manager: PackageManager::Apk,
            base_image: "alpine:3.5".to_string(),
            mounts_base_image: "alpine:3.5".to_string(),
            versions: VersionSet::alpine(),
            verify_tls: true,
            persistent_disk: "/dev/sda1".to_string(),
            tag_prefix: "linuxkit".to_string(),
        }
    }

    pub fn hyperkube() -> Self {
        let versions = VersionSet::hyperkube();
        Self {
            variant: Variant::Hyperkube,
            package_manager: PackageManager::AptGet,
            base_image: Artifact::Hyperkube.url(&versions),
            mounts_base_image: "debian:jessie".to_string(),
            versions,
            verify_tls: false,
            persistent_disk: "/dev/sda1".to_string(),
            tag_prefix: "linuxkit".to_string(),
        }
    }

    pub fn for_variant(variant: Variant) -> Self {
        match variant {
            Variant::Alpine => Self::alpine(),
            Variant::Hyperkube => Self::hyperkube(),
        }
    }

    pub fn url(&self, artifact: Artifact) -> String {
        artifact.url(&self.versions)
    }

    pub fn image_tag(&self, repository: &str, tag: &str) -> String {
        format!("{}/{}:{}", self.tag_prefix, repository, tag)
    }
}
