//! Optional TOML configuration overriding the built-in profiles.
//!
//! ```toml
//! tag_prefix = "example"
//! output_dir = "build/images"
//!
//! [profiles.alpine]
//! kubernetes = "v1.6.2"
//!
//! [profiles.hyperkube]
//! verify_tls = true
//! persistent_disk = "/dev/vdb"
//! ```
//!
//! Only the fields present in the file replace the defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::profile::{Profile, Variant};
use crate::versions::Component;

/// Environment variable naming a config file when `--config` is absent.
pub const CONFIG_ENV: &str = "KUBE_NODE_IMAGES_CONFIG";

const DEFAULT_OUTPUT_DIR: &str = "out";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    tag_prefix: Option<String>,
    output_dir: Option<String>,
    #[serde(default)]
    profiles: ProfilesToml,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProfilesToml {
    alpine: Option<ProfileToml>,
    hyperkube: Option<ProfileToml>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProfileToml {
    base_image: Option<String>,
    mounts_base_image: Option<String>,
    kubernetes: Option<String>,
    weave: Option<String>,
    cni: Option<String>,
    tini: Option<String>,
    verify_tls: Option<bool>,
    persistent_disk: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub output_dir: PathBuf,
    alpine: Profile,
    hyperkube: Profile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            alpine: Profile::alpine(),
            hyperkube: Profile::hyperkube(),
        }
    }
}

impl Config {
    /// Read and apply a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config '{}'", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parsing config '{}'", path.display()))
    }

    /// Load `explicit`, else the file named by [`CONFIG_ENV`], else defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => Self::load(Path::new(&path)),
            _ => Ok(Self::default()),
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let parsed: ConfigToml = toml::from_str(raw)?;
        let mut config = Self::default();

        if let Some(dir) = parsed.output_dir {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(prefix) = parsed.tag_prefix {
            config.alpine.tag_prefix = prefix.clone();
            config.hyperkube.tag_prefix = prefix;
        }
        if let Some(overrides) = parsed.profiles.alpine {
            apply_overrides(&mut config.alpine, overrides);
        }
        if let Some(overrides) = parsed.profiles.hyperkube {
            apply_overrides(&mut config.hyperkube, overrides);
        }

        Ok(config)
    }

    pub fn profile(&self, variant: Variant) -> Profile {
        match variant {
            Variant::Alpine => self.alpine.clone(),
            Variant::Hyperkube => self.hyperkube.clone(),
        }
    }
}

fn apply_overrides(profile: &mut Profile, overrides: ProfileToml) {
    let kubernetes_pinned = overrides.kubernetes.is_some();
    let pins = [
        (Component::Kubernetes, overrides.kubernetes),
        (Component::Weave, overrides.weave),
        (Component::Cni, overrides.cni),
        (Component::Tini, overrides.tini),
    ];
    for (component, value) in pins {
        if let Some(value) = value {
            profile.versions.set(component, value);
        }
    }

    match overrides.base_image {
        Some(image) => profile.base_image = image,
        // The hyperkube base is itself a Kubernetes artifact.
        None if kubernetes_pinned && profile.variant == Variant::Hyperkube => {
            profile.base_image = profile.url(crate::artifact::Artifact::Hyperkube);
        }
        None => {}
    }
    if let Some(image) = overrides.mounts_base_image {
        profile.mounts_base_image = image;
    }
    if let Some(verify) = overrides.verify_tls {
        profile.verify_tls = verify;
    }
    if let Some(disk) = overrides.persistent_disk {
        profile.persistent_disk = disk;
    }
}
