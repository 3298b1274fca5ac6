//! Pinned component versions shared by every descriptor of a variant.

use anyhow::{bail, Result};
use serde::Serialize;
use std::fmt;

/// A versioned upstream component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Kubernetes,
    Weave,
    Cni,
    Tini,
}

impl Component {
    pub const ALL: [Component; 4] = [
        Component::Kubernetes,
        Component::Weave,
        Component::Cni,
        Component::Tini,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Component::Kubernetes => "kubernetes",
            Component::Weave => "weave",
            Component::Cni => "cni",
            Component::Tini => "tini",
        }
    }

    /// Parse a component key as used in version tables and config files.
    pub fn parse(name: &str) -> Result<Self> {
        match Self::ALL.iter().find(|c| c.as_str() == name) {
            Some(component) => Ok(*component),
            None => bail!(
                "unknown component '{}'; expected one of: {}",
                name,
                Self::ALL.map(Component::as_str).join(", ")
            ),
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Version or commit hash per component.
///
/// Values are embedded verbatim into URLs and tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionSet {
    pub kubernetes: String,
    pub weave: String,
    pub cni: String,
    pub tini: String,
}

impl VersionSet {
    pub fn get(&self, component: Component) -> &str {
        match component {
            Component::Kubernetes => &self.kubernetes,
            Component::Weave => &self.weave,
            Component::Cni => &self.cni,
            Component::Tini => &self.tini,
        }
    }

    /// String-keyed lookup. Unknown keys are configuration mistakes.
    pub fn lookup(&self, name: &str) -> Result<&str> {
        Ok(self.get(Component::parse(name)?))
    }

    pub(crate) fn set(&mut self, component: Component, value: String) {
        match component {
            Component::Kubernetes => self.kubernetes = value,
            Component::Weave => self.weave = value,
            Component::Cni => self.cni = value,
            Component::Tini => self.tini = value,
        }
    }

    /// Pins for the Alpine (LinuxKit) variant.
    pub fn alpine() -> Self {
        Self {
            kubernetes: "v1.6.1".to_string(),
            weave: "v1.9.4".to_string(),
            cni: "0799f5732f2a11b329d9e3d51b9c8f2e3759f2ff".to_string(),
            tini: "v0.14.0".to_string(),
        }
    }

    /// Pins for the Debian/hyperkube variant.
    ///
    /// CNI plugins come from the `kubernetes-cni` APT package here, so the
    /// hash is only used if a descriptor asks for the tarball explicitly.
    pub fn hyperkube() -> Self {
        Self {
            kubernetes: "v1.6.1".to_string(),
            weave: "v1.9.4".to_string(),
            cni: "0799f5732f2a11b329d9e3d51b9c8f2e3759f2ff".to_string(),
            tini: "v0.14.0".to_string(),
        }
    }
}
