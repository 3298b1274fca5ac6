//! Resolve pinned versions into download URLs and image references.
//!
//! Every URL embeds the version string exactly as pinned. Nothing here
//! touches the network; resolution is pure string formatting.

use anyhow::{bail, Result};
use std::fmt;

use crate::versions::{Component, VersionSet};

const K8S_RELEASE_BASE: &str = "https://dl.k8s.io";
const WEAVE_RELEASE_BASE: &str = "https://github.com/weaveworks/weave/releases/download";
const CNI_RELEASE_BASE: &str = "https://storage.googleapis.com/kubernetes-release/network-plugins";
const TINI_RELEASE_BASE: &str = "https://github.com/krallin/tini/releases/download";
const HYPERKUBE_IMAGE: &str = "gcr.io/google_containers/hyperkube-amd64";

/// A fetchable artifact derived from one component's pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    Kubeadm,
    Kubelet,
    Kubectl,
    Hyperkube,
    WeaveManifest,
    CniPlugins,
    Tini,
}

impl Artifact {
    pub const ALL: [Artifact; 7] = [
        Artifact::Kubeadm,
        Artifact::Kubelet,
        Artifact::Kubectl,
        Artifact::Hyperkube,
        Artifact::WeaveManifest,
        Artifact::CniPlugins,
        Artifact::Tini,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Artifact::Kubeadm => "kubeadm",
            Artifact::Kubelet => "kubelet",
            Artifact::Kubectl => "kubectl",
            Artifact::Hyperkube => "hyperkube",
            Artifact::WeaveManifest => "weave",
            Artifact::CniPlugins => "cni",
            Artifact::Tini => "tini",
        }
    }

    /// The component whose pin selects this artifact.
    pub fn component(self) -> Component {
        match self {
            Artifact::Kubeadm | Artifact::Kubelet | Artifact::Kubectl | Artifact::Hyperkube => {
                Component::Kubernetes
            }
            Artifact::WeaveManifest => Component::Weave,
            Artifact::CniPlugins => Component::Cni,
            Artifact::Tini => Component::Tini,
        }
    }

    /// Artifact fetched when a bare component name is resolved.
    pub fn primary(component: Component) -> Self {
        match component {
            Component::Kubernetes => Artifact::Kubeadm,
            Component::Weave => Artifact::WeaveManifest,
            Component::Cni => Artifact::CniPlugins,
            Component::Tini => Artifact::Tini,
        }
    }

    /// Parse an artifact name, falling back to component names.
    pub fn parse(name: &str) -> Result<Self> {
        if let Some(artifact) = Self::ALL.iter().find(|a| a.name() == name) {
            return Ok(*artifact);
        }
        if let Ok(component) = Component::parse(name) {
            return Ok(Self::primary(component));
        }
        bail!(
            "unknown artifact '{}'; expected one of: {}",
            name,
            Self::ALL.map(Artifact::name).join(", ")
        )
    }

    pub fn url(self, versions: &VersionSet) -> String {
        let version = versions.get(self.component());
        match self {
            Artifact::Kubeadm | Artifact::Kubelet | Artifact::Kubectl => format!(
                "{}/{}/bin/linux/amd64/{}",
                K8S_RELEASE_BASE,
                version,
                self.name()
            ),
            Artifact::Hyperkube => format!("{}:{}", HYPERKUBE_IMAGE, version),
            Artifact::WeaveManifest => format!(
                "{}/{}/weave-daemonset-k8s-1.6.yaml",
                WEAVE_RELEASE_BASE, version
            ),
            Artifact::CniPlugins => format!("{}/cni-amd64-{}.tar.gz", CNI_RELEASE_BASE, version),
            Artifact::Tini => format!("{}/{}/tini-static-amd64", TINI_RELEASE_BASE, version),
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Resolve an artifact or component name against a version set.
pub fn resolve(versions: &VersionSet, name: &str) -> Result<String> {
    Ok(Artifact::parse(name)?.url(versions))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kubernetes_binaries_embed_version() {
        let versions = VersionSet::alpine();
        assert_eq!(
            Artifact::Kubeadm.url(&versions),
            "https://dl.k8s.io/v1.6.1/bin/linux/amd64/kubeadm"
        );
        assert_eq!(
            Artifact::Kubelet.url(&versions),
            "https://dl.k8s.io/v1.6.1/bin/linux/amd64/kubelet"
        );
        assert_eq!(
            Artifact::Kubectl.url(&versions),
            "https://dl.k8s.io/v1.6.1/bin/linux/amd64/kubectl"
        );
    }

    #[test]
    fn test_every_url_embeds_its_pin_verbatim() {
        let mut versions = VersionSet::alpine();
        versions.kubernetes = "v1.7.0-beta.1+abc".to_string();
        versions.cni = "deadbeef%20".to_string();
        for artifact in Artifact::ALL {
            let url = artifact.url(&versions);
            let pin = versions.get(artifact.component());
            assert!(url.contains(pin), "{} does not contain {}", url, pin);
        }
    }

    #[test]
    fn test_hyperkube_image_reference() {
        let versions = VersionSet::hyperkube();
        assert_eq!(
            Artifact::Hyperkube.url(&versions),
            "gcr.io/google_containers/hyperkube-amd64:v1.6.1"
        );
    }

    #[test]
    fn test_resolve_component_name_uses_primary_artifact() {
        let versions = VersionSet::alpine();
        assert_eq!(
            resolve(&versions, "cni").unwrap(),
            "https://storage.googleapis.com/kubernetes-release/network-plugins/cni-amd64-0799f5732f2a11b329d9e3d51b9c8f2e3759f2ff.tar.gz"
        );
        assert_eq!(
            resolve(&versions, "kubernetes").unwrap(),
            Artifact::Kubeadm.url(&versions)
        );
        assert_eq!(
            resolve(&versions, "weave").unwrap(),
            "https://github.com/weaveworks/weave/releases/download/v1.9.4/weave-daemonset-k8s-1.6.yaml"
        );
    }

    #[test]
    fn test_resolve_unknown_key() {
        let err = resolve(&VersionSet::alpine(), "flannel").unwrap_err();
        assert!(err.to_string().contains("unknown artifact 'flannel'"));
    }
}
