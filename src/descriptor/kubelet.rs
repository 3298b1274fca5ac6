//! Kubelet node image: kubelet, kubeadm, kubectl, CNI plugins and Weave.
//!
//! The Alpine variant downloads every binary. The hyperkube variant starts
//! from the upstream hyperkube image, links kubelet/kubectl to it and gets
//! CNI plugins from the Kubernetes APT repository.

use anyhow::Result;

use super::{Descriptor, DescriptorBuilder, ImageDescriptor};
use crate::artifact::Artifact;
use crate::profile::{Profile, Variant};
use crate::wrapper::WrapperScript;

pub const KUBELET_SH: &str = "/usr/bin/kubelet.sh";
pub const KUBEADM_INIT_SH: &str = "/usr/bin/kubeadm-init.sh";
pub const WEAVE_MANIFEST: &str = "/etc/weave.yaml";
pub const KUBECONFIG: &str = "/etc/kubernetes/admin.conf";

const CNI_BIN_DIR: &str = "/opt/cni/bin";
const CNI_TARBALL: &str = "/tmp/cni.tgz";

const ALPINE_PACKAGES: &[&str] = &[
    "curl",
    "ca-certificates",
    "iptables",
    "ebtables",
    "ethtool",
    "socat",
    "iproute2",
    "util-linux",
    "conntrack-tools",
];

const HYPERKUBE_PACKAGES: &[&str] = &["curl", "apt-transport-https", "ca-certificates"];

const APT_KEY_URL: &str = "https://packages.cloud.google.com/apt/doc/apt-key.gpg";
const APT_REPOSITORY: &str = "deb http://apt.kubernetes.io/ kubernetes-xenial main";

const KUBELET_FLAGS: &[&str] = &[
    "--kubeconfig=/etc/kubernetes/kubelet.conf",
    "--require-kubeconfig=true",
    "--pod-manifest-path=/etc/kubernetes/manifests",
    "--allow-privileged=true",
    "--cluster-dns=10.96.0.10",
    "--cluster-domain=cluster.local",
    "--cgroups-per-qos=false",
    "--enforce-node-allocatable=",
    "--network-plugin=cni",
    "--cni-conf-dir=/etc/cni/net.d",
    "--cni-bin-dir=/opt/cni/bin",
];

/// Body of `kubelet.sh`.
///
/// Retries kubelet forever. While it keeps failing, a metadata volume at
/// /dev/sr0 carries the `kubeadm join` arguments for this node.
pub fn kubelet_script() -> WrapperScript {
    let body = format!(
        "until kubelet {} ; do \
         if [ -e /dev/sr0 ] ; then \
         mount -o ro /dev/sr0 /mnt ; \
         kubeadm join --skip-preflight-checks $(cat /mnt/config) ; \
         else sleep 1 ; fi ; done",
        KUBELET_FLAGS.join(" ")
    );
    WrapperScript::new(KUBELET_SH, body)
}

/// Body of `kubeadm-init.sh`: bootstrap a master and install Weave.
pub fn kubeadm_init_script(profile: &Profile) -> WrapperScript {
    WrapperScript::chained(
        KUBEADM_INIT_SH,
        &[
            format!(
                "kubeadm init --skip-preflight-checks --kubernetes-version {}",
                profile.versions.kubernetes
            ),
            format!("kubectl create -n kube-system -f {}", WEAVE_MANIFEST),
        ],
    )
}

#[derive(Debug, Clone)]
pub struct KubeletImage {
    variant: Variant,
    name: String,
}

impl KubeletImage {
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            name: format!("kubelet-{}", variant),
        }
    }

    fn alpine(&self, profile: &Profile, image: &mut DescriptorBuilder<'_>) {
        image
            .from(profile.base_image.as_str())
            .install(ALPINE_PACKAGES)
            .download("/usr/bin/kubelet", 0o755, profile.url(Artifact::Kubelet))
            .download("/usr/bin/kubeadm", 0o755, profile.url(Artifact::Kubeadm))
            .download("/usr/bin/kubectl", 0o755, profile.url(Artifact::Kubectl))
            .download("/sbin/tini", 0o755, profile.url(Artifact::Tini))
            .download(WEAVE_MANIFEST, 0o644, profile.url(Artifact::WeaveManifest))
            .download(CNI_TARBALL, 0o644, profile.url(Artifact::CniPlugins))
            .mkdir(CNI_BIN_DIR)
            .extract(CNI_TARBALL, CNI_BIN_DIR);
    }

    fn hyperkube(&self, profile: &Profile, image: &mut DescriptorBuilder<'_>) {
        image
            .from(profile.base_image.as_str())
            .install(HYPERKUBE_PACKAGES)
            .apt_repository(APT_KEY_URL, APT_REPOSITORY, "kubernetes")
            .install(&["kubernetes-cni"])
            .download("/usr/bin/kubeadm", 0o755, profile.url(Artifact::Kubeadm))
            .download("/sbin/tini", 0o755, profile.url(Artifact::Tini))
            .download(WEAVE_MANIFEST, 0o644, profile.url(Artifact::WeaveManifest))
            .symlink("/hyperkube", "/usr/bin/kubelet")
            .symlink("/hyperkube", "/usr/bin/kubectl");
    }
}

impl Descriptor for KubeletImage {
    fn name(&self) -> &str {
        &self.name
    }

    fn variant(&self) -> Variant {
        self.variant
    }

    fn describe(&self, profile: &Profile) -> Result<ImageDescriptor> {
        let mut image = DescriptorBuilder::new(self.name.as_str(), profile);
        match self.variant {
            Variant::Alpine => self.alpine(profile, &mut image),
            Variant::Hyperkube => self.hyperkube(profile, &mut image),
        }
        image
            .wrapper(kubelet_script())
            .wrapper(kubeadm_init_script(profile))
            .flatten()
            .env("KUBECONFIG", KUBECONFIG)
            .set_exec(&["/sbin/tini", "--"], &[KUBELET_SH]);

        let tag = format!("{}-{}", profile.versions.kubernetes, self.variant);
        image.tag(profile.image_tag("kubelet", &tag))
    }
}
