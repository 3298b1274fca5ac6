//! Companion mounts image.
//!
//! Runs once in the host mount namespace: mounts the persistent disk at
//! /var/lib and bind-mounts the kubeadm and CNI state directories onto the
//! paths kubelet expects, each made rshared so pods see them.

use anyhow::Result;

use super::{Descriptor, DescriptorBuilder, ImageDescriptor};
use crate::commands::{make_shared, mkdir_p, mount_bind, mount_persistent_disk};
use crate::profile::{Profile, Variant};
use crate::wrapper::WrapperScript;

pub const KUBE_MOUNTS_SH: &str = "/usr/bin/kube-mounts.sh";

const PERSISTENT_ROOT: &str = "/var/lib";

/// (backing directory on the persistent disk, mount point)
const BIND_MOUNTS: &[(&str, &str)] = &[
    ("/var/lib/cni/conf", "/etc/cni/net.d"),
    ("/var/lib/cni/bin", "/opt/cni/bin"),
    ("/var/lib/kubeadm", "/etc/kubernetes"),
];

pub fn kube_mounts_script(profile: &Profile) -> WrapperScript {
    let mut statements = vec![
        mkdir_p(PERSISTENT_ROOT),
        mount_persistent_disk(&profile.persistent_disk, PERSISTENT_ROOT),
    ];
    for (source, target) in BIND_MOUNTS {
        statements.push(mkdir_p(source));
        statements.push(mkdir_p(target));
    }
    for (source, target) in BIND_MOUNTS {
        statements.push(mount_bind(source, target));
        statements.push(make_shared(target));
    }
    WrapperScript::chained(KUBE_MOUNTS_SH, &statements)
}

#[derive(Debug, Clone)]
pub struct MountsImage {
    variant: Variant,
    name: String,
}

impl MountsImage {
    pub fn new(variant: Variant) -> Self {
        let distro = match variant {
            Variant::Alpine => "alpine",
            Variant::Hyperkube => "debian",
        };
        Self {
            variant,
            name: format!("mounts-{}", distro),
        }
    }

    fn distro(&self) -> &str {
        self.name.trim_start_matches("mounts-")
    }
}

impl Descriptor for MountsImage {
    fn name(&self) -> &str {
        &self.name
    }

    fn variant(&self) -> Variant {
        self.variant
    }

    fn describe(&self, profile: &Profile) -> Result<ImageDescriptor> {
        let mut image = DescriptorBuilder::new(self.name.as_str(), profile);
        // busybox mount has no --make-rshared
        image
            .from(profile.mounts_base_image.as_str())
            .install(&["util-linux"])
            .wrapper(kube_mounts_script(profile))
            .flatten()
            .set_exec(&[KUBE_MOUNTS_SH], &[] as &[&str]);

        image.tag(profile.image_tag("kube-mounts", self.distro()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Step;

    #[test]
    fn test_script_mounts_disk_before_binding() {
        let script = kube_mounts_script(&Profile::alpine());
        let body = &script.body;
        assert!(body.starts_with("mkdir -p /var/lib && mount /dev/sda1 /var/lib && "));
        let disk_at = body.find("mount /dev/sda1 /var/lib").unwrap();
        let bind_at = body.find("mount --bind").unwrap();
        assert!(disk_at < bind_at);
        assert!(body.contains("mount --bind /var/lib/cni/conf /etc/cni/net.d"));
        assert!(body.contains("mount --bind /var/lib/cni/bin /opt/cni/bin"));
        assert!(body.contains("mount --bind /var/lib/kubeadm /etc/kubernetes"));
        assert!(body.ends_with("mount --make-rshared /etc/kubernetes"));
    }

    #[test]
    fn test_script_uses_configured_disk() {
        let mut profile = Profile::hyperkube();
        profile.persistent_disk = "/dev/vdb".to_string();
        assert!(kube_mounts_script(&profile)
            .body
            .contains("mount /dev/vdb /var/lib"));
    }

    #[test]
    fn test_mounts_descriptors() {
        let alpine = MountsImage::new(Variant::Alpine)
            .describe(&Profile::alpine())
            .unwrap();
        assert_eq!(alpine.name, "mounts-alpine");
        assert_eq!(alpine.tag, "linuxkit/kube-mounts:alpine");
        assert_eq!(alpine.layers()[0], "apk update && apk add util-linux");

        let debian = MountsImage::new(Variant::Hyperkube)
            .describe(&Profile::hyperkube())
            .unwrap();
        assert_eq!(debian.name, "mounts-debian");
        assert_eq!(debian.base, "debian:jessie");
        assert_eq!(debian.tag, "linuxkit/kube-mounts:debian");
        assert_eq!(debian.steps.last(), Some(&Step::Flatten));

        let exec = debian.exec.unwrap();
        assert_eq!(exec.entrypoint, vec![KUBE_MOUNTS_SH]);
        assert!(exec.cmd.is_empty());
        assert!(debian.env.is_empty());
    }
}
