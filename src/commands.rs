//! Shell command builders shared by every descriptor.
//!
//! Each builder formats one command string (or, for package installs, the
//! update/install pair) from its arguments. Arguments are authored next to
//! the calls and are passed through verbatim.

use crate::profile::PackageManager;

/// Update the package index and install `packages`.
pub fn install_packages<S: AsRef<str>>(manager: PackageManager, packages: &[S]) -> Vec<String> {
    let names = packages
        .iter()
        .map(|p| p.as_ref())
        .collect::<Vec<_>>()
        .join(" ");
    match manager {
        PackageManager::Apk => vec!["apk update".to_string(), format!("apk add {}", names)],
        PackageManager::AptGet => vec![
            "apt-get update".to_string(),
            format!("apt-get install -y --no-install-recommends {}", names),
        ],
    }
}

pub fn mount_bind(source: &str, target: &str) -> String {
    format!("mount --bind {} {}", source, target)
}

pub fn make_shared(path: &str) -> String {
    format!("mount --make-rshared {}", path)
}

pub fn mount_persistent_disk(device: &str, path: &str) -> String {
    format!("mount {} {}", device, path)
}

pub fn mkdir_p(path: &str) -> String {
    format!("mkdir -p {}", path)
}

pub fn symlink(target: &str, link: &str) -> String {
    format!("ln -s {} {}", target, link)
}

/// Write `body` to `path` as an executable `/bin/sh` script.
pub fn create_shell_wrapper(body: &str, path: &str) -> String {
    format!(
        "printf '#!/bin/sh\\n%s\\n' {} > {} && chmod 0755 {}",
        single_quote(body),
        path,
        path
    )
}

/// Fetch `url` to `dest`, then apply `mode`.
///
/// A non-2xx response makes curl exit non-zero (`--fail`).
pub fn download(dest: &str, mode: u32, url: &str, verify_tls: bool) -> String {
    let insecure = if verify_tls { "" } else { " --insecure" };
    format!(
        "curl --fail --silent --location{} --output {} {} && chmod {:04o} {}",
        insecure, dest, url, mode, dest
    )
}

/// Unpack a gzipped tarball into an existing `dir`, then drop the archive.
pub fn extract_tarball(archive: &str, dir: &str) -> String {
    format!(
        "tar -xzf {archive} -C {dir} && rm -f {archive}",
        dir = dir,
        archive = archive
    )
}

pub fn add_apt_key(url: &str, verify_tls: bool) -> String {
    let insecure = if verify_tls { "" } else { " --insecure" };
    format!(
        "curl --fail --silent --location{} {} | apt-key add -",
        insecure, url
    )
}

pub fn add_apt_repository(line: &str, list_name: &str) -> String {
    format!(
        "echo {} > /etc/apt/sources.list.d/{}.list",
        single_quote(line),
        list_name
    )
}

/// Quote for POSIX sh; embedded single quotes become `'\''`.
fn single_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_packages_apk() {
        assert_eq!(
            install_packages(PackageManager::Apk, &["foo", "bar"]),
            vec!["apk update".to_string(), "apk add foo bar".to_string()]
        );
    }

    #[test]
    fn test_install_packages_apt() {
        assert_eq!(
            install_packages(PackageManager::AptGet, &["curl"]),
            vec![
                "apt-get update".to_string(),
                "apt-get install -y --no-install-recommends curl".to_string()
            ]
        );
    }

    #[test]
    fn test_mount_builders() {
        assert_eq!(mount_bind("/a", "/b"), "mount --bind /a /b");
        assert_eq!(mount_bind("/a", "/b"), mount_bind("/a", "/b"));
        assert_eq!(make_shared("/etc/cni"), "mount --make-rshared /etc/cni");
        assert_eq!(
            mount_persistent_disk("/dev/sda1", "/var/lib"),
            "mount /dev/sda1 /var/lib"
        );
        assert_eq!(mkdir_p("/var/lib/cni/bin"), "mkdir -p /var/lib/cni/bin");
    }

    #[test]
    fn test_download_kubeadm() {
        let cmd = download(
            "/usr/bin/kubeadm",
            0o755,
            "https://dl.k8s.io/v1.6.1/bin/linux/amd64/kubeadm",
            true,
        );
        assert_eq!(
            cmd,
            "curl --fail --silent --location --output /usr/bin/kubeadm \
             https://dl.k8s.io/v1.6.1/bin/linux/amd64/kubeadm && chmod 0755 /usr/bin/kubeadm"
        );
    }

    #[test]
    fn test_download_insecure() {
        let cmd = download("/etc/weave.yaml", 0o644, "https://example.com/w.yaml", false);
        assert!(cmd.starts_with("curl --fail --silent --location --insecure --output"));
        assert!(cmd.ends_with("chmod 0644 /etc/weave.yaml"));
    }

    #[test]
    fn test_create_shell_wrapper() {
        assert_eq!(
            create_shell_wrapper("kubeadm init", "/usr/bin/kubeadm-init.sh"),
            "printf '#!/bin/sh\\n%s\\n' 'kubeadm init' > /usr/bin/kubeadm-init.sh \
             && chmod 0755 /usr/bin/kubeadm-init.sh"
        );
    }

    #[test]
    fn test_create_shell_wrapper_escapes_quotes() {
        let cmd = create_shell_wrapper("echo 'hi'", "/x.sh");
        assert!(cmd.contains("'echo '\\''hi'\\'''"));
    }

    #[test]
    fn test_apt_repository_setup() {
        assert_eq!(
            add_apt_repository("deb http://apt.kubernetes.io/ kubernetes-xenial main", "kubernetes"),
            "echo 'deb http://apt.kubernetes.io/ kubernetes-xenial main' > \
             /etc/apt/sources.list.d/kubernetes.list"
        );
        assert_eq!(
            add_apt_key("https://packages.cloud.google.com/apt/doc/apt-key.gpg", true),
            "curl --fail --silent --location \
             https://packages.cloud.google.com/apt/doc/apt-key.gpg | apt-key add -"
        );
    }

    #[test]
    fn test_extract_tarball() {
        assert_eq!(
            extract_tarball("/tmp/cni.tgz", "/opt/cni/bin"),
            "tar -xzf /tmp/cni.tgz -C /opt/cni/bin && rm -f /tmp/cni.tgz"
        );
    }
}
