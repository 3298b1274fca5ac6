//! Deterministic tar build contexts.
//!
//! Entries are sorted by relative path and written with mtime, uid and gid
//! zeroed and modes normalised, so the same staged descriptor packs to the
//! same bytes on any host.

use anyhow::{bail, Context, Result};
use std::fs::{self, File};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tar::Builder as TarBuilder;
use walkdir::WalkDir;

use crate::digest::sha256_file;
use crate::wrapper::WRAPPER_MODE;

/// A packed build context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedContext {
    pub path: PathBuf,
    pub sha256: String,
    pub size: u64,
}

/// Pack `src_dir` into a tar at `out_path`.
pub fn pack(src_dir: &Path, out_path: &Path) -> Result<PackedContext> {
    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory '{}'", parent.display()))?;
        }
    }
    let out = File::create(out_path)
        .with_context(|| format!("Failed to create {}", out_path.display()))?;
    write_tar(src_dir, out)
        .with_context(|| format!("packing '{}' into '{}'", src_dir.display(), out_path.display()))?;

    let (sha256, size) = sha256_file(out_path)?;
    log::info!(
        "packed {} ({} bytes, sha256 {})",
        out_path.display(),
        size,
        sha256
    );
    Ok(PackedContext {
        path: out_path.to_path_buf(),
        sha256,
        size,
    })
}

/// Mode of every directory entry.
const DIR_MODE: u32 = 0o755;

/// Stream a tar of `src_dir` into `out`.
///
/// Modes are normalised so the host umask never reaches the archive:
/// directories and executable files get 0755, other files 0644. A staged
/// context holds only directories and regular files.
pub fn write_tar<W: Write>(src_dir: &Path, out: W) -> Result<W> {
    let mut entries: Vec<(String, PathBuf)> = Vec::new();
    for entry in WalkDir::new(src_dir).min_depth(1) {
        let entry = entry.with_context(|| format!("walking '{}'", src_dir.display()))?;
        let rel = entry
            .path()
            .strip_prefix(src_dir)?
            .to_string_lossy()
            .replace('\\', "/");
        entries.push((rel, entry.into_path()));
    }
    entries.sort();

    let mut builder = TarBuilder::new(out);
    for (rel, path) in entries {
        let md = fs::symlink_metadata(&path)
            .with_context(|| format!("reading metadata '{}'", path.display()))?;

        let mut header = tar::Header::new_gnu();
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);

        if md.is_dir() {
            header.set_entry_type(tar::EntryType::Directory);
            header.set_mode(DIR_MODE);
            header.set_size(0);
            header.set_cksum();
            builder.append_data(&mut header, &rel, std::io::empty())?;
        } else if md.is_file() {
            let f = File::open(&path).with_context(|| format!("opening '{}'", path.display()))?;
            header.set_entry_type(tar::EntryType::Regular);
            header.set_mode(file_mode(md.permissions().mode()));
            header.set_size(md.len());
            header.set_cksum();
            builder.append_data(&mut header, &rel, f)?;
        } else {
            bail!(
                "'{}' is neither a file nor a directory; build contexts hold only staged files",
                path.display()
            );
        }
    }

    builder
        .into_inner()
        .with_context(|| "Failed to finalize tar builder")
}

fn file_mode(host_mode: u32) -> u32 {
    if host_mode & 0o111 != 0 {
        WRAPPER_MODE
    } else {
        0o644
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Descriptor, KubeletImage};
    use crate::profile::{Profile, Variant};
    use crate::stage::stage;
    use tempfile::TempDir;

    #[test]
    fn test_pack_is_reproducible() {
        let temp = TempDir::new().unwrap();
        let profile = Profile::alpine();
        let image = KubeletImage::new(Variant::Alpine);

        let dir = stage(&image.describe(&profile).unwrap(), &temp.path().join("a")).unwrap();
        let first = pack(&dir, &temp.path().join("a.tar")).unwrap();

        let dir = stage(&image.describe(&profile).unwrap(), &temp.path().join("b")).unwrap();
        let second = pack(&dir, &temp.path().join("b.tar")).unwrap();

        assert_eq!(first.sha256, second.sha256);
        assert_eq!(first.size, second.size);
    }

    #[test]
    fn test_tar_entries_sorted_with_modes() {
        let temp = TempDir::new().unwrap();
        let descriptor = KubeletImage::new(Variant::Hyperkube)
            .describe(&Profile::hyperkube())
            .unwrap();
        let dir = stage(&descriptor, temp.path()).unwrap();

        let bytes = write_tar(&dir, Vec::new()).unwrap();
        let mut archive = tar::Archive::new(bytes.as_slice());
        let mut names = Vec::new();
        for entry in archive.entries().unwrap() {
            let entry = entry.unwrap();
            let name = entry.path().unwrap().to_string_lossy().into_owned();
            if name == "rootfs/usr/bin/kubelet.sh" {
                assert_eq!(entry.header().mode().unwrap() & 0o777, 0o755);
                assert_eq!(entry.header().mtime().unwrap(), 0);
            }
            names.push(name);
        }

        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert!(names.contains(&"Dockerfile".to_string()));
        assert!(names.contains(&"rootfs/usr/bin/kubeadm-init.sh".to_string()));
    }

    #[test]
    fn test_modes_ignore_host_permissions() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("ctx");
        fs::create_dir_all(src.join("rootfs/usr/bin")).unwrap();
        fs::write(src.join("Dockerfile"), "FROM scratch\n").unwrap();
        fs::write(src.join("rootfs/usr/bin/run.sh"), "#!/bin/sh\ntrue\n").unwrap();
        fs::set_permissions(src.join("Dockerfile"), fs::Permissions::from_mode(0o600)).unwrap();
        fs::set_permissions(src.join("rootfs/usr/bin/run.sh"), fs::Permissions::from_mode(0o700))
            .unwrap();
        fs::set_permissions(src.join("rootfs"), fs::Permissions::from_mode(0o700)).unwrap();

        let bytes = write_tar(&src, Vec::new()).unwrap();
        let mut archive = tar::Archive::new(bytes.as_slice());
        let mut modes = Vec::new();
        for entry in archive.entries().unwrap() {
            let entry = entry.unwrap();
            let name = entry.path().unwrap().to_string_lossy().into_owned();
            modes.push((name, entry.header().mode().unwrap()));
        }

        assert_eq!(
            modes,
            vec![
                ("Dockerfile".to_string(), 0o644),
                ("rootfs".to_string(), 0o755),
                ("rootfs/usr".to_string(), 0o755),
                ("rootfs/usr/bin".to_string(), 0o755),
                ("rootfs/usr/bin/run.sh".to_string(), 0o755),
            ]
        );
    }

    #[test]
    fn test_symlink_in_context_is_rejected() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("ctx");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("Dockerfile"), "FROM scratch\n").unwrap();
        std::os::unix::fs::symlink("Dockerfile", src.join("link")).unwrap();

        let err = write_tar(&src, Vec::new()).unwrap_err();
        assert!(err.to_string().contains("neither a file nor a directory"));
    }
}
