//! Write an evaluated descriptor to a staging directory.
//!
//! Layout under `<out>/<descriptor>/`:
//!
//! ```text
//! Dockerfile
//! plan.json
//! rootfs/usr/bin/<wrapper>.sh   (mode 0755)
//! ```
//!
//! The staged wrappers are the exact files the in-image `printf` step
//! produces, so they can be inspected and diffed without building.

use anyhow::{Context, Result};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::descriptor::ImageDescriptor;
use crate::render::{dockerfile, plan};

pub const DOCKERFILE: &str = "Dockerfile";
pub const PLAN_FILE: &str = "plan.json";
pub const ROOTFS_DIR: &str = "rootfs";

/// Stage `descriptor` under `out_dir/<name>` and return that directory.
///
/// An existing staging directory for the same descriptor is replaced.
pub fn stage(descriptor: &ImageDescriptor, out_dir: &Path) -> Result<PathBuf> {
    let stage_dir = out_dir.join(&descriptor.name);
    if stage_dir.exists() {
        fs::remove_dir_all(&stage_dir)
            .with_context(|| format!("clearing staging directory '{}'", stage_dir.display()))?;
    }
    fs::create_dir_all(&stage_dir)
        .with_context(|| format!("creating staging directory '{}'", stage_dir.display()))?;

    write_file_mode(
        &stage_dir,
        DOCKERFILE,
        &dockerfile::render(descriptor),
        0o644,
    )?;
    write_file_mode(&stage_dir, PLAN_FILE, &plan::render(descriptor)?, 0o644)?;

    let rootfs = stage_dir.join(ROOTFS_DIR);
    for script in descriptor.wrappers() {
        let relative = script.path.trim_start_matches('/');
        write_file_mode(&rootfs, relative, &script.render(), script.mode())?;
        log::debug!("staged wrapper {}", rootfs.join(relative).display());
    }

    log::info!(
        "staged '{}' ({}) at {}",
        descriptor.name,
        descriptor.tag,
        stage_dir.display()
    );
    Ok(stage_dir)
}

/// Write a file with specific permissions, creating parent directories.
pub fn write_file_mode(root: &Path, path: &str, content: &str, mode: u32) -> Result<()> {
    let full_path = root.join(path);
    if let Some(parent) = full_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory '{}'", parent.display()))?;
    }
    fs::write(&full_path, content)
        .with_context(|| format!("writing '{}'", full_path.display()))?;
    fs::set_permissions(&full_path, fs::Permissions::from_mode(mode))
        .with_context(|| format!("setting permissions on '{}'", full_path.display()))?;
    Ok(())
}
