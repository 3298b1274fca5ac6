//! Hand a packed build context to `docker build`.
//!
//! The crate never executes layers itself. This is the one place where the
//! external builder is invoked, and any failure there aborts the image.

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::context::{self, PackedContext};
use crate::descriptor::ImageDescriptor;
use crate::preflight;
use crate::stage;

/// Arguments passed to `docker` for `descriptor`, reading the context from stdin.
///
/// Flatten is carried by the rendered Dockerfile itself, so no builder
/// flag depends on it.
pub fn build_args(descriptor: &ImageDescriptor) -> Vec<String> {
    vec![
        "build".to_string(),
        "--tag".to_string(),
        descriptor.tag.clone(),
        "-".to_string(),
    ]
}

/// Stage, pack and build `descriptor` under `out_dir`.
pub fn build(descriptor: &ImageDescriptor, out_dir: &Path) -> Result<PackedContext> {
    preflight::check_host_tools()?;

    let stage_dir = stage::stage(descriptor, out_dir)?;
    let tar_path = out_dir.join(format!("{}.tar", descriptor.name));
    let packed = context::pack(&stage_dir, &tar_path)?;

    let input = File::open(&packed.path)
        .with_context(|| format!("opening build context '{}'", packed.path.display()))?;
    let args = build_args(descriptor);
    log::info!("docker {}", args.join(" "));

    let status = Command::new("docker")
        .args(&args)
        .stdin(Stdio::from(input))
        .status()
        .with_context(|| format!("executing docker build for '{}'", descriptor.name))?;

    if !status.success() {
        bail!(
            "docker build failed for '{}' (status {})",
            descriptor.name,
            status
        );
    }

    log::info!("built {}", descriptor.tag);
    Ok(packed)
}
