//! Preflight checks for handing contexts to the image builder.
//!
//! # Example
//!
//! ```rust
//! use kube_node_images::preflight::{command_exists, check_required_tools};
//!
//! if !command_exists("docker") {
//!     println!("docker not installed");
//! }
//!
//! let tools = &[("docker", "docker-ce")];
//! if let Err(e) = check_required_tools(tools) {
//!     eprintln!("{}", e);
//! }
//! ```

use anyhow::{bail, Result};

/// Check if a command exists in PATH.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Host tools needed by `build`. Each tuple is (command_name, package_name).
pub const REQUIRED_TOOLS: &[(&str, &str)] = &[("docker", "docker-ce")];

/// Check that specific tools are available.
///
/// Returns an error listing every missing tool with the package providing it.
pub fn check_required_tools(tools: &[(&str, &str)]) -> Result<()> {
    let missing = tools
        .iter()
        .filter(|(tool, _)| !command_exists(tool))
        .collect::<Vec<_>>();

    if !missing.is_empty() {
        let msg = missing
            .iter()
            .map(|(t, p)| format!("  {} (install: {})", t, p))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("Missing required host tools:\n{}", msg);
    }

    Ok(())
}

pub fn check_host_tools() -> Result<()> {
    check_required_tools(REQUIRED_TOOLS)
}
