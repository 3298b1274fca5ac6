//! JSON build plan.
//!
//! The plan is the full evaluated descriptor plus the lowered `run`
//! commands and a digest of every wrapper script, so two evaluations can be
//! compared byte for byte.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::descriptor::{Exec, ImageDescriptor, Step};
use crate::digest::sha256_hex;
use crate::profile::Variant;

pub const PLAN_SCHEMA: u32 = 1;

#[derive(Debug, Serialize)]
pub struct BuildPlan<'a> {
    pub schema: u32,
    pub name: &'a str,
    pub variant: Variant,
    pub tag: &'a str,
    pub base: &'a str,
    pub flatten: bool,
    pub layers: Vec<String>,
    pub env: &'a BTreeMap<String, String>,
    pub exec: Option<&'a Exec>,
    pub scripts: Vec<ScriptDigest>,
    pub steps: &'a [Step],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptDigest {
    pub path: String,
    pub mode: String,
    pub sha256: String,
}

impl<'a> BuildPlan<'a> {
    pub fn new(descriptor: &'a ImageDescriptor) -> Self {
        let scripts = descriptor
            .wrappers()
            .map(|script| ScriptDigest {
                path: script.path.clone(),
                mode: format!("{:04o}", script.mode()),
                sha256: sha256_hex(script.render().as_bytes()),
            })
            .collect();

        Self {
            schema: PLAN_SCHEMA,
            name: &descriptor.name,
            variant: descriptor.variant,
            tag: &descriptor.tag,
            base: &descriptor.base,
            flatten: descriptor.is_flattened(),
            layers: descriptor.layers(),
            env: &descriptor.env,
            exec: descriptor.exec.as_ref(),
            scripts,
            steps: &descriptor.steps,
        }
    }
}

pub fn render(descriptor: &ImageDescriptor) -> Result<String> {
    let plan = BuildPlan::new(descriptor);
    let mut json = serde_json::to_string_pretty(&plan)
        .with_context(|| format!("serializing build plan for '{}'", descriptor.name))?;
    json.push('\n');
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Descriptor, KubeletImage};
    use crate::profile::Profile;

    fn alpine_plan() -> serde_json::Value {
        let descriptor = KubeletImage::new(Variant::Alpine)
            .describe(&Profile::alpine())
            .unwrap();
        serde_json::from_str(&render(&descriptor).unwrap()).unwrap()
    }

    #[test]
    fn test_plan_fields() {
        let plan = alpine_plan();
        assert_eq!(plan["schema"], 1);
        assert_eq!(plan["name"], "kubelet-alpine");
        assert_eq!(plan["variant"], "alpine");
        assert_eq!(plan["flatten"], true);
        assert_eq!(plan["env"]["KUBECONFIG"], "/etc/kubernetes/admin.conf");
        assert_eq!(plan["exec"]["cmd"][0], "/usr/bin/kubelet.sh");
        assert_eq!(plan["steps"][0]["kind"], "install");
        assert_eq!(plan["steps"][0]["manager"], "apk");
    }

    #[test]
    fn test_plan_script_digests() {
        let plan = alpine_plan();
        let scripts = plan["scripts"].as_array().unwrap();
        assert_eq!(scripts.len(), 2);
        assert_eq!(scripts[0]["path"], "/usr/bin/kubelet.sh");
        assert_eq!(scripts[0]["mode"], "0755");
        assert_eq!(
            scripts[0]["sha256"],
            sha256_hex(crate::descriptor::kubelet::kubelet_script().render().as_bytes())
        );
    }

    #[test]
    fn test_plan_download_step_shape() {
        let plan = alpine_plan();
        let download = plan["steps"]
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["kind"] == "download" && s["path"] == "/usr/bin/kubeadm")
            .unwrap();
        assert_eq!(download["url"], "https://dl.k8s.io/v1.6.1/bin/linux/amd64/kubeadm");
        assert_eq!(download["mode"], 0o755);
    }
}
