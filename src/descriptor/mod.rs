//! Declarative image descriptors.
//!
//! A descriptor describes WHAT goes into one image: a base, an ordered list
//! of [`Step`]s, environment, process and tag. Renderers and the external
//! builder decide HOW those steps become layers.
//!
//! Descriptors are written against [`DescriptorBuilder`], which mirrors the
//! small DSL the image builder understands:
//!
//! ```rust
//! use kube_node_images::descriptor::DescriptorBuilder;
//! use kube_node_images::Profile;
//!
//! let profile = Profile::alpine();
//! let mut image = DescriptorBuilder::new("example", &profile);
//! image
//!     .from("alpine:3.5")
//!     .install(&["curl"])
//!     .run("mkdir -p /etc/example")
//!     .flatten()
//!     .env("EXAMPLE", "1")
//!     .set_exec(&[] as &[&str], &["/bin/sh"]);
//! let descriptor = image.tag("example/image:latest").unwrap();
//! assert_eq!(descriptor.layers().len(), 2);
//! ```

pub mod kubelet;
pub mod mounts;

use anyhow::{bail, Result};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::commands;
use crate::config::Config;
use crate::profile::{PackageManager, Profile, Variant};
use crate::wrapper::WrapperScript;

pub use kubelet::KubeletImage;
pub use mounts::MountsImage;

/// Anything that evaluates to one tagged image.
pub trait Descriptor {
    /// Name used on the command line and in logs.
    fn name(&self) -> &str;

    /// Profile the descriptor is evaluated against.
    fn variant(&self) -> Variant;

    /// Evaluate top-to-bottom into a static step list.
    fn describe(&self, profile: &Profile) -> Result<ImageDescriptor>;
}

/// An external artifact fetched during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadSpec {
    pub path: String,
    pub url: String,
    pub mode: u32,
    pub verify_tls: bool,
}

impl DownloadSpec {
    pub fn command(&self) -> String {
        commands::download(&self.path, self.mode, &self.url, self.verify_tls)
    }
}

/// One declared build step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    Install {
        manager: PackageManager,
        packages: Vec<String>,
    },
    AptRepository {
        key_url: String,
        line: String,
        list_name: String,
        verify_tls: bool,
    },
    Download(DownloadSpec),
    Extract {
        archive: String,
        dir: String,
    },
    Symlink {
        target: String,
        link: String,
    },
    Mkdir {
        path: String,
    },
    Wrapper(WrapperScript),
    Run {
        command: String,
    },
    /// Squash every layer produced so far into one.
    Flatten,
}

impl Step {
    /// Shell command for this step, or `None` for layer directives.
    pub fn command(&self) -> Option<String> {
        let command = match self {
            Step::Install { manager, packages } => {
                commands::install_packages(*manager, packages).join(" && ")
            }
            Step::AptRepository {
                key_url,
                line,
                list_name,
                verify_tls,
            } => format!(
                "{} && {}",
                commands::add_apt_key(key_url, *verify_tls),
                commands::add_apt_repository(line, list_name)
            ),
            Step::Download(spec) => spec.command(),
            Step::Extract { archive, dir } => commands::extract_tarball(archive, dir),
            Step::Symlink { target, link } => commands::symlink(target, link),
            Step::Mkdir { path } => commands::mkdir_p(path),
            Step::Wrapper(script) => script.command(),
            Step::Run { command } => command.clone(),
            Step::Flatten => return None,
        };
        Some(command)
    }
}

/// Container process: entrypoint plus default arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Exec {
    pub entrypoint: Vec<String>,
    pub cmd: Vec<String>,
}

/// The evaluated form of a descriptor. One descriptor, one tagged image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageDescriptor {
    pub name: String,
    pub variant: Variant,
    pub base: String,
    pub steps: Vec<Step>,
    pub env: BTreeMap<String, String>,
    pub exec: Option<Exec>,
    pub tag: String,
}

impl ImageDescriptor {
    /// Commands of every `run` layer, in order.
    pub fn layers(&self) -> Vec<String> {
        self.steps.iter().filter_map(Step::command).collect()
    }

    pub fn wrappers(&self) -> impl Iterator<Item = &WrapperScript> {
        self.steps.iter().filter_map(|step| match step {
            Step::Wrapper(script) => Some(script),
            _ => None,
        })
    }

    pub fn downloads(&self) -> impl Iterator<Item = &DownloadSpec> {
        self.steps.iter().filter_map(|step| match step {
            Step::Download(spec) => Some(spec),
            _ => None,
        })
    }

    pub fn is_flattened(&self) -> bool {
        self.steps.iter().any(|step| matches!(step, Step::Flatten))
    }
}

/// Collects DSL calls into an [`ImageDescriptor`].
pub struct DescriptorBuilder<'a> {
    name: String,
    profile: &'a Profile,
    base: Option<String>,
    steps: Vec<Step>,
    env: BTreeMap<String, String>,
    exec: Option<Exec>,
}

impl<'a> DescriptorBuilder<'a> {
    pub fn new(name: impl Into<String>, profile: &'a Profile) -> Self {
        Self {
            name: name.into(),
            profile,
            base: None,
            steps: Vec::new(),
            env: BTreeMap::new(),
            exec: None,
        }
    }

    pub fn from(&mut self, image: impl Into<String>) -> &mut Self {
        self.base = Some(image.into());
        self
    }

    pub fn run(&mut self, command: impl Into<String>) -> &mut Self {
        self.step(Step::Run {
            command: command.into(),
        })
    }

    /// Install OS packages with the profile's package manager.
    pub fn install<S: AsRef<str>>(&mut self, packages: &[S]) -> &mut Self {
        let packages = packages.iter().map(|p| p.as_ref().to_string()).collect();
        self.step(Step::Install {
            manager: self.profile.package_manager,
            packages,
        })
    }

    pub fn apt_repository(
        &mut self,
        key_url: impl Into<String>,
        line: impl Into<String>,
        list_name: impl Into<String>,
    ) -> &mut Self {
        self.step(Step::AptRepository {
            key_url: key_url.into(),
            line: line.into(),
            list_name: list_name.into(),
            verify_tls: self.profile.verify_tls,
        })
    }

    /// Fetch `url` to `path` with `mode`, honouring the profile's TLS policy.
    pub fn download(
        &mut self,
        path: impl Into<String>,
        mode: u32,
        url: impl Into<String>,
    ) -> &mut Self {
        self.step(Step::Download(DownloadSpec {
            path: path.into(),
            url: url.into(),
            mode,
            verify_tls: self.profile.verify_tls,
        }))
    }

    pub fn extract(&mut self, archive: impl Into<String>, dir: impl Into<String>) -> &mut Self {
        self.step(Step::Extract {
            archive: archive.into(),
            dir: dir.into(),
        })
    }

    pub fn symlink(&mut self, target: impl Into<String>, link: impl Into<String>) -> &mut Self {
        self.step(Step::Symlink {
            target: target.into(),
            link: link.into(),
        })
    }

    pub fn mkdir(&mut self, path: impl Into<String>) -> &mut Self {
        self.step(Step::Mkdir { path: path.into() })
    }

    pub fn wrapper(&mut self, script: WrapperScript) -> &mut Self {
        self.step(Step::Wrapper(script))
    }

    pub fn flatten(&mut self) -> &mut Self {
        self.step(Step::Flatten)
    }

    pub fn env(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn set_exec<E: AsRef<str>, C: AsRef<str>>(&mut self, entrypoint: &[E], cmd: &[C]) -> &mut Self {
        self.exec = Some(Exec {
            entrypoint: entrypoint.iter().map(|s| s.as_ref().to_string()).collect(),
            cmd: cmd.iter().map(|s| s.as_ref().to_string()).collect(),
        });
        self
    }

    /// Name the output image and finish evaluation.
    pub fn tag(self, name: impl Into<String>) -> Result<ImageDescriptor> {
        let Some(base) = self.base else {
            bail!("descriptor '{}' never declared a base image", self.name);
        };
        Ok(ImageDescriptor {
            name: self.name,
            variant: self.profile.variant,
            base,
            steps: self.steps,
            env: self.env,
            exec: self.exec,
            tag: name.into(),
        })
    }

    fn step(&mut self, step: Step) -> &mut Self {
        self.steps.push(step);
        self
    }
}

/// Every shipped descriptor.
pub fn all() -> Vec<Box<dyn Descriptor>> {
    vec![
        Box::new(KubeletImage::new(Variant::Alpine)),
        Box::new(KubeletImage::new(Variant::Hyperkube)),
        Box::new(MountsImage::new(Variant::Alpine)),
        Box::new(MountsImage::new(Variant::Hyperkube)),
    ]
}

pub fn names() -> Vec<String> {
    all().iter().map(|d| d.name().to_string()).collect()
}

pub fn find(name: &str) -> Result<Box<dyn Descriptor>> {
    match all().into_iter().find(|d| d.name() == name) {
        Some(descriptor) => Ok(descriptor),
        None => bail!(
            "unknown descriptor '{}'; expected one of: {}",
            name,
            names().join(", ")
        ),
    }
}

/// Look up `name` and evaluate it against the configured profile.
pub fn evaluate(name: &str, config: &Config) -> Result<ImageDescriptor> {
    let descriptor = find(name)?;
    let profile = config.profile(descriptor.variant());
    log::debug!(
        "evaluating '{}' against profile '{}'",
        descriptor.name(),
        profile.variant
    );
    descriptor.describe(&profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_requires_base() {
        let profile = Profile::alpine();
        let image = DescriptorBuilder::new("no-base", &profile);
        let err = image.tag("x:y").unwrap_err();
        assert!(err.to_string().contains("never declared a base image"));
    }

    #[test]
    fn test_builder_records_steps_in_order() {
        let profile = Profile::hyperkube();
        let mut image = DescriptorBuilder::new("ordered", &profile);
        image
            .from("debian:jessie")
            .install(&["curl"])
            .download("/usr/bin/kubeadm", 0o755, "https://dl.k8s.io/v1.6.1/bin/linux/amd64/kubeadm")
            .flatten();
        let descriptor = image.tag("ordered:latest").unwrap();

        assert!(matches!(
            descriptor.steps[0],
            Step::Install {
                manager: PackageManager::AptGet,
                ..
            }
        ));
        assert!(matches!(descriptor.steps[1], Step::Download(_)));
        assert_eq!(descriptor.steps[2], Step::Flatten);
        assert!(descriptor.is_flattened());
        assert_eq!(descriptor.layers().len(), 2);
    }

    #[test]
    fn test_download_inherits_tls_policy() {
        let profile = Profile::hyperkube();
        let mut image = DescriptorBuilder::new("tls", &profile);
        image.from("x").download("/a", 0o644, "https://example.com/a");
        let descriptor = image.tag("t").unwrap();
        let spec = descriptor.downloads().next().unwrap();
        assert!(!spec.verify_tls);
        assert!(spec.command().contains("--insecure"));
    }

    #[test]
    fn test_install_step_joins_update_and_add() {
        let step = Step::Install {
            manager: PackageManager::Apk,
            packages: vec!["foo".into(), "bar".into()],
        };
        assert_eq!(step.command().unwrap(), "apk update && apk add foo bar");
        assert_eq!(Step::Flatten.command(), None);
    }

    #[test]
    fn test_find_unknown_descriptor() {
        let err = find("kubelet-fedora").err().unwrap();
        assert!(err.to_string().contains("kubelet-alpine"));
    }

    #[test]
    fn test_names_are_unique() {
        let mut names = names();
        let count = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), count);
        assert_eq!(count, 4);
    }
}
