//! Build descriptors for Kubernetes node container images.
//!
//! Each descriptor declares one image that packages a Kubernetes node
//! (kubelet, kubeadm, kubectl, CNI plugins, Weave) or its companion mounts
//! image, for one of two base distributions:
//!
//! - **alpine** - `apk`, every binary downloaded from upstream releases
//! - **hyperkube** - Debian-based hyperkube image, `apt-get`, CNI from the
//!   Kubernetes APT repository
//!
//! # Architecture
//!
//! ```text
//! versions ── artifact ── profile        pinned versions → URLs, per-variant config
//!                 │
//! commands ── wrapper                    pure shell command builders
//!                 │
//!            descriptor                  from/run/env/set_exec/flatten/tag DSL
//!                 │
//!       render ── stage ── context       Dockerfile / plan.json / tar context
//!                                │
//!                              docker    external image builder
//! ```
//!
//! Nothing here executes a layer. Evaluation produces a static instruction
//! list that an external builder turns into an image.
//!
//! # Example
//!
//! ```rust
//! use kube_node_images::{descriptor, render, Config};
//!
//! let config = Config::default();
//! let image = descriptor::evaluate("kubelet-alpine", &config).unwrap();
//! let dockerfile = render::render(&image, render::Format::Dockerfile).unwrap();
//! assert!(dockerfile.contains("FROM alpine:3.5"));
//! ```

pub mod artifact;
pub mod commands;
pub mod config;
pub mod context;
pub mod descriptor;
pub mod digest;
pub mod docker;
pub mod preflight;
pub mod profile;
pub mod render;
pub mod stage;
pub mod versions;
pub mod wrapper;

pub use artifact::Artifact;
pub use config::Config;
pub use descriptor::{Descriptor, DescriptorBuilder, DownloadSpec, ImageDescriptor, Step};
pub use profile::{PackageManager, Profile, Variant};
pub use versions::{Component, VersionSet};
pub use wrapper::WrapperScript;
