//! Dockerfile rendering.
//!
//! A flattened descriptor renders as a two-stage build: the base and every
//! layer go into a `rootfs` stage, which is copied whole onto `scratch`.
//! Environment and process are declared after the copy, since `COPY --from`
//! carries files only. The tag is recorded as a header comment.

use crate::descriptor::{ImageDescriptor, Step};

pub const TAG_HEADER: &str = "# tag: ";

/// Name of the build stage holding the layers squashed by flatten `index`.
fn rootfs_stage(index: usize) -> String {
    if index == 0 {
        "rootfs".to_string()
    } else {
        format!("rootfs-{}", index)
    }
}

pub fn render(descriptor: &ImageDescriptor) -> String {
    let flattens = descriptor
        .steps
        .iter()
        .filter(|step| matches!(step, Step::Flatten))
        .count();

    let mut lines = vec![
        format!("# {}", descriptor.name),
        format!("{}{}", TAG_HEADER, descriptor.tag),
    ];
    if flattens == 0 {
        lines.push(format!("FROM {}", descriptor.base));
    } else {
        lines.push(format!("FROM {} AS {}", descriptor.base, rootfs_stage(0)));
    }

    let mut flattened = 0;
    for step in &descriptor.steps {
        match step.command() {
            Some(command) => lines.push(format!("RUN {}", command)),
            None => {
                flattened += 1;
                if flattened < flattens {
                    lines.push(format!("FROM scratch AS {}", rootfs_stage(flattened)));
                } else {
                    lines.push("FROM scratch".to_string());
                }
                lines.push(format!("COPY --from={} / /", rootfs_stage(flattened - 1)));
            }
        }
    }

    for (key, value) in &descriptor.env {
        lines.push(format!("ENV {}={}", key, env_value(value)));
    }
    if let Some(exec) = &descriptor.exec {
        if !exec.entrypoint.is_empty() {
            lines.push(format!("ENTRYPOINT {}", exec_form(&exec.entrypoint)));
        }
        if !exec.cmd.is_empty() {
            lines.push(format!("CMD {}", exec_form(&exec.cmd)));
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn exec_form(args: &[String]) -> String {
    serde_json::to_string(args).unwrap_or_else(|_| "[]".to_string())
}

fn env_value(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || c == '"' || c == '\\' || c == '$');
    if needs_quotes {
        serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value))
    } else {
        value.to_string()
    }
}
