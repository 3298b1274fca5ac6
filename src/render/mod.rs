//! Renderings of an evaluated descriptor for the external image builder.
//!
//! - [`dockerfile`] - `FROM`/`RUN`/`ENV`/`ENTRYPOINT`/`CMD`
//! - [`plan`] - JSON build plan with wrapper digests

pub mod dockerfile;
pub mod plan;

use anyhow::{bail, Result};

use crate::descriptor::ImageDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Dockerfile,
    Plan,
}

impl Format {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "dockerfile" | "Dockerfile" => Ok(Format::Dockerfile),
            "plan" | "json" => Ok(Format::Plan),
            other => bail!(
                "unsupported format '{}'; expected 'dockerfile' or 'plan'",
                other
            ),
        }
    }
}

pub fn render(descriptor: &ImageDescriptor, format: Format) -> Result<String> {
    match format {
        Format::Dockerfile => Ok(dockerfile::render(descriptor)),
        Format::Plan => plan::render(descriptor),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse() {
        assert_eq!(Format::parse("dockerfile").unwrap(), Format::Dockerfile);
        assert_eq!(Format::parse("json").unwrap(), Format::Plan);
        assert!(Format::parse("yaml").is_err());
    }
}
