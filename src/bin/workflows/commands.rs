use anyhow::{Context, Result};
use std::path::Path;

use kube_node_images::render::{self, Format};
use kube_node_images::{artifact, descriptor, docker, Artifact, Config, Descriptor, Variant};

pub(crate) fn list(config: &Config) -> Result<()> {
    for image in descriptor::all() {
        let profile = config.profile(image.variant());
        let evaluated = image
            .describe(&profile)
            .with_context(|| format!("evaluating descriptor '{}'", image.name()))?;
        println!("{:<20} {:<10} {}", image.name(), image.variant(), evaluated.tag);
    }
    Ok(())
}

pub(crate) fn urls(config: &Config, profile: &str) -> Result<()> {
    let profile = config.profile(Variant::parse(profile)?);
    println!("{:<10} {}", "base", profile.base_image);
    for item in Artifact::ALL {
        let url = artifact::resolve(&profile.versions, item.name())?;
        println!("{:<10} {}", item.name(), url);
    }
    Ok(())
}

pub(crate) fn render(config: &Config, name: &str, format: Option<&str>) -> Result<()> {
    let format = Format::parse(format.unwrap_or("dockerfile"))?;
    let image = descriptor::evaluate(name, config)?;
    print!("{}", render::render(&image, format)?);
    Ok(())
}

pub(crate) fn stage(config: &Config, target: &str, out_dir: Option<&str>) -> Result<()> {
    let out_dir = out_dir.map(Path::new).unwrap_or(config.output_dir.as_path());
    let names = if target == "all" {
        descriptor::names()
    } else {
        vec![target.to_string()]
    };

    for name in names {
        let image = descriptor::evaluate(&name, config)?;
        let dir = kube_node_images::stage::stage(&image, out_dir)
            .with_context(|| format!("staging descriptor '{}'", name))?;
        println!("{}", dir.display());
    }
    Ok(())
}

pub(crate) fn context(config: &Config, name: &str, out: &str) -> Result<()> {
    let image = descriptor::evaluate(name, config)?;
    let dir = kube_node_images::stage::stage(&image, &config.output_dir)?;
    let packed = kube_node_images::context::pack(&dir, Path::new(out))?;
    println!("{}  {}", packed.sha256, packed.path.display());
    Ok(())
}

pub(crate) fn build(config: &Config, name: &str) -> Result<()> {
    let image = descriptor::evaluate(name, config)?;
    docker::build(&image, &config.output_dir)
        .with_context(|| format!("building descriptor '{}'", name))?;
    println!("{}", image.tag);
    Ok(())
}
