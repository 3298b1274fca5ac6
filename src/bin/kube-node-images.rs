use anyhow::{bail, Result};

mod workflows;

use kube_node_images::Config;

fn usage() -> &'static str {
    "Usage:\n  kube-node-images [--config <file>] list\n  kube-node-images [--config <file>] urls <alpine|hyperkube>\n  kube-node-images [--config <file>] render <descriptor> [dockerfile|plan]\n  kube-node-images [--config <file>] stage <descriptor|all> [out_dir]\n  kube-node-images [--config <file>] context <descriptor> <out.tar>\n  kube-node-images [--config <file>] build <descriptor>"
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (config_path, rest) = workflows::split_config_flag(&args)?;
    let config = Config::discover(config_path.as_deref())?;
    let rest: Vec<&str> = rest.iter().map(String::as_str).collect();

    match rest.as_slice() {
        ["list"] => workflows::list(&config),
        ["urls", profile] => workflows::urls(&config, profile),
        ["render", name] => workflows::render(&config, name, None),
        ["render", name, format] => workflows::render(&config, name, Some(*format)),
        ["stage", target] => workflows::stage(&config, target, None),
        ["stage", target, out_dir] => workflows::stage(&config, target, Some(*out_dir)),
        ["context", name, out] => workflows::context(&config, name, out),
        ["build", name] => workflows::build(&config, name),
        ["help"] | ["--help"] | ["-h"] => {
            println!("{}", usage());
            Ok(())
        }
        _ => bail!(usage()),
    }
}
