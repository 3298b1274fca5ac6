use anyhow::{bail, Result};
use std::path::PathBuf;

/// Pull `--config <file>` (or `--config=<file>`) out of `args`.
pub(crate) fn split_config_flag(args: &[String]) -> Result<(Option<PathBuf>, Vec<String>)> {
    let mut config = None;
    let mut rest = Vec::with_capacity(args.len());
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        if arg == "--config" {
            let Some(path) = iter.next() else {
                bail!("--config requires a file argument");
            };
            config = Some(PathBuf::from(path));
        } else if let Some(path) = arg.strip_prefix("--config=") {
            if path.is_empty() {
                bail!("--config requires a file argument");
            }
            config = Some(PathBuf::from(path));
        } else {
            rest.push(arg.clone());
        }
    }

    Ok((config, rest))
}
