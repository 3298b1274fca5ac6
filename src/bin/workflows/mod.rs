mod commands;
mod parse;

pub(crate) use commands::{build, context, list, render, stage, urls};
pub(crate) use parse::split_config_flag;
