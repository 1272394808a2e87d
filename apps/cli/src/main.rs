//! treesum CLI — answer a question over more text than fits in one prompt.
//!
//! Passages are answered in batches and the partial answers are merged
//! round by round until a single answer remains.

mod commands;
mod passages;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
