//! Renders the `clusterform` man pages into `OUT_DIR`.
//!
//! The clap definitions are compiled in from `src/cli/mod.rs`, the same
//! module the binary parses with, so `clusterform.1` cannot drift from the
//! flags the binary accepts. Each subcommand also gets its own page
//! (`clusterform-plan.1`, `clusterform-provision.1`, ...).

use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_mangen::Man;

#[path = "src/cli/mod.rs"]
mod cli;

use cli::Cli;

fn render(page: Man, target: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut buffer = Vec::new();
    page.render(&mut buffer)?;
    fs::write(target, buffer)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = std::io::stdout();
    writeln!(stdout, "cargo:rerun-if-changed=build.rs")?;
    writeln!(stdout, "cargo:rerun-if-changed=src/cli/mod.rs")?;

    let out_dir = env::var_os("OUT_DIR")
        .map(PathBuf::from)
        .ok_or("OUT_DIR was not set")?;

    let command = Cli::command();
    for sub in command.get_subcommands() {
        let page_name = format!("clusterform-{}", sub.get_name());
        let page = Man::new(sub.clone()).title(page_name.to_uppercase());
        render(page, &out_dir.join(format!("{page_name}.1")))?;
    }
    render(Man::new(command), &out_dir.join("clusterform.1"))
}
