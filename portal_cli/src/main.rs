mod ui;

use crate::ui::cli;
use clap::Parser;

fn main() {
    let args = cli::Args::parse();
    if let Err(e) = cli::run_cli(args) {
        eprintln!("CLI error: {e:?}");
        std::process::exit(1);
    }
}
