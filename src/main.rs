mod cli;

use std::error::Error;

use clap::Parser;
use cli::{Args, Command};
use framesketch::config::Config;

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config_path = args.config.as_deref();

    match args.command {
        Command::Config { action } => cli::handle_config_action(action, config_path),
        Command::Snapshot { resolution } => {
            let config = Config::load(config_path)?;
            cli::run_snapshot(&config, args.scene, args.redraw, resolution)
        }
        Command::Stream { cycles, delay_ms } => {
            let config = Config::load(config_path)?;
            cli::run_stream(&config, args.scene, args.redraw, cycles, delay_ms)
        }
    }
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
