//! Entry point: parses the CLI, initialises tracing and dispatches to the
//! receive loop or the listing commands in `run.rs`.

mod cli;
mod config;
mod paths;
mod pattern;
mod run;

use anyhow::Result;
use cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    let config = cli.config.as_deref();
    match cli.command {
        Some(Command::Run(args)) => run::run(args, config),
        Some(Command::List) => run::list(config),
        Some(Command::Describe { name, json }) => run::describe(&name, json, config),
        None => run::run(cli.run, config),
    }
}
