use clap::Parser;
use web_experiment::cli::{self, Cli, Command};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Assign(args) => cli::assign::run(args),
        Command::Show(args) => cli::show::run(args),
        Command::Clear(args) => cli::clear::run(args),
    }
}
