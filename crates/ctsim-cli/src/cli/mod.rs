mod commands;

use anyhow::Result;
use clap::Parser;

pub fn run_from_env() -> Result<()> {
    run(Cli::parse())
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        CliCommand::Reconstruct(args) => commands::reconstruct(args),
        CliCommand::Phantom(args) => commands::phantom(args),
        CliCommand::Kernel(args) => commands::kernel(args),
    }
}

#[derive(Parser)]
#[command(name = "ctsim", about = "Simulated CT acquisition and reconstruction")]
pub struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Scan a generated phantom and reconstruct it
    Reconstruct(commands::ReconstructArgs),
    /// Generate a labeled phantom image
    Phantom(commands::PhantomArgs),
    /// Dump a Ram-Lak filter kernel
    Kernel(commands::KernelArgs),
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::Parser;

    #[test]
    fn reconstruct_subcommand_parses_with_defaults() {
        let cli = Cli::try_parse_from([
            "ctsim",
            "reconstruct",
            "--output",
            "out.json",
        ]);
        assert!(cli.is_ok());
    }

    #[test]
    fn unknown_subcommands_are_rejected() {
        assert!(Cli::try_parse_from(["ctsim", "transmogrify"]).is_err());
    }
}
