mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "grader-cli")]
#[command(about = "Grader CLI - Inspect grading results", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a base64 result envelope and print it
    Decode {
        /// Encoded envelope (read from stdin when omitted)
        value: Option<String>,

        /// Print a one-line summary instead of the full JSON
        #[arg(short, long, default_value = "false")]
        summary: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Decode { value, summary } => {
            commands::decode(value.as_deref(), summary)?;
        }
    }

    Ok(())
}
