// crates/mpack-cli/src/main.rs

use clap::{Parser, Subcommand};

mod cmd;

#[derive(Parser)]
#[command(name = "mpack")]
#[command(about = "MessagePack rewrite and inspection tools", long_about = None)]
pub struct Cli {
    /// Verbosity (-v info, -vv debug, -vvv trace); diagnostics go to stderr.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decode MessagePack on stdin, re-encode minimally, write to stdout
    Rewrite(cmd::rewrite::RewriteArgs),

    /// Decode MessagePack on stdin and print one line per value
    Inspect(cmd::inspect::InspectArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    stderrlog::new()
        .module(module_path!())
        .verbosity(cli.verbose as usize + 1)
        .init()?;

    match cli.cmd {
        Commands::Rewrite(args) => cmd::rewrite::run(args),
        Commands::Inspect(args) => cmd::inspect::run(args),
    }
}
