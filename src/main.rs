use anyhow::Result;
use clap::{Parser, Subcommand};
use psiblast_core::algorithm::{pssm, seqsrc};

#[derive(Parser)]
#[command(name = "psiblast-core")]
#[command(version = "0.1.0")]
#[command(about = "Position-specific scoring matrices and sequence sources in the style of PSI-BLAST", long_about = None)]
struct Cli {
    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {

    /// Build a PSSM from a gapped multiple alignment
    Pssm(pssm::PssmArgs),

    /// Statistics and composition of a FASTA sequence collection
    Seqsrc(seqsrc::SeqSrcArgs),

}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Pssm(args) => {
            pssm::run(args)?;
        }
        Commands::Seqsrc(args) => {
            seqsrc::run(args)?;
        }
    }
    Ok(())
}
