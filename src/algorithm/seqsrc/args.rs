//! Command-line arguments for the collection scan

use clap::Args;
use std::path::PathBuf;

/// Print statistics and residue composition of a FASTA collection
#[derive(Args, Debug)]
pub struct SeqSrcArgs {
    #[arg(short, long)]
    pub input: PathBuf,
    /// Oids fetched per iterator refill (0 selects the default)
    #[arg(long, default_value_t = 0)]
    pub chunk_size: usize,
    #[arg(short = 'n', long, default_value_t = 0)]
    pub num_threads: usize,
    /// Treat the input as nucleotide instead of guessing
    #[arg(long)]
    pub nucleotide: bool,
    #[arg(short, long)]
    pub out: Option<PathBuf>,
    #[arg(long)]
    pub quiet: bool,
}
