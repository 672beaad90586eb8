//! Command-line arguments for PSSM construction

use clap::Args;
use std::path::PathBuf;

use crate::config::ScoringMatrixName;

/// Build a PSSM from a gapped FASTA alignment whose first record is the query
#[derive(Args, Debug)]
pub struct PssmArgs {
    /// Gapped FASTA alignment; the first record is the query
    #[arg(long)]
    pub msa: PathBuf,
    /// Pseudocount constant (0 selects the default)
    #[arg(long, default_value_t = 0)]
    pub pseudocount: i32,
    #[arg(long, default_value_t = ScoringMatrixName::Blosum62)]
    pub matrix: ScoringMatrixName,
    /// Directory or file holding the substitution matrix
    #[arg(long)]
    pub matrix_path: Option<PathBuf>,
    /// Identity above which a row is purged as a copy of the query
    #[arg(long, default_value_t = 0.94)]
    pub near_identical: f64,
    #[arg(long, default_value_t = 1.0)]
    pub scaling_factor: f64,
    /// Include frequency ratios in the output
    #[arg(long)]
    pub freq_ratios: bool,
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}
