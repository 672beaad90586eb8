//! PSI-BLAST API Layer
//!
//! Reference: ncbi-blast/c++/src/algo/blast/api/
//!
//! This module wraps the core PSSM computation and the sequence source
//! abstraction behind caller-facing types.
//!
//! # Structure
//!
//! - `blast_psi` - `PssmEngine` and the `PssmInputData` strategy trait
//! - `psi_pssm_input` - PSSM input from pairwise search results
//! - `msa_pssm_input` - PSSM input from a gapped multiple alignment
//! - `scoremat` - Packaged PSSM (`PssmWithParameters`) and its ASCII writer
//! - `seqsrc_multiseq` - In-memory sequence source
//! - `seqsrc_fasta` - FASTA file sequence source
//! - `seqsrc_scan` - Parallel scan over a sequence source

pub mod blast_psi;
pub mod psi_pssm_input;
pub mod msa_pssm_input;
pub mod scoremat;
pub mod seqsrc_multiseq;
pub mod seqsrc_fasta;
pub mod seqsrc_scan;

pub use blast_psi::{EngineState, PssmEngine, PssmInputData};
pub use scoremat::PssmWithParameters;
