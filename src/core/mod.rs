//! PSI-BLAST Core
//!
//! Reference: ncbi-blast/c++/src/algo/blast/core/
//!
//! # Structure
//!
//! - **Sequence sources** (`blast_seqsrc`, `blast_seqsrc_iterator`)
//!   - Backend trait and handle
//!   - Chunked oid iteration
//!
//! - **Scoring setup** (`blast_query_info`, `blast_stat`, `blast_setup`)
//!   - Query contexts and sentinel-guarded query buffers
//!   - Score block with Karlin-Altschul parameter blocks
//!
//! - **Position-specific scoring** (`blast_psi`, `blast_posit`)
//!   - PSSM computation from a multiple alignment
//!   - Impala scaling of frequency ratios to integer scores

// Sequence sources
pub mod blast_seqsrc;
pub mod blast_seqsrc_iterator;

// Scoring setup
pub mod blast_query_info;
pub mod blast_setup;
pub mod blast_stat;

// PSSM
pub mod blast_posit;
pub mod blast_psi;
