//! Unit test infrastructure for psiblast-core
//!
//! Tests are organized by module:
//! - `seqsrc/` - Sequence sources, iterators and the parallel scan
//! - `psi/` - Score block setup, impala scaling and the PSSM engine
//! - `stats/` - Karlin-Altschul parameters and tables

pub mod helpers;
pub mod psi;
pub mod seqsrc;
pub mod stats;
