//! Command-line runners
//!
//! Each submodule pairs a clap `Args` struct with a `run` function.

pub mod pssm;
pub mod seqsrc;
