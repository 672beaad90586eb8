pub mod algorithm;
pub mod config;
pub mod error;
pub mod stats;
pub mod utils;

// NCBI-style modules (matching NCBI BLAST structure)
pub mod core;
pub mod api;

pub use error::{BlastError, Result};
