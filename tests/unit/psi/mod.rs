//! Unit tests for PSSM construction

pub mod engine;
pub mod input;
pub mod scaling;
pub mod score_block;
