//! PSSM construction from a gapped multiple alignment

pub mod args;
pub mod run;

pub use args::PssmArgs;
pub use run::run;
