//! Sequence collection statistics

pub mod args;
pub mod run;

pub use args::SeqSrcArgs;
pub use run::run;
