pub mod karlin_calc;
pub mod tables;

pub use karlin_calc::*;
pub use tables::*;
