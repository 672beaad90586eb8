pub mod freq_ratios;
pub mod matrix;
