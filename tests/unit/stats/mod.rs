//! Unit tests for Karlin-Altschul statistics

pub mod karlin;
