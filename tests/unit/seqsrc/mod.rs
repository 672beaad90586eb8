//! Unit tests for sequence sources

pub mod iterator;
pub mod multiseq;
pub mod scan;
