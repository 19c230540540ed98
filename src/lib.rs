//! Set-associative CPU cache model: geometry derivation, address decoding,
//! round-robin and random replacement, and trace-driven hit/miss simulation.

pub mod cache;
pub mod config;
pub mod geometry;
pub mod replacement;
pub mod report;
pub mod simulator;
pub mod trace;
