//! Outer adapters: the CSV command format and the runner that drives the core from it.

pub mod cli;
pub mod csv;
