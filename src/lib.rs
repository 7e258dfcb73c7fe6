//! gemini-cli library crate.
//!
//! Exposes the dispatcher and its building blocks for the binary and for
//! integration testing.

pub mod cli;
pub mod config;
pub mod gemini;
