//! Intcode CLI library.
//!
//! Shared pieces of the `intcode` binary: terminal colors and `intcode.toml`
//! configuration.

pub mod colors;
pub mod config;
