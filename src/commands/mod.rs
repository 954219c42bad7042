//! Subcommand implementations
//!
//! - `single` - One descriptor from command-line flags
//! - `manifest` - `apply`, `diff` and `status` over a manifest file

pub mod manifest;
pub mod single;
