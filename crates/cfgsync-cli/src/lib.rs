//! # cfgsync-cli
//!
//! Command-line interface for cfgsync.
//!
//! ## Commands
//!
//! - `cfgsync get <key>` — Print one configuration value
//! - `cfgsync show` — Print the merged configuration
//! - `cfgsync resolve` — Show where `--config` points without loading it
//! - `cfgsync watch` — Follow live reloads until Ctrl-C

pub mod commands;

pub use commands::Cli;
