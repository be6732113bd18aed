//! # cfgsync-core
//!
//! Shared vocabulary for the cfgsync workspace: the unified error type and the
//! small enums (remote providers, content formats, source kinds) that every
//! other crate speaks.

pub mod error;
pub mod types;

pub use error::{CfgError, Result};
pub use types::*;
