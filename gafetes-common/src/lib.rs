//! # gafetes common library
//!
//! Shared code for the badge tooling:
//! - Error type
//! - Configuration model and TOML loading
//! - Logging initialisation
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod logging;
pub mod time;

pub use config::{QrSettings, QrStrategy, TomlConfig};
pub use error::{Error, Result};
