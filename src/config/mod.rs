//! Configuration module for Ukiyo-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files. All components receive their configuration section at construction;
//! nothing reads module-level state.
//!
//! # Example
//!
//! ```no_run
//! use ukiyo_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Start page: {}", config.catalog.start_page);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BlockPolicy, CatalogConfig, Config, FetcherConfig, HealthConfig, OutputConfig, PacingConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
