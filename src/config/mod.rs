//! Run Configuration Module
//!
//! Provides the run configuration loaded from TOML files, replacing the
//! compile-time constants table with operator-tunable values.
//!
//! ## Loading Order
//!
//! 1. `--config` on the command line
//! 2. `MPT_CONFIG` environment variable (path to TOML file)
//! 3. `mpt_config.toml` in the current working directory
//! 4. Built-in defaults (`defaults.rs`)
//!
//! The config is passed by reference into the model and the checks; there is
//! no process-wide instance.

mod mpt_config;
mod rules;
pub mod defaults;
pub mod validation;

pub use mpt_config::*;
pub use rules::{anchored, CompiledMapping, CompiledRules, HOOFD_PATTERNS, SUB_BASE_PATTERNS};
