//! lodestar CLI library
//!
//! Everything behind the `lodestar` binary: environment configuration,
//! logging setup, report rendering and the subcommands.

pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
