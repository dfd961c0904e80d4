//! # rcon-cli-core
//!
//! Core types shared by every rcon-cli crate.
//!
//! This crate provides:
//! - `Session` and the `Protocol` tags it can select
//! - The configuration file model (`Config`) and its loader
//! - Session resolution from explicit flags plus a config environment
//! - The request/response log sink
//! - The error taxonomy used across the workspace

pub mod config;
pub mod error;
pub mod logger;
pub mod resolver;
pub mod session;

pub use config::{Config, DEFAULT_CONFIG_ENV, DEFAULT_CONFIG_NAME, Environment};
pub use error::{ConfigError, LogError, RconError, Result};
pub use resolver::resolve;
pub use session::{DEFAULT_TIMEOUT, Protocol, Session};
