//! Shared types, error model, and configuration for SourceDock.
//!
//! This crate is the foundation depended on by all other SourceDock crates.
//! It provides:
//! - [`SourceDockError`] — the unified error type
//! - Domain types ([`Document`], [`FetchRequest`], [`Protocol`], [`SyntaxReport`])
//! - Configuration ([`AppConfig`], [`SourceConfig`], config loading)
//! - The configuration [`guard`] that must pass before anything runs

pub mod config;
pub mod error;
pub mod guard;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, AuthConfig, AuthType, BreakerConfig, DefaultsConfig, SourceConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{Result, SourceDockError};
pub use types::{Document, FetchRequest, Protocol, SourceKind, SyntaxReport};
