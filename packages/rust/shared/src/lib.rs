//! Shared types, error model, and configuration for SocialSync.
//!
//! This crate is the foundation depended on by all other SocialSync crates.
//! It provides:
//! - [`SocialSyncError`], the unified error type
//! - Domain types ([`Post`], [`Comment`], [`RawBatch`], [`SyncStatus`], ...)
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DatabaseConfig, DefaultsConfig, OpenRouterConfig, OwnerConfig, PlatformConfig,
    PlatformsConfig, config_dir, config_file_path, default_limit, expand_home, init_config,
    load_config, load_config_from, openrouter_api_key,
};
pub use error::{Result, SocialSyncError};
pub use types::{
    Comment, Credentials, FetchLimits, MergeMode, Owner, Platform, Post, RawBatch, SyncStatus,
};
