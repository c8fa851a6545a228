//! Platform fetch adapters.
//!
//! This crate provides:
//! - [`FetchAdapter`], the object-safe trait the sync pipeline fetches through
//! - [`FacebookAdapter`] and [`InstagramAdapter`] for the Graph APIs
//! - [`adapter_for`] to build the right adapter from config
//!
//! Adapters return the platform's payload untouched apart from attaching
//! nested comment lists; field mapping happens in the normalizer.

pub mod adapters;
mod http;

pub use adapters::{FacebookAdapter, FetchAdapter, InstagramAdapter, adapter_for};
