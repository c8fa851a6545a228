//! Core pipeline orchestration and domain logic for SocialSync.
//!
//! This crate ties together platform fetching, normalization, and the staged
//! merge writer into the sync pipeline, and builds LLM reports on top of the
//! stored data.

pub mod normalize;
pub mod pipeline;
pub mod report;

pub use normalize::{NormalizedBatch, normalize};
pub use pipeline::{
    ContextUpdate, ProgressReporter, SilentProgress, Stage, SyncContext, SyncInput, SyncOutput,
    SyncPipeline,
};
