//! Fetch adapter trait and the built-in platform adapters.

mod facebook;
mod instagram;

use async_trait::async_trait;
use socialsync_shared::{Credentials, FetchLimits, Platform, PlatformsConfig, RawBatch, Result};

pub use facebook::FacebookAdapter;
pub use instagram::InstagramAdapter;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Pulls one raw batch of posts (with nested comments) from a platform.
///
/// Implementations must not normalize; the payload shape is whatever the
/// platform returns under `{ "data": [...] }`.
#[async_trait]
pub trait FetchAdapter: Send + Sync {
    /// Platform this adapter talks to.
    fn platform(&self) -> Platform;

    /// Fetch up to `limits.post_limit` posts, each with up to
    /// `limits.comment_limit` comments where the platform allows it.
    async fn fetch(&self, credentials: &Credentials, limits: FetchLimits) -> Result<RawBatch>;
}

/// Build the adapter for `platform` from the configured API bases.
pub fn adapter_for(platform: Platform, config: &PlatformsConfig) -> Result<Box<dyn FetchAdapter>> {
    let api_base = config.get(platform).api_base.clone();
    Ok(match platform {
        Platform::Facebook => Box::new(FacebookAdapter::new(api_base)?),
        Platform::Instagram => Box::new(InstagramAdapter::new(api_base)?),
    })
}
