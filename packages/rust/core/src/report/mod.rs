//! LLM-backed analytical reports over synced data.
//!
//! Reports never mutate posts or comments. They read from the store, call a
//! [`ReportGenerator`], and append their output to the report log tables.

pub mod client;
pub mod competitor;
pub mod insights;
pub mod sentiment;

use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use socialsync_shared::Result;

pub use client::OpenRouterClient;
pub use competitor::{CompetitorInput, CompetitorOutput, run_competitor_analysis};
pub use insights::extract_key_insights;
pub use sentiment::{SentimentOutput, SentimentPipeline};

/// One completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRequest {
    pub model: String,
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
}

/// Text generator behind every report.
#[async_trait]
pub trait ReportGenerator: Send + Sync {
    async fn generate(&self, request: &ReportRequest) -> Result<String>;
}

/// Compute a prompt hash for cache keying.
pub(crate) fn prompt_hash(request: &ReportRequest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(request.system.as_bytes());
    hasher.update([0u8]);
    hasher.update(request.prompt.as_bytes());
    format!("{:x}", hasher.finalize())
}


#[cfg(test)]
mod tests {
    use super::*;

    fn request(prompt: &str) -> ReportRequest {
        ReportRequest {
            model: "m".into(),
            system: "sys".into(),
            prompt: prompt.into(),
            max_tokens: 10,
        }
    }

    #[test]
    fn prompt_hash_is_stable_and_content_sensitive() {
        assert_eq!(prompt_hash(&request("a")), prompt_hash(&request("a")));
        assert_ne!(prompt_hash(&request("a")), prompt_hash(&request("b")));
        assert_eq!(prompt_hash(&request("a")).len(), 64);
    }
}
