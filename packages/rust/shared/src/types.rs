//! Core domain types for SocialSync.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SocialSyncError};

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

/// A social-media platform the sync pipeline knows how to ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Facebook,
    Instagram,
}

impl Platform {
    /// All supported platforms.
    pub const ALL: [Platform; 2] = [Platform::Facebook, Platform::Instagram];

    /// Lowercase name, as stored in the `platform` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Facebook => "facebook",
            Self::Instagram => "instagram",
        }
    }

    /// Public URL of a post on this platform.
    pub fn post_url(&self, post_id: &str) -> String {
        match self {
            Self::Facebook => format!("https://www.facebook.com/me/posts/{post_id}"),
            Self::Instagram => format!("https://www.instagram.com/p/{post_id}"),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = SocialSyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "facebook" | "fb" => Ok(Self::Facebook),
            "instagram" | "ig" => Ok(Self::Instagram),
            other => Err(SocialSyncError::validation(format!(
                "unknown platform '{other}': expected 'facebook' or 'instagram'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Normalized rows
// ---------------------------------------------------------------------------

/// Identity stamped on every ingested post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub user_id: i64,
    pub agent_id: i64,
}

/// A normalized post row. Natural key: `(platform, post_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub user_id: i64,
    pub agent_id: i64,
    pub post_url: String,
    pub platform: Platform,
    pub post_id: String,
    /// Post text; empty when the platform omits it.
    pub caption: String,
    /// Creation time exactly as the platform reports it; empty when absent.
    pub timestamp: String,
    pub total_likes: i64,
    pub total_comments: i64,
    pub total_shares: i64,
}

/// A normalized comment row. Natural key: `(platform, post_id, comment_id)`.
///
/// `post_id` refers to a [`Post`] but the reference is not enforced: a
/// comment row may exist without its post row and vice versa.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub platform: Platform,
    pub post_id: String,
    pub comment_id: String,
    pub comment_message: String,
    pub comment_time: String,
    pub commenter: String,
}

// ---------------------------------------------------------------------------
// Fetch boundary
// ---------------------------------------------------------------------------

/// Raw, platform-shaped payload returned by a fetch adapter.
///
/// The payload is expected to look like `{ "data": [ post, ... ] }`; anything
/// else is reported by the normalizer as a data-shape error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBatch {
    pub platform: Platform,
    pub payload: serde_json::Value,
}

impl RawBatch {
    /// Number of raw post records, or 0 if the payload is malformed.
    pub fn post_count(&self) -> usize {
        self.payload
            .get("data")
            .and_then(|d| d.as_array())
            .map_or(0, Vec::len)
    }
}

/// Credentials handed to a fetch adapter.
#[derive(Clone, Default)]
pub struct Credentials {
    /// Platform access token, if one was configured.
    pub access_token: Option<String>,
    /// Where the token is expected to come from (for error messages).
    pub source: String,
}

impl Credentials {
    /// Read the access token from the named environment variable.
    pub fn from_env(var_name: &str) -> Self {
        let access_token = std::env::var(var_name).ok().filter(|v| !v.is_empty());
        Self {
            access_token,
            source: var_name.to_string(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("source", &self.source)
            .finish()
    }
}

/// How much to pull from a platform in one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchLimits {
    pub post_limit: u32,
    pub comment_limit: u32,
}

// ---------------------------------------------------------------------------
// Merge mode
// ---------------------------------------------------------------------------

/// How a staged merge commits its delete and insert phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeMode {
    /// Delete and insert commit together; a failed insert rolls back the delete.
    #[default]
    Atomic,
    /// Delete commits before the insert starts. A failed insert leaves the
    /// matching destination rows absent until the next successful merge.
    SplitPhase,
}

impl std::str::FromStr for MergeMode {
    type Err = SocialSyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "atomic" => Ok(Self::Atomic),
            "split-phase" => Ok(Self::SplitPhase),
            other => Err(SocialSyncError::validation(format!(
                "unknown merge mode '{other}': expected 'atomic' or 'split-phase'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Run status
// ---------------------------------------------------------------------------

/// Status recorded by each pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Initialized,
    Fetched,
    Processed,
    Merged,
    Error,
    Success,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::Fetched => "fetched",
            Self::Processed => "processed",
            Self::Merged => "merged",
            Self::Error => "error",
            Self::Success => "success",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
