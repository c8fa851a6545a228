//! Staged sync pipeline: initialize → fetch → transform → merge → finalize.
//!
//! Stages never return `Err`. Each produces a [`ContextUpdate`] that the
//! orchestrator folds into the [`SyncContext`]; the first error is sticky and
//! later stages keep running on whatever data exists.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, instrument, warn};

use socialsync_fetch::FetchAdapter;
use socialsync_shared::{
    Comment, Credentials, FetchLimits, MergeMode, Owner, Post, RawBatch, SyncStatus, default_limit,
};
use socialsync_storage::Storage;

use crate::normalize::normalize;

// ---------------------------------------------------------------------------
// Input / output
// ---------------------------------------------------------------------------

/// Caller-supplied parameters for one sync run. Omitted limits default to 5.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SyncInput {
    pub post_limit: Option<u32>,
    pub comment_limit: Option<u32>,
}

impl SyncInput {
    pub fn limits(&self) -> FetchLimits {
        FetchLimits {
            post_limit: self.post_limit.unwrap_or_else(default_limit),
            comment_limit: self.comment_limit.unwrap_or_else(default_limit),
        }
    }
}

/// Terminal record of a sync run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutput {
    pub posts_scraped: usize,
    pub comments_scraped: usize,
    pub posts_data: Vec<Post>,
    pub comments_data: Vec<Comment>,
    pub status: SyncStatus,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Stages and context
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Initialize,
    Fetch,
    Transform,
    Merge,
    Finalize,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Initialize,
        Stage::Fetch,
        Stage::Transform,
        Stage::Merge,
        Stage::Finalize,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Fetch => "fetch",
            Self::Transform => "transform",
            Self::Merge => "merge",
            Self::Finalize => "finalize",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable accumulator threaded through the stages. Only the orchestrator mutates it.
#[derive(Debug)]
pub struct SyncContext {
    pub limits: FetchLimits,
    pub credentials: Credentials,
    pub raw: Option<RawBatch>,
    pub posts: Vec<Post>,
    pub comments: Vec<Comment>,
    pub status: SyncStatus,
    pub message: String,
}

impl SyncContext {
    fn new(limits: FetchLimits, credentials: Credentials) -> Self {
        Self {
            limits,
            credentials,
            raw: None,
            posts: Vec::new(),
            comments: Vec::new(),
            status: SyncStatus::Initialized,
            message: String::new(),
        }
    }

    /// Fold a stage's partial update in. Fields the update leaves `None` are
    /// untouched; once the context is in error, status and message are frozen.
    pub fn apply(&mut self, update: ContextUpdate) {
        if let Some(raw) = update.raw {
            self.raw = Some(raw);
        }
        if let Some(posts) = update.posts {
            self.posts = posts;
        }
        if let Some(comments) = update.comments {
            self.comments = comments;
        }

        if self.status.is_error() {
            if let (Some(SyncStatus::Error), Some(message)) = (update.status, &update.message) {
                warn!(%message, kept = %self.message, "later failure after sticky error");
            }
            return;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(message) = update.message {
            self.message = message;
        }
    }
}

/// Partial update returned by a stage.
#[derive(Debug, Default)]
pub struct ContextUpdate {
    pub raw: Option<RawBatch>,
    pub posts: Option<Vec<Post>>,
    pub comments: Option<Vec<Comment>>,
    pub status: Option<SyncStatus>,
    pub message: Option<String>,
}

impl ContextUpdate {
    pub fn status(status: SyncStatus, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::status(SyncStatus::Error, message)
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback, notified after each stage completes.
pub trait ProgressReporter: Send + Sync {
    fn stage(&self, stage: Stage, status: SyncStatus, message: &str);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage(&self, _stage: Stage, _status: SyncStatus, _message: &str) {}
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// One platform's sync pipeline.
pub struct SyncPipeline {
    adapter: Box<dyn FetchAdapter>,
    credentials: Credentials,
    db_path: PathBuf,
    owner: Owner,
    merge_mode: MergeMode,
}

impl SyncPipeline {
    pub fn new(adapter: Box<dyn FetchAdapter>, credentials: Credentials, db_path: PathBuf) -> Self {
        Self {
            adapter,
            credentials,
            db_path,
            owner: Owner {
                user_id: 1,
                agent_id: 3,
            },
            merge_mode: MergeMode::default(),
        }
    }

    pub fn with_owner(mut self, owner: Owner) -> Self {
        self.owner = owner;
        self
    }

    pub fn with_merge_mode(mut self, mode: MergeMode) -> Self {
        self.merge_mode = mode;
        self
    }

    /// Run every stage in order and return the terminal output.
    ///
    /// The store is opened in `initialize` and dropped when this returns.
    #[instrument(skip_all, fields(platform = %self.adapter.platform()))]
    pub async fn run(&self, input: SyncInput, progress: &dyn ProgressReporter) -> SyncOutput {
        let mut ctx = SyncContext::new(input.limits(), self.credentials.clone());
        info!(limits = ?ctx.limits, "starting sync");

        let (update, store) = self.initialize().await;
        self.advance(&mut ctx, Stage::Initialize, update, progress);

        let update = self.fetch(&ctx).await;
        self.advance(&mut ctx, Stage::Fetch, update, progress);

        let update = self.transform(&ctx);
        self.advance(&mut ctx, Stage::Transform, update, progress);

        let update = self.merge(&ctx, store.as_ref()).await;
        self.advance(&mut ctx, Stage::Merge, update, progress);

        let update = finalize(&ctx);
        self.advance(&mut ctx, Stage::Finalize, update, progress);

        info!(status = %ctx.status, message = %ctx.message, "sync finished");
        SyncOutput {
            posts_scraped: ctx.posts.len(),
            comments_scraped: ctx.comments.len(),
            posts_data: ctx.posts,
            comments_data: ctx.comments,
            status: ctx.status,
            message: ctx.message,
        }
    }

    fn advance(
        &self,
        ctx: &mut SyncContext,
        stage: Stage,
        update: ContextUpdate,
        progress: &dyn ProgressReporter,
    ) {
        ctx.apply(update);
        info!(%stage, status = %ctx.status, "stage complete");
        progress.stage(stage, ctx.status, &ctx.message);
    }

    async fn initialize(&self) -> (ContextUpdate, Option<Storage>) {
        let opened = match Storage::open(&self.db_path).await {
            Ok(store) => store.ping().await.map(|_| store),
            Err(e) => Err(e),
        };
        match opened {
            Ok(store) => (
                ContextUpdate::status(SyncStatus::Initialized, "Connected to database"),
                Some(store),
            ),
            Err(e) => {
                error!(path = %self.db_path.display(), error = %e, "database open failed");
                (
                    ContextUpdate::error(format!("Database connection failed: {e}")),
                    None,
                )
            }
        }
    }

    async fn fetch(&self, ctx: &SyncContext) -> ContextUpdate {
        match self.adapter.fetch(&ctx.credentials, ctx.limits).await {
            Ok(raw) => {
                let message = format!("Successfully fetched {} posts", raw.post_count());
                ContextUpdate {
                    raw: Some(raw),
                    ..ContextUpdate::status(SyncStatus::Fetched, message)
                }
            }
            Err(e) => {
                error!(error = %e, "fetch failed");
                ContextUpdate {
                    raw: Some(RawBatch {
                        platform: self.adapter.platform(),
                        payload: json!({}),
                    }),
                    ..ContextUpdate::error(format!("Failed to fetch posts: {e}"))
                }
            }
        }
    }

    fn transform(&self, ctx: &SyncContext) -> ContextUpdate {
        let Some(raw) = ctx.raw.as_ref() else {
            return ContextUpdate {
                posts: Some(Vec::new()),
                comments: Some(Vec::new()),
                ..ContextUpdate::error("No posts data to process")
            };
        };

        let batch = normalize(raw, ctx.limits.comment_limit, self.owner);
        let update = match batch.error {
            Some(e) => ContextUpdate::error(format!("Failed to process posts: {e}")),
            None => ContextUpdate::status(
                SyncStatus::Processed,
                format!(
                    "Processed {} posts and {} comments",
                    batch.posts.len(),
                    batch.comments.len()
                ),
            ),
        };
        ContextUpdate {
            posts: Some(batch.posts),
            comments: Some(batch.comments),
            ..update
        }
    }

    async fn merge(&self, ctx: &SyncContext, store: Option<&Storage>) -> ContextUpdate {
        let Some(store) = store else {
            return ContextUpdate::error("Database connection not available");
        };

        let posts = store.merge_posts(&ctx.posts, self.merge_mode).await;
        if !posts.is_success() {
            return ContextUpdate::error(format!("Failed to merge posts: {}", posts.message));
        }
        let comments = store.merge_comments(&ctx.comments, self.merge_mode).await;
        if !comments.is_success() {
            return ContextUpdate::error(format!(
                "Failed to merge comments: {}",
                comments.message
            ));
        }

        ContextUpdate::status(
            SyncStatus::Merged,
            format!(
                "Merged {} posts and {} comments",
                posts.rows_written, comments.rows_written
            ),
        )
    }
}

fn finalize(ctx: &SyncContext) -> ContextUpdate {
    match ctx.status {
        SyncStatus::Merged => ContextUpdate::status(
            SyncStatus::Success,
            format!(
                "Successfully synced {} posts and {} comments",
                ctx.posts.len(),
                ctx.comments.len()
            ),
        ),
        _ => ContextUpdate::default(),
    }
}
