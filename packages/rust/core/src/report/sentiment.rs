//! Per-post sentiment reports over stored comments.
//!
//! Stages mirror the sync pipeline: initialize → fetch comments → analyze →
//! finalize. Failures are recorded, not propagated; the first one wins.

use std::path::PathBuf;

use serde::Serialize;
use serde_json::json;
use socialsync_shared::{Comment, Platform, SyncStatus};
use socialsync_storage::{SentimentLog, Storage};
use tracing::{error, info, instrument, warn};

use super::{ReportGenerator, ReportRequest, prompt_hash};

const CACHE_KIND: &str = "sentiment";

const SYSTEM_PROMPT: &str = "You are a professional social media sentiment analysis agent.";

/// Terminal record of a sentiment run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentimentOutput {
    pub num_reports: usize,
    pub status: SyncStatus,
    pub message: String,
}

/// Status/message pair with a sticky first error.
struct RunState {
    status: SyncStatus,
    message: String,
}

impl RunState {
    fn set(&mut self, status: SyncStatus, message: impl Into<String>) {
        let message = message.into();
        if self.status.is_error() {
            if status.is_error() {
                warn!(%message, kept = %self.message, "later failure after sticky error");
            }
            return;
        }
        self.status = status;
        self.message = message;
    }
}

/// Sentiment analysis for one platform's stored comments.
pub struct SentimentPipeline {
    generator: Box<dyn ReportGenerator>,
    platform: Platform,
    db_path: PathBuf,
    model: String,
    max_tokens: u32,
    user_id: i64,
}

impl SentimentPipeline {
    pub fn new(
        generator: Box<dyn ReportGenerator>,
        platform: Platform,
        db_path: PathBuf,
        model: impl Into<String>,
    ) -> Self {
        Self {
            generator,
            platform,
            db_path,
            model: model.into(),
            max_tokens: 6000,
            user_id: 1,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = user_id;
        self
    }

    #[instrument(skip_all, fields(platform = %self.platform))]
    pub async fn run(&self) -> SentimentOutput {
        let mut state = RunState {
            status: SyncStatus::Initialized,
            message: String::new(),
        };

        // --- initialize ---
        let store = match Storage::open(&self.db_path).await {
            Ok(store) => {
                state.set(SyncStatus::Initialized, "Connected to database");
                Some(store)
            }
            Err(e) => {
                error!(error = %e, "database open failed");
                state.set(SyncStatus::Error, format!("Database connection failed: {e}"));
                None
            }
        };

        // --- fetch comments ---
        let comments = match store.as_ref() {
            Some(store) => match store.list_comments(Some(self.platform)).await {
                Ok(comments) => {
                    state.set(
                        SyncStatus::Fetched,
                        format!(
                            "Fetched {} comments from DB (platform={})",
                            comments.len(),
                            self.platform
                        ),
                    );
                    comments
                }
                Err(e) => {
                    state.set(SyncStatus::Error, format!("Failed to fetch comments: {e}"));
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        // --- analyze ---
        let mut num_reports = 0;
        if let Some(store) = store.as_ref() {
            if comments.is_empty() {
                state.set(SyncStatus::Success, "No comments to analyze");
            } else {
                let groups = group_by_post(&comments);
                let mut failures = 0;
                for (post_id, group) in &groups {
                    match self.analyze_post(store, post_id, group).await {
                        Ok(()) => num_reports += 1,
                        Err(e) => {
                            failures += 1;
                            error!(%post_id, error = %e, "sentiment report failed");
                            state.set(
                                SyncStatus::Error,
                                format!("Failed to analyze/insert post {post_id}: {e}"),
                            );
                        }
                    }
                }
                if failures == 0 {
                    state.set(
                        SyncStatus::Success,
                        format!("Inserted {num_reports} sentiment reports into DB"),
                    );
                }
            }
        }

        // --- finalize ---
        info!(num_reports, status = %state.status, "sentiment run finished");
        SentimentOutput {
            num_reports,
            status: state.status,
            message: state.message,
        }
    }

    async fn analyze_post(
        &self,
        store: &Storage,
        post_id: &str,
        comments: &[&Comment],
    ) -> socialsync_shared::Result<()> {
        let data: Vec<_> = comments
            .iter()
            .map(|c| json!({ "username": c.commenter, "text": c.comment_message }))
            .collect();
        let request = ReportRequest {
            model: self.model.clone(),
            system: SYSTEM_PROMPT.to_string(),
            prompt: sentiment_prompt(&format!("Comments on Post ID {post_id}"), &data),
            max_tokens: self.max_tokens,
        };

        let hash = prompt_hash(&request);
        let output = match store
            .get_report_cache(CACHE_KIND, &hash, &self.model)
            .await?
        {
            Some(cached) => {
                info!(%post_id, "sentiment cache hit");
                cached
            }
            None => {
                let output = self.generator.generate(&request).await?;
                if let Err(e) = store
                    .set_report_cache(CACHE_KIND, &hash, &self.model, &output)
                    .await
                {
                    warn!(%post_id, error = %e, "failed to cache sentiment report");
                }
                output
            }
        };

        store
            .insert_sentiment_log(&SentimentLog {
                user_id: self.user_id,
                post_id: post_id.to_string(),
                post_url: self.platform.post_url(post_id),
                num_posts: 1,
                num_comments: comments.len() as i64,
                output,
                notes: None,
                platform: self.platform,
            })
            .await?;
        Ok(())
    }
}

/// Group comments by post id, keeping first-seen post order and comment order.
fn group_by_post(comments: &[Comment]) -> Vec<(String, Vec<&Comment>)> {
    let mut groups: Vec<(String, Vec<&Comment>)> = Vec::new();
    for comment in comments {
        match groups.iter_mut().find(|(id, _)| *id == comment.post_id) {
            Some((_, group)) => group.push(comment),
            None => groups.push((comment.post_id.clone(), vec![comment])),
        }
    }
    groups
}

fn sentiment_prompt(label: &str, data: &[serde_json::Value]) -> String {
    let data = serde_json::to_string_pretty(data).unwrap_or_else(|_| "[]".to_string());
    format!(
        "Sentiment Analysis Agent\n\
         You monitor audience sentiment around a brand and products on social media. \
         Given the following batch of user texts (comments and messages), write a concise, \
         executive-style sentiment analysis report in markdown.\n\n\
         Highlight:\n\
         - The overall sentiment (Positive/Negative/Neutral, with a score from 0 to 100)\n\
         - Key positive trends and opportunities\n\
         - Key negative trends and potential issues\n\
         - Mention any outliers or notable themes\n\
         - Suggest any recommended actions if relevant\n\n\
         Context: This data is from {label}.\n\n\
         Data:\n{data}\n\n\
         Return only a markdown report suitable for management (do not return a JSON or table)."
    )
}

#[cfg(test)]
mod tests {
    use socialsync_shared::MergeMode;
    use uuid::Uuid;

    use super::*;
    use crate::report::testing::ScriptedGenerator;

    fn temp_db() -> PathBuf {
        std::env::temp_dir().join(format!("ss_sentiment_{}.db", Uuid::now_v7()))
    }

    fn comment(post_id: &str, id: &str, who: &str, text: &str) -> Comment {
        Comment {
            platform: Platform::Instagram,
            post_id: post_id.into(),
            comment_id: id.into(),
            comment_message: text.into(),
            comment_time: String::new(),
            commenter: who.into(),
        }
    }

    async fn seed(db: &PathBuf, comments: &[Comment]) {
        let store = Storage::open(db).await.unwrap();
        let outcome = store.merge_comments(comments, MergeMode::Atomic).await;
        assert!(outcome.is_success());
    }

    #[test]
    fn grouping_keeps_first_seen_order() {
        let comments = vec![
            comment("p2", "a", "x", ""),
            comment("p1", "b", "x", ""),
            comment("p2", "c", "x", ""),
        ];
        let groups = group_by_post(&comments);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "p2");
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0, "p1");
    }

    #[tokio::test]
    async fn one_report_per_post() {
        let db = temp_db();
        seed(
            &db,
            &[
                comment("p1", "c1", "ann", "love it"),
                comment("p1", "c2", "bob", "great"),
                comment("p2", "c3", "cat", "meh"),
            ],
        )
        .await;

        let generator = ScriptedGenerator::ok("# Mostly positive");
        let pipeline = SentimentPipeline::new(
            Box::new(generator),
            Platform::Instagram,
            db.clone(),
            "openai/gpt-4.1-mini",
        );
        let out = pipeline.run().await;

        assert_eq!(out.status, SyncStatus::Success, "{}", out.message);
        assert_eq!(out.num_reports, 2);
        assert_eq!(out.message, "Inserted 2 sentiment reports into DB");

        let store = Storage::open(&db).await.unwrap();
        let logs = store.list_sentiment_logs(Some(Platform::Instagram)).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].entry.post_id, "p1");
        assert_eq!(logs[0].entry.num_comments, 2);
        assert_eq!(logs[0].entry.post_url, "https://www.instagram.com/p/p1");
        assert_eq!(logs[0].entry.output, "# Mostly positive");
    }

    #[tokio::test]
    async fn prompt_carries_commenter_and_text() {
        let db = temp_db();
        seed(&db, &[comment("p1", "c1", "ann", "love it")]).await;

        let generator = std::sync::Arc::new(ScriptedGenerator::ok("ok"));
        let pipeline = SentimentPipeline::new(
            Box::new(SharedGenerator(generator.clone())),
            Platform::Instagram,
            db,
            "m",
        )
        .with_max_tokens(123);
        pipeline.run().await;

        let calls = generator.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].max_tokens, 123);
        assert!(calls[0].prompt.contains("\"username\": \"ann\""));
        assert!(calls[0].prompt.contains("\"text\": \"love it\""));
        assert!(calls[0].prompt.contains("Comments on Post ID p1"));
    }

    #[tokio::test]
    async fn unchanged_comments_hit_cache() {
        let db = temp_db();
        seed(&db, &[comment("p1", "c1", "ann", "love it")]).await;

        let generator = std::sync::Arc::new(ScriptedGenerator::ok("cached report"));
        for _ in 0..2 {
            let pipeline = SentimentPipeline::new(
                Box::new(SharedGenerator(generator.clone())),
                Platform::Instagram,
                db.clone(),
                "m",
            );
            let out = pipeline.run().await;
            assert_eq!(out.status, SyncStatus::Success);
        }
        assert_eq!(generator.call_count(), 1);

        let store = Storage::open(&db).await.unwrap();
        assert_eq!(store.list_sentiment_logs(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn no_comments_is_success() {
        let pipeline = SentimentPipeline::new(
            Box::new(ScriptedGenerator::ok("unused")),
            Platform::Facebook,
            temp_db(),
            "m",
        );
        let out = pipeline.run().await;
        assert_eq!(out.status, SyncStatus::Success);
        assert_eq!(out.num_reports, 0);
        assert_eq!(out.message, "No comments to analyze");
    }

    #[tokio::test]
    async fn generator_failure_is_reported() {
        let db = temp_db();
        seed(&db, &[comment("p1", "c1", "ann", "hmm")]).await;

        let pipeline = SentimentPipeline::new(
            Box::new(ScriptedGenerator::failing("upstream down")),
            Platform::Instagram,
            db,
            "m",
        );
        let out = pipeline.run().await;
        assert_eq!(out.status, SyncStatus::Error);
        assert_eq!(out.num_reports, 0);
        assert!(out.message.contains("upstream down"));
    }

    #[tokio::test]
    async fn unavailable_store_is_reported() {
        let dir = std::env::temp_dir().join(format!("ss_dir_{}", Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let pipeline = SentimentPipeline::new(
            Box::new(ScriptedGenerator::ok("unused")),
            Platform::Instagram,
            dir,
            "m",
        );
        let out = pipeline.run().await;
        assert_eq!(out.status, SyncStatus::Error);
        assert!(out.message.starts_with("Database connection failed"));
    }

    /// Lets a test keep a handle on the generator the pipeline owns.
    struct SharedGenerator(std::sync::Arc<ScriptedGenerator>);

    #[async_trait::async_trait]
    impl ReportGenerator for SharedGenerator {
        async fn generate(&self, request: &ReportRequest) -> socialsync_shared::Result<String> {
            self.0.generate(request).await
        }
    }
}
