//! libSQL storage layer for SocialSync (embedded, offline mode).
//!
//! The [`Storage`] struct wraps a libSQL database holding scraped posts and
//! comments, sentiment and competitor report logs, and the LLM report cache.
//!
//! Post and comment rows are only ever written through the staged merge
//! writer in [`merge`]; everything else is plain append or upsert.

pub mod merge;
mod migrations;

use std::path::Path;

use chrono::Utc;
use libsql::{Connection, Database, params};
use serde::Serialize;
use socialsync_shared::{Comment, Platform, Post, Result, SocialSyncError};
use tokio::sync::Mutex;
use uuid::Uuid;

pub use merge::{
    COMMENTS_TABLE, MergeOutcome, MergeRow, MergeStatus, POSTS_TABLE, TableSpec,
};

/// Primary storage handle wrapping a libSQL database.
///
/// Dropping the handle closes the connection.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    merge_lock: Mutex<()>,
}

/// Map any libSQL failure into the storage error variant.
pub(crate) fn db_err(e: impl std::fmt::Display) -> SocialSyncError {
    SocialSyncError::Storage(e.to_string())
}

impl Storage {
    /// Open or create a database at `path` and apply pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| SocialSyncError::io(parent, e))?;
            }
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| SocialSyncError::Connection(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| SocialSyncError::Connection(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            merge_lock: Mutex::new(()),
        };
        storage.run_migrations().await?;
        tracing::debug!(path = %path.display(), "storage opened");
        Ok(storage)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        SocialSyncError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Round-trip a trivial query. Returns the SQLite library version.
    pub async fn ping(&self) -> Result<String> {
        let mut rows = self
            .conn
            .query("SELECT sqlite_version()", params![])
            .await
            .map_err(|e| SocialSyncError::Connection(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => row.get::<String>(0).map_err(db_err),
            Ok(None) => Err(SocialSyncError::Connection("ping returned no rows".into())),
            Err(e) => Err(SocialSyncError::Connection(e.to_string())),
        }
    }

    // -----------------------------------------------------------------------
    // Post and comment reads
    // -----------------------------------------------------------------------

    /// List stored posts, optionally for one platform, ordered by platform then post id.
    pub async fn list_posts(&self, platform: Option<Platform>) -> Result<Vec<Post>> {
        let filter = platform.map(|p| p.as_str());
        let mut rows = self
            .conn
            .query(
                "SELECT user_id, agent_id, post_url, platform, post_id, caption, timestamp,
                        total_likes, total_comments, total_shares
                 FROM social_media_scraped_data
                 WHERE ?1 IS NULL OR platform = ?1
                 ORDER BY platform, post_id",
                params![filter],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(row_to_post(&row)?);
        }
        Ok(results)
    }

    /// List stored comments, optionally for one platform, in insertion order.
    pub async fn list_comments(&self, platform: Option<Platform>) -> Result<Vec<Comment>> {
        let filter = platform.map(|p| p.as_str());
        let mut rows = self
            .conn
            .query(
                "SELECT platform, post_id, comment_id, comment_message, comment_time, commenter
                 FROM social_media_scraped_data_comments
                 WHERE ?1 IS NULL OR platform = ?1
                 ORDER BY id",
                params![filter],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(row_to_comment(&row)?);
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Report logs
    // -----------------------------------------------------------------------

    /// Append a sentiment report row. Returns the new row id.
    pub async fn insert_sentiment_log(&self, log: &SentimentLog) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO social_media_sentiment_analysis_logs
                   (user_id, post_id, post_url, num_posts, num_comments, output, notes,
                    platform, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    log.user_id,
                    log.post_id.as_str(),
                    log.post_url.as_str(),
                    log.num_posts,
                    log.num_comments,
                    log.output.as_str(),
                    log.notes.as_deref(),
                    log.platform.as_str(),
                    now.as_str(),
                    now.as_str()
                ],
            )
            .await
            .map_err(db_err)?;
        Ok(self.conn.last_insert_rowid())
    }

    /// List sentiment reports, optionally for one platform, oldest first.
    pub async fn list_sentiment_logs(
        &self,
        platform: Option<Platform>,
    ) -> Result<Vec<StoredLog<SentimentLog>>> {
        let filter = platform.map(|p| p.as_str());
        let mut rows = self
            .conn
            .query(
                "SELECT id, created_at, user_id, post_id, post_url, num_posts, num_comments,
                        output, notes, platform
                 FROM social_media_sentiment_analysis_logs
                 WHERE ?1 IS NULL OR platform = ?1
                 ORDER BY id",
                params![filter],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            let platform: String = row.get(9).map_err(db_err)?;
            results.push(StoredLog {
                id: row.get(0).map_err(db_err)?,
                created_at: row.get(1).map_err(db_err)?,
                entry: SentimentLog {
                    user_id: row.get(2).map_err(db_err)?,
                    post_id: row.get(3).map_err(db_err)?,
                    post_url: row.get(4).map_err(db_err)?,
                    num_posts: row.get(5).map_err(db_err)?,
                    num_comments: row.get(6).map_err(db_err)?,
                    output: row.get(7).map_err(db_err)?,
                    notes: row.get::<Option<String>>(8).map_err(db_err)?,
                    platform: platform.parse()?,
                },
            });
        }
        Ok(results)
    }

    /// Append a competitor analysis report row. Returns the new row id.
    pub async fn insert_competitor_log(&self, log: &CompetitorLog) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO social_media_competitor_analysis_logs
                   (company, industry, competitor, report, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    log.company.as_str(),
                    log.industry.as_str(),
                    log.competitor.as_str(),
                    log.report.as_str(),
                    now.as_str()
                ],
            )
            .await
            .map_err(db_err)?;
        Ok(self.conn.last_insert_rowid())
    }

    /// List competitor analysis reports, oldest first.
    pub async fn list_competitor_logs(&self) -> Result<Vec<StoredLog<CompetitorLog>>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, created_at, company, industry, competitor, report
                 FROM social_media_competitor_analysis_logs
                 ORDER BY id",
                params![],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(StoredLog {
                id: row.get(0).map_err(db_err)?,
                created_at: row.get(1).map_err(db_err)?,
                entry: CompetitorLog {
                    company: row.get(2).map_err(db_err)?,
                    industry: row.get(3).map_err(db_err)?,
                    competitor: row.get(4).map_err(db_err)?,
                    report: row.get(5).map_err(db_err)?,
                },
            });
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Report cache operations
    // -----------------------------------------------------------------------

    /// Get a cached report output.
    pub async fn get_report_cache(
        &self,
        kind: &str,
        prompt_hash: &str,
        model_id: &str,
    ) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT output FROM report_cache
                 WHERE kind = ?1 AND prompt_hash = ?2 AND model_id = ?3",
                params![kind, prompt_hash, model_id],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row.get::<String>(0).map_err(db_err)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }

    /// Store a report output in the cache (upserts).
    pub async fn set_report_cache(
        &self,
        kind: &str,
        prompt_hash: &str,
        model_id: &str,
        output: &str,
    ) -> Result<()> {
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO report_cache (id, kind, prompt_hash, model_id, output, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(kind, prompt_hash, model_id) DO UPDATE SET
                   output = excluded.output,
                   created_at = excluded.created_at",
                params![id.as_str(), kind, prompt_hash, model_id, output, now.as_str()],
            )
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Log records
// ---------------------------------------------------------------------------

/// One sentiment report, as appended to `social_media_sentiment_analysis_logs`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentLog {
    pub user_id: i64,
    pub post_id: String,
    pub post_url: String,
    pub num_posts: i64,
    pub num_comments: i64,
    /// Markdown report body.
    pub output: String,
    pub notes: Option<String>,
    pub platform: Platform,
}

/// One competitor analysis, as appended to `social_media_competitor_analysis_logs`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompetitorLog {
    pub company: String,
    pub industry: String,
    pub competitor: String,
    pub report: String,
}

/// A log row read back from the store.
#[derive(Debug, Clone, Serialize)]
pub struct StoredLog<T> {
    pub id: i64,
    pub created_at: String,
    #[serde(flatten)]
    pub entry: T,
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn row_to_post(row: &libsql::Row) -> Result<Post> {
    let platform: String = row.get(3).map_err(db_err)?;
    Ok(Post {
        user_id: row.get(0).map_err(db_err)?,
        agent_id: row.get(1).map_err(db_err)?,
        post_url: row.get(2).map_err(db_err)?,
        platform: platform.parse()?,
        post_id: row.get(4).map_err(db_err)?,
        caption: row.get(5).map_err(db_err)?,
        timestamp: row.get(6).map_err(db_err)?,
        total_likes: row.get(7).map_err(db_err)?,
        total_comments: row.get(8).map_err(db_err)?,
        total_shares: row.get(9).map_err(db_err)?,
    })
}

fn row_to_comment(row: &libsql::Row) -> Result<Comment> {
    let platform: String = row.get(0).map_err(db_err)?;
    Ok(Comment {
        platform: platform.parse()?,
        post_id: row.get(1).map_err(db_err)?,
        comment_id: row.get(2).map_err(db_err)?,
        comment_message: row.get(3).map_err(db_err)?,
        comment_time: row.get(4).map_err(db_err)?,
        commenter: row.get(5).map_err(db_err)?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Create a temp file storage for testing.
    pub(crate) async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("ss_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        let version = storage.get_schema_version().await;
        assert_eq!(version, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("ss_test_{}.db", Uuid::now_v7()));
        let s1 = Storage::open(&tmp).await.expect("first open");
        drop(s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn ping_reports_version() {
        let storage = test_storage().await;
        let version = storage.ping().await.expect("ping");
        assert!(version.starts_with('3'));
    }

    #[tokio::test]
    async fn open_fails_on_directory_path() {
        let dir = std::env::temp_dir().join(format!("ss_dir_{}", Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let result = Storage::open(&dir).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn list_queries_start_empty() {
        let storage = test_storage().await;
        assert!(storage.list_posts(None).await.unwrap().is_empty());
        assert!(
            storage
                .list_comments(Some(Platform::Instagram))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn sentiment_log_append_and_filter() {
        let storage = test_storage().await;
        let log = SentimentLog {
            user_id: 1,
            post_id: "p1".into(),
            post_url: Platform::Instagram.post_url("p1"),
            num_posts: 1,
            num_comments: 3,
            output: "# Sentiment\nmostly positive".into(),
            notes: None,
            platform: Platform::Instagram,
        };

        storage.insert_sentiment_log(&log).await.expect("insert");
        storage.insert_sentiment_log(&log).await.expect("append again");

        let all = storage.list_sentiment_logs(None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].entry, log);
        assert!(all[0].id < all[1].id);

        let facebook = storage
            .list_sentiment_logs(Some(Platform::Facebook))
            .await
            .unwrap();
        assert!(facebook.is_empty());
    }

    #[tokio::test]
    async fn competitor_log_append() {
        let storage = test_storage().await;
        let log = CompetitorLog {
            company: "Acme".into(),
            industry: "Retail".into(),
            competitor: "Globex".into(),
            report: "## Strengths".into(),
        };
        let id = storage.insert_competitor_log(&log).await.expect("insert");
        let logs = storage.list_competitor_logs().await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].id, id);
        assert_eq!(logs[0].entry.competitor, "Globex");
    }

    #[tokio::test]
    async fn report_cache() {
        let storage = test_storage().await;

        let cached = storage
            .get_report_cache("sentiment", "hash1", "openai/gpt-4.1-mini")
            .await
            .expect("get cache miss");
        assert!(cached.is_none());

        storage
            .set_report_cache("sentiment", "hash1", "openai/gpt-4.1-mini", "first")
            .await
            .expect("set cache");
        storage
            .set_report_cache("sentiment", "hash1", "openai/gpt-4.1-mini", "second")
            .await
            .expect("upsert cache");

        let cached = storage
            .get_report_cache("sentiment", "hash1", "openai/gpt-4.1-mini")
            .await
            .expect("get cache hit");
        assert_eq!(cached.as_deref(), Some("second"));

        // Different model is a different entry
        let other = storage
            .get_report_cache("sentiment", "hash1", "other/model")
            .await
            .unwrap();
        assert!(other.is_none());
    }
}
