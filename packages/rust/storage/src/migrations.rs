//! SQL migration definitions for the SocialSync database.
//!
//! Migrations are applied in order on database open. Each migration records
//! its version in `schema_migrations` so reopening an existing file is a no-op.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: scraped posts, comments, report logs, report_cache",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per (platform, post_id)
CREATE TABLE IF NOT EXISTS social_media_scraped_data (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id        INTEGER NOT NULL,
    agent_id       INTEGER NOT NULL,
    post_url       TEXT NOT NULL,
    platform       TEXT NOT NULL,
    post_id        TEXT NOT NULL,
    caption        TEXT NOT NULL DEFAULT '',
    timestamp      TEXT NOT NULL DEFAULT '',
    total_likes    INTEGER NOT NULL DEFAULT 0,
    total_comments INTEGER NOT NULL DEFAULT 0,
    total_shares   INTEGER NOT NULL DEFAULT 0,
    UNIQUE(platform, post_id)
);

-- One row per (platform, post_id, comment_id). post_id is not a foreign key:
-- comments may arrive before or outlive their post row.
CREATE TABLE IF NOT EXISTS social_media_scraped_data_comments (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    platform        TEXT NOT NULL,
    post_id         TEXT NOT NULL,
    comment_id      TEXT NOT NULL,
    comment_message TEXT NOT NULL DEFAULT '',
    comment_time    TEXT NOT NULL DEFAULT '',
    commenter       TEXT NOT NULL DEFAULT '',
    UNIQUE(platform, post_id, comment_id)
);

CREATE INDEX IF NOT EXISTS idx_comments_platform_post
    ON social_media_scraped_data_comments(platform, post_id);

-- Append-only sentiment reports, one per analyzed post
CREATE TABLE IF NOT EXISTS social_media_sentiment_analysis_logs (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id      INTEGER NOT NULL,
    post_id      TEXT NOT NULL,
    post_url     TEXT NOT NULL,
    num_posts    INTEGER NOT NULL,
    num_comments INTEGER NOT NULL,
    output       TEXT NOT NULL,
    notes        TEXT,
    platform     TEXT NOT NULL,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sentiment_platform
    ON social_media_sentiment_analysis_logs(platform);

-- Append-only competitor analysis reports
CREATE TABLE IF NOT EXISTS social_media_competitor_analysis_logs (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    company    TEXT NOT NULL,
    industry   TEXT NOT NULL,
    competitor TEXT NOT NULL,
    report     TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- LLM report cache
CREATE TABLE IF NOT EXISTS report_cache (
    id          TEXT PRIMARY KEY,
    kind        TEXT NOT NULL,
    prompt_hash TEXT NOT NULL,
    model_id    TEXT NOT NULL,
    output      TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    UNIQUE(kind, prompt_hash, model_id)
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
