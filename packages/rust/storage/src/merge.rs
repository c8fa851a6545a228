//! Staged merge writer.
//!
//! A merge replaces every destination row whose natural key appears in the
//! incoming batch with the incoming version:
//!
//! 1. create a uniquely named temp staging table and load the batch into it
//! 2. delete destination rows matching any staged natural key
//! 3. insert every staged row
//! 4. drop the staging table, on every path
//!
//! Steps 2 and 3 share one transaction under [`MergeMode::Atomic`]. Under
//! [`MergeMode::SplitPhase`] the delete commits first, so a failed insert
//! leaves those keys absent until the next successful merge.
//!
//! Values are always bound as parameters. Identifiers come only from static
//! [`TableSpec`]s and generated staging names, and are always quoted.
//!
//! Merges through one [`Storage`] handle are serialized by an internal lock.
//! Callers opening several handles on the same file must serialize merges to
//! a destination table themselves.

use libsql::{Value, params};
use serde::Serialize;
use socialsync_shared::{Comment, MergeMode, Post, Result, SocialSyncError};
use uuid::Uuid;

use crate::{Storage, db_err};

/// Static description of a merge destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub name: &'static str,
    /// Columns written by a merge, in [`MergeRow::values`] order.
    pub columns: &'static [&'static str],
    /// Subset of `columns` identifying one logical row.
    pub natural_key: &'static [&'static str],
}

pub const POSTS_TABLE: TableSpec = TableSpec {
    name: "social_media_scraped_data",
    columns: &[
        "user_id",
        "agent_id",
        "post_url",
        "platform",
        "post_id",
        "caption",
        "timestamp",
        "total_likes",
        "total_comments",
        "total_shares",
    ],
    natural_key: &["platform", "post_id"],
};

pub const COMMENTS_TABLE: TableSpec = TableSpec {
    name: "social_media_scraped_data_comments",
    columns: &[
        "platform",
        "post_id",
        "comment_id",
        "comment_message",
        "comment_time",
        "commenter",
    ],
    natural_key: &["platform", "post_id", "comment_id"],
};

/// A row that can be written through the merge writer.
pub trait MergeRow {
    /// Column values in the order of the destination's [`TableSpec::columns`].
    fn values(&self) -> Vec<Value>;
}

impl MergeRow for Post {
    fn values(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.user_id),
            Value::Integer(self.agent_id),
            Value::Text(self.post_url.clone()),
            Value::Text(self.platform.as_str().to_string()),
            Value::Text(self.post_id.clone()),
            Value::Text(self.caption.clone()),
            Value::Text(self.timestamp.clone()),
            Value::Integer(self.total_likes),
            Value::Integer(self.total_comments),
            Value::Integer(self.total_shares),
        ]
    }
}

impl MergeRow for Comment {
    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.platform.as_str().to_string()),
            Value::Text(self.post_id.clone()),
            Value::Text(self.comment_id.clone()),
            Value::Text(self.comment_message.clone()),
            Value::Text(self.comment_time.clone()),
            Value::Text(self.commenter.clone()),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStatus {
    Success,
    Error,
}

/// Result of one [`Storage::merge_write`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    pub rows_written: u64,
    pub status: MergeStatus,
    pub message: String,
}

impl MergeOutcome {
    pub fn is_success(&self) -> bool {
        self.status == MergeStatus::Success
    }

    fn success(rows_written: u64, message: String) -> Self {
        Self {
            rows_written,
            status: MergeStatus::Success,
            message,
        }
    }

    fn error(err: &SocialSyncError) -> Self {
        Self {
            rows_written: 0,
            status: MergeStatus::Error,
            message: err.to_string(),
        }
    }
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn column_list(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Storage {
    /// Replace destination rows keyed like `rows` with `rows`.
    ///
    /// Never returns `Err`: failures are reported in the outcome, the staging
    /// table is dropped, and the destination is left as it was unless a
    /// split-phase delete had already committed.
    pub async fn merge_write<R: MergeRow>(
        &self,
        table: &TableSpec,
        rows: &[R],
        mode: MergeMode,
    ) -> MergeOutcome {
        if rows.is_empty() {
            tracing::debug!(table = table.name, "empty batch, nothing to merge");
            return MergeOutcome::success(0, format!("No rows to merge into {}", table.name));
        }

        let _guard = self.merge_lock.lock().await;
        let staging = format!("{}_stg_{}", table.name, Uuid::now_v7().simple());

        let result = self.stage_and_swap(table, &staging, rows, mode).await;

        if let Err(e) = self
            .conn
            .execute(
                &format!("DROP TABLE IF EXISTS temp.{}", quote_ident(&staging)),
                params![],
            )
            .await
        {
            tracing::warn!(staging = %staging, error = %e, "failed to drop staging table");
        }

        match result {
            Ok(written) => {
                tracing::info!(table = table.name, rows = written, ?mode, "merge complete");
                MergeOutcome::success(written, format!("Merged {written} rows into {}", table.name))
            }
            Err(e) => {
                tracing::error!(table = table.name, error = %e, ?mode, "merge failed");
                MergeOutcome::error(&e)
            }
        }
    }

    /// Convenience wrapper for post rows.
    pub async fn merge_posts(&self, posts: &[Post], mode: MergeMode) -> MergeOutcome {
        self.merge_write(&POSTS_TABLE, posts, mode).await
    }

    /// Convenience wrapper for comment rows.
    pub async fn merge_comments(&self, comments: &[Comment], mode: MergeMode) -> MergeOutcome {
        self.merge_write(&COMMENTS_TABLE, comments, mode).await
    }

    async fn stage_and_swap<R: MergeRow>(
        &self,
        table: &TableSpec,
        staging: &str,
        rows: &[R],
        mode: MergeMode,
    ) -> Result<u64> {
        let dest = quote_ident(table.name);
        let stg = format!("temp.{}", quote_ident(staging));
        let columns = column_list(table.columns);

        self.conn
            .execute(
                &format!(
                    "CREATE TEMP TABLE {} ({columns}, UNIQUE({}))",
                    quote_ident(staging),
                    column_list(table.natural_key)
                ),
                params![],
            )
            .await
            .map_err(db_err)?;

        let placeholders = (1..=table.columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let stage_sql = format!("INSERT OR REPLACE INTO {stg} ({columns}) VALUES ({placeholders})");

        for row in rows {
            let values = row.values();
            if values.len() != table.columns.len() {
                return Err(SocialSyncError::validation(format!(
                    "row for {} has {} values, expected {}",
                    table.name,
                    values.len(),
                    table.columns.len()
                )));
            }
            self.conn
                .execute(&stage_sql, libsql::params::Params::Positional(values))
                .await
                .map_err(|e| SocialSyncError::merge(table.name, format!("staging: {e}")))?;
        }

        let key_match = table
            .natural_key
            .iter()
            .map(|k| {
                let k = quote_ident(k);
                format!("s.{k} = {dest}.{k}")
            })
            .collect::<Vec<_>>()
            .join(" AND ");
        let delete_sql =
            format!("DELETE FROM {dest} WHERE EXISTS (SELECT 1 FROM {stg} AS s WHERE {key_match})");
        let insert_sql =
            format!("INSERT INTO {dest} ({columns}) SELECT {columns} FROM {stg} ORDER BY rowid");

        match mode {
            MergeMode::Atomic => {
                let tx = self.conn.transaction().await.map_err(db_err)?;
                let deleted = match tx.execute(&delete_sql, params![]).await {
                    Ok(n) => n,
                    Err(e) => {
                        let _ = tx.rollback().await;
                        return Err(SocialSyncError::merge(table.name, format!("delete: {e}")));
                    }
                };
                let inserted = match tx.execute(&insert_sql, params![]).await {
                    Ok(n) => n,
                    Err(e) => {
                        let _ = tx.rollback().await;
                        return Err(SocialSyncError::merge(table.name, format!("insert: {e}")));
                    }
                };
                tx.commit()
                    .await
                    .map_err(|e| SocialSyncError::merge(table.name, format!("commit: {e}")))?;
                tracing::debug!(table = table.name, deleted, inserted, "atomic swap committed");
                Ok(inserted)
            }
            MergeMode::SplitPhase => {
                let tx = self.conn.transaction().await.map_err(db_err)?;
                let deleted = match tx.execute(&delete_sql, params![]).await {
                    Ok(n) => n,
                    Err(e) => {
                        let _ = tx.rollback().await;
                        return Err(SocialSyncError::merge(table.name, format!("delete: {e}")));
                    }
                };
                tx.commit()
                    .await
                    .map_err(|e| SocialSyncError::merge(table.name, format!("commit: {e}")))?;
                tracing::debug!(table = table.name, deleted, "delete phase committed");

                let tx = self.conn.transaction().await.map_err(db_err)?;
                let inserted = match tx.execute(&insert_sql, params![]).await {
                    Ok(n) => n,
                    Err(e) => {
                        let _ = tx.rollback().await;
                        return Err(SocialSyncError::merge(
                            table.name,
                            format!("insert after committed delete: {e}"),
                        ));
                    }
                };
                tx.commit()
                    .await
                    .map_err(|e| SocialSyncError::merge(table.name, format!("commit: {e}")))?;
                Ok(inserted)
            }
        }
    }
}
