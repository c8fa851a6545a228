//! Raw platform payload → flat [`Post`] and [`Comment`] rows.
//!
//! Field locations differ per platform and are described by a static
//! [`FieldMap`] of JSON pointers. Normalization is pure and never fails
//! outright: malformed input yields empty row-sets plus an error value.

use serde_json::Value;
use socialsync_shared::{Comment, Owner, Platform, Post, RawBatch, SocialSyncError};
use tracing::warn;

/// Output of [`normalize`].
#[derive(Debug, Default)]
pub struct NormalizedBatch {
    pub posts: Vec<Post>,
    pub comments: Vec<Comment>,
    /// Set when the payload itself was unusable. Rows are empty in that case.
    pub error: Option<SocialSyncError>,
}

/// Where each field lives inside one raw post and one raw comment.
struct FieldMap {
    caption: &'static str,
    timestamp: &'static str,
    likes: &'static str,
    comment_count: &'static str,
    shares: Option<&'static str>,
    comments: &'static str,
    comment_id: &'static str,
    comment_message: &'static str,
    comment_time: &'static str,
    commenter: &'static str,
}

const FACEBOOK_FIELDS: FieldMap = FieldMap {
    caption: "/message",
    timestamp: "/created_time",
    likes: "/likes/summary/total_count",
    comment_count: "/comments/summary/total_count",
    shares: Some("/shares/count"),
    comments: "/comments/data",
    comment_id: "/id",
    comment_message: "/message",
    comment_time: "/created_time",
    commenter: "/from/name",
};

const INSTAGRAM_FIELDS: FieldMap = FieldMap {
    caption: "/caption",
    timestamp: "/timestamp",
    likes: "/like_count",
    comment_count: "/comments_count",
    shares: None,
    comments: "/comments_data",
    comment_id: "/id",
    comment_message: "/text",
    comment_time: "/timestamp",
    commenter: "/username",
};

fn field_map(platform: Platform) -> &'static FieldMap {
    match platform {
        Platform::Facebook => &FACEBOOK_FIELDS,
        Platform::Instagram => &INSTAGRAM_FIELDS,
    }
}

/// Flatten a raw batch into post and comment rows.
///
/// Each raw post yields one [`Post`]; at most `comment_limit` of its
/// comments are kept, in the order the adapter delivered them.
pub fn normalize(raw: &RawBatch, comment_limit: u32, owner: Owner) -> NormalizedBatch {
    let items = match raw.payload.get("data") {
        Some(Value::Array(items)) => items,
        Some(_) => {
            return NormalizedBatch {
                error: Some(SocialSyncError::data_shape("'data' field is not a list")),
                ..Default::default()
            };
        }
        None => {
            return NormalizedBatch {
                error: Some(SocialSyncError::data_shape("payload has no 'data' field")),
                ..Default::default()
            };
        }
    };

    let fields = field_map(raw.platform);
    let mut batch = NormalizedBatch::default();

    for (index, item) in items.iter().enumerate() {
        let Some(post_id) = ident(item, "/id") else {
            warn!(platform = %raw.platform, index, "skipping post without id");
            continue;
        };

        batch.posts.push(Post {
            user_id: owner.user_id,
            agent_id: owner.agent_id,
            post_url: raw.platform.post_url(&post_id),
            platform: raw.platform,
            post_id: post_id.clone(),
            caption: text(item, fields.caption),
            timestamp: text(item, fields.timestamp),
            total_likes: count(item, fields.likes),
            total_comments: count(item, fields.comment_count),
            total_shares: fields.shares.map_or(0, |ptr| count(item, ptr)),
        });

        let Some(Value::Array(raw_comments)) = item.pointer(fields.comments) else {
            continue;
        };

        for comment in raw_comments.iter().take(comment_limit as usize) {
            let Some(comment_id) = ident(comment, fields.comment_id) else {
                warn!(platform = %raw.platform, %post_id, "skipping comment without id");
                continue;
            };
            batch.comments.push(Comment {
                platform: raw.platform,
                post_id: post_id.clone(),
                comment_id,
                comment_message: text(comment, fields.comment_message),
                comment_time: text(comment, fields.comment_time),
                commenter: text(comment, fields.commenter),
            });
        }
    }

    batch
}

/// Identifier at `ptr`, accepting strings and numbers. Empty strings count as missing.
fn ident(value: &Value, ptr: &str) -> Option<String> {
    match value.pointer(ptr)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text(value: &Value, ptr: &str) -> String {
    match value.pointer(ptr) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn count(value: &Value, ptr: &str) -> i64 {
    match value.pointer(ptr) {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const OWNER: Owner = Owner {
        user_id: 1,
        agent_id: 3,
    };

    fn batch(platform: Platform, payload: Value) -> RawBatch {
        RawBatch { platform, payload }
    }

    fn fb_comments(n: usize) -> Vec<Value> {
        (0..n)
            .map(|i| {
                json!({
                    "id": format!("c{i}"),
                    "message": format!("comment {i}"),
                    "created_time": "2025-03-01T10:00:00+0000",
                    "from": { "name": format!("user{i}") }
                })
            })
            .collect()
    }

    #[test]
    fn facebook_fields_map() {
        let raw = batch(
            Platform::Facebook,
            json!({
                "data": [{
                    "id": "123_456",
                    "message": "Launch day",
                    "created_time": "2025-03-01T09:00:00+0000",
                    "likes": { "summary": { "total_count": 42 } },
                    "comments": { "data": fb_comments(1), "summary": { "total_count": 7 } },
                    "shares": { "count": 3 }
                }]
            }),
        );

        let out = normalize(&raw, 5, OWNER);
        assert!(out.error.is_none());
        assert_eq!(out.posts.len(), 1);
        let post = &out.posts[0];
        assert_eq!(post.post_id, "123_456");
        assert_eq!(post.post_url, "https://www.facebook.com/me/posts/123_456");
        assert_eq!(post.caption, "Launch day");
        assert_eq!(post.total_likes, 42);
        assert_eq!(post.total_comments, 7);
        assert_eq!(post.total_shares, 3);
        assert_eq!(post.agent_id, 3);

        assert_eq!(out.comments.len(), 1);
        assert_eq!(out.comments[0].commenter, "user0");
        assert_eq!(out.comments[0].post_id, "123_456");
    }

    #[test]
    fn instagram_fields_map() {
        let raw = batch(
            Platform::Instagram,
            json!({
                "data": [{
                    "id": 17890001,
                    "caption": "Sunset",
                    "timestamp": "2025-03-02T18:00:00+0000",
                    "like_count": 10,
                    "comments_count": 2,
                    "comments_data": [
                        { "id": "c1", "text": "wow", "username": "ann", "timestamp": "t1" }
                    ]
                }]
            }),
        );

        let out = normalize(&raw, 5, OWNER);
        let post = &out.posts[0];
        assert_eq!(post.post_id, "17890001");
        assert_eq!(post.post_url, "https://www.instagram.com/p/17890001");
        assert_eq!(post.total_shares, 0);
        assert_eq!(post.total_comments, 2);
        let comment = &out.comments[0];
        assert_eq!(comment.comment_message, "wow");
        assert_eq!(comment.commenter, "ann");
        assert_eq!(comment.comment_time, "t1");
    }

    #[test]
    fn missing_fields_get_defaults() {
        let raw = batch(Platform::Facebook, json!({ "data": [{ "id": "1" }] }));
        let out = normalize(&raw, 5, OWNER);
        let post = &out.posts[0];
        assert_eq!(post.caption, "");
        assert_eq!(post.timestamp, "");
        assert_eq!(post.total_likes, 0);
        assert_eq!(post.total_comments, 0);
        assert_eq!(post.total_shares, 0);
        assert!(out.comments.is_empty());
    }

    #[test]
    fn comment_cap_keeps_first_in_order() {
        let raw = batch(
            Platform::Facebook,
            json!({ "data": [{ "id": "1", "comments": { "data": fb_comments(10) } }] }),
        );
        let out = normalize(&raw, 3, OWNER);
        let ids: Vec<_> = out.comments.iter().map(|c| c.comment_id.as_str()).collect();
        assert_eq!(ids, vec!["c0", "c1", "c2"]);
    }

    #[test]
    fn zero_comment_limit_keeps_posts_only() {
        let raw = batch(
            Platform::Facebook,
            json!({ "data": [{ "id": "1", "comments": { "data": fb_comments(4) } }] }),
        );
        let out = normalize(&raw, 0, OWNER);
        assert_eq!(out.posts.len(), 1);
        assert!(out.comments.is_empty());
    }

    #[test]
    fn empty_data_is_not_an_error() {
        let out = normalize(&batch(Platform::Instagram, json!({ "data": [] })), 5, OWNER);
        assert!(out.posts.is_empty());
        assert!(out.comments.is_empty());
        assert!(out.error.is_none());
    }

    #[test]
    fn missing_data_is_shape_error() {
        let out = normalize(&batch(Platform::Instagram, json!({ "error": "nope" })), 5, OWNER);
        assert!(out.posts.is_empty());
        assert!(matches!(out.error, Some(SocialSyncError::DataShape { .. })));

        let out = normalize(&batch(Platform::Facebook, json!({ "data": "oops" })), 5, OWNER);
        assert!(matches!(out.error, Some(SocialSyncError::DataShape { .. })));
    }

    #[test]
    fn rows_without_ids_are_skipped() {
        let raw = batch(
            Platform::Instagram,
            json!({
                "data": [
                    { "caption": "no id" },
                    {
                        "id": "m2",
                        "comments_data": [
                            { "text": "no id" },
                            { "id": "c2", "text": "kept" }
                        ]
                    }
                ]
            }),
        );
        let out = normalize(&raw, 1, OWNER);
        assert_eq!(out.posts.len(), 1);
        assert_eq!(out.posts[0].post_id, "m2");
        // cap applies before skipping, so the id-less first comment uses up the slot
        assert!(out.comments.is_empty());
    }

    #[test]
    fn string_counts_are_parsed() {
        let raw = batch(
            Platform::Instagram,
            json!({ "data": [{ "id": "1", "like_count": "12", "comments_count": "x" }] }),
        );
        let out = normalize(&raw, 5, OWNER);
        assert_eq!(out.posts[0].total_likes, 12);
        assert_eq!(out.posts[0].total_comments, 0);
    }
}
