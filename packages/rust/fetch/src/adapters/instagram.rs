//! Instagram Graph API adapter.
//!
//! Media and comments live behind separate endpoints: one `GET /me/media`,
//! then one `GET /{media-id}/comments` per item. Each comment list is
//! attached to its media item as `comments_data`.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use socialsync_shared::{Credentials, FetchLimits, Platform, RawBatch, Result};

use super::FetchAdapter;
use crate::http;

const MEDIA_FIELDS: &str = "id,caption,like_count,comments_count,timestamp";
const COMMENT_FIELDS: &str = "id,username,text,timestamp";

/// Adapter for the Instagram Graph API.
pub struct InstagramAdapter {
    client: Client,
    api_base: String,
}

impl InstagramAdapter {
    pub fn new(api_base: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http::build_client()?,
            api_base: api_base.into(),
        })
    }

    async fn fetch_comments(&self, token: &str, media_id: &str, limit: u32) -> Result<Value> {
        let url = http::endpoint(&self.api_base, &[media_id, "comments"])?;
        let body = http::get_json(
            &self.client,
            url,
            &[
                ("fields", COMMENT_FIELDS.to_string()),
                ("access_token", token.to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await?;
        Ok(body.get("data").cloned().unwrap_or_else(|| Value::Array(Vec::new())))
    }
}

/// Media ids arrive as strings, but tolerate numbers.
fn media_id(item: &Value) -> Option<String> {
    match item.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl FetchAdapter for InstagramAdapter {
    fn platform(&self) -> Platform {
        Platform::Instagram
    }

    async fn fetch(&self, credentials: &Credentials, limits: FetchLimits) -> Result<RawBatch> {
        let token = http::access_token(credentials)?;
        let url = http::endpoint(&self.api_base, &["me", "media"])?;

        let body = http::get_json(
            &self.client,
            url,
            &[
                ("fields", MEDIA_FIELDS.to_string()),
                ("access_token", token.to_string()),
                ("limit", limits.post_limit.to_string()),
            ],
        )
        .await?;

        let mut media = match body.get("data") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };

        for item in &mut media {
            let Some(id) = media_id(item) else {
                tracing::warn!("media item without id, skipping comment fetch");
                continue;
            };
            let comments = self
                .fetch_comments(token, &id, limits.comment_limit)
                .await?;
            if let Value::Object(map) = item {
                map.insert("comments_data".into(), comments);
            }
        }

        let batch = RawBatch {
            platform: Platform::Instagram,
            payload: serde_json::json!({ "data": media }),
        };
        tracing::info!(posts = batch.post_count(), "fetched instagram media");
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use socialsync_shared::SocialSyncError;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn creds() -> Credentials {
        Credentials {
            access_token: Some("ig-token".into()),
            source: "INSTAGRAM_ACCESS_TOKEN".into(),
        }
    }

    #[tokio::test]
    async fn fetch_attaches_comments_per_media() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/me/media"))
            .and(query_param("limit", "2"))
            .and(query_param("fields", MEDIA_FIELDS))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    { "id": "m1", "caption": "first", "like_count": 4 },
                    { "id": "m2", "caption": "second" }
                ],
                "paging": {}
            })))
            .mount(&server)
            .await;

        Mock::given(path("/m1/comments"))
            .and(query_param("limit", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    { "id": "c1", "text": "nice", "username": "ann" },
                    { "id": "c2", "text": "meh", "username": "bob" }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(path("/m2/comments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = InstagramAdapter::new(server.uri()).unwrap();
        let batch = adapter
            .fetch(
                &creds(),
                FetchLimits {
                    post_limit: 2,
                    comment_limit: 3,
                },
            )
            .await
            .expect("fetch");

        assert_eq!(batch.platform, Platform::Instagram);
        assert_eq!(batch.post_count(), 2);
        let first = &batch.payload["data"][0];
        assert_eq!(first["caption"], "first");
        assert_eq!(first["comments_data"].as_array().unwrap().len(), 2);
        assert_eq!(first["comments_data"][1]["username"], "bob");
        assert!(batch.payload.get("paging").is_none());
    }

    #[tokio::test]
    async fn comment_endpoint_failure_fails_fetch() {
        let server = MockServer::start().await;
        Mock::given(path("/me/media"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "data": [ { "id": "m1" } ] })),
            )
            .mount(&server)
            .await;
        Mock::given(path("/m1/comments"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let adapter = InstagramAdapter::new(server.uri()).unwrap();
        let err = adapter
            .fetch(
                &creds(),
                FetchLimits {
                    post_limit: 1,
                    comment_limit: 1,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SocialSyncError::Connection(_)));
        assert!(err.to_string().contains("/m1/comments"));
    }

    #[test]
    fn numeric_media_ids_are_stringified() {
        assert_eq!(media_id(&serde_json::json!({ "id": 1789 })).as_deref(), Some("1789"));
        assert_eq!(media_id(&serde_json::json!({ "caption": "x" })), None);
    }
}
