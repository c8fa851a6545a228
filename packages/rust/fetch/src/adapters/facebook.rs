//! Facebook Graph API adapter.
//!
//! One request: `GET /me/posts` with like, comment and share summaries
//! expanded inline, so comments arrive nested under `comments.data`.

use async_trait::async_trait;
use reqwest::Client;
use socialsync_shared::{Credentials, FetchLimits, Platform, RawBatch, Result};

use super::FetchAdapter;
use crate::http;

const POST_FIELDS: &str =
    "id,message,created_time,likes.summary(true),comments.summary(true),shares";

/// Adapter for the Facebook Graph API.
pub struct FacebookAdapter {
    client: Client,
    api_base: String,
}

impl FacebookAdapter {
    pub fn new(api_base: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http::build_client()?,
            api_base: api_base.into(),
        })
    }
}

#[async_trait]
impl FetchAdapter for FacebookAdapter {
    fn platform(&self) -> Platform {
        Platform::Facebook
    }

    async fn fetch(&self, credentials: &Credentials, limits: FetchLimits) -> Result<RawBatch> {
        let token = http::access_token(credentials)?;
        let url = http::endpoint(&self.api_base, &["me", "posts"])?;

        let payload = http::get_json(
            &self.client,
            url,
            &[
                ("access_token", token.to_string()),
                ("fields", POST_FIELDS.to_string()),
                ("limit", limits.post_limit.to_string()),
            ],
        )
        .await?;

        let batch = RawBatch {
            platform: Platform::Facebook,
            payload,
        };
        tracing::info!(posts = batch.post_count(), "fetched facebook posts");
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
            access_token: Some("fb-token".into()),
            source: "FACEBOOK_ACCESS_TOKEN".into(),
        }
    }

    fn limits() -> FetchLimits {
        FetchLimits {
            post_limit: 2,
            comment_limit: 2,
        }
    }

    #[tokio::test]
    async fn fetch_returns_body_as_payload() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "data": [
                { "id": "10_1", "message": "hi", "comments": { "data": [] } },
                { "id": "10_2" }
            ]
        });

        Mock::given(method("GET"))
            .and(path("/me/posts"))
            .and(query_param("access_token", "fb-token"))
            .and(query_param("limit", "2"))
            .and(query_param("fields", POST_FIELDS))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = FacebookAdapter::new(server.uri()).unwrap();
        let batch = adapter.fetch(&creds(), limits()).await.expect("fetch");
        assert_eq!(batch.platform, Platform::Facebook);
        assert_eq!(batch.payload, body);
        assert_eq!(batch.post_count(), 2);
    }

    #[tokio::test]
    async fn non_success_status_is_connection_error() {
        let server = MockServer::start().await;
        Mock::given(path("/me/posts"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
            .mount(&server)
            .await;

        let adapter = FacebookAdapter::new(server.uri()).unwrap();
        let err = adapter.fetch(&creds(), limits()).await.unwrap_err();
        assert!(matches!(err, SocialSyncError::Connection(_)));
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("bad token"));
    }

    #[tokio::test]
    async fn undecodable_body_is_data_shape_error() {
        let server = MockServer::start().await;
        Mock::given(path("/me/posts"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let adapter = FacebookAdapter::new(server.uri()).unwrap();
        let err = adapter.fetch(&creds(), limits()).await.unwrap_err();
        assert!(matches!(err, SocialSyncError::DataShape { .. }));
    }

    #[tokio::test]
    async fn missing_token_skips_network() {
        let server = MockServer::start().await;
        Mock::given(path("/me/posts"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let adapter = FacebookAdapter::new(server.uri()).unwrap();
        let err = adapter
            .fetch(&Credentials::default(), limits())
            .await
            .unwrap_err();
        assert!(matches!(err, SocialSyncError::Connection(_)));
    }
}
