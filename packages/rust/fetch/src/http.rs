//! Shared HTTP plumbing for the Graph API adapters.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use socialsync_shared::{Credentials, Result, SocialSyncError};
use url::Url;

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("SocialSync/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| SocialSyncError::Connection(format!("failed to build HTTP client: {e}")))
}

/// Join `segments` onto a configured API base, rejecting bases that are not URLs.
pub(crate) fn endpoint(api_base: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(api_base).map_err(|e| {
        SocialSyncError::config(format!("invalid api_base '{api_base}': {e}"))
    })?;
    url.path_segments_mut()
        .map_err(|_| SocialSyncError::config(format!("api_base '{api_base}' cannot be a base")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Require an access token, naming the env var it should come from.
pub(crate) fn access_token(credentials: &Credentials) -> Result<&str> {
    credentials
        .access_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            SocialSyncError::Connection(format!(
                "access token not found. Set the {} environment variable.",
                credentials.source
            ))
        })
}

/// GET `url` with `query` and decode the body as JSON.
pub(crate) async fn get_json(client: &Client, url: Url, query: &[(&str, String)]) -> Result<Value> {
    let path = url.path().to_string();
    tracing::debug!(%path, "GET");

    let response = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| SocialSyncError::Connection(format!("{path}: {}", e.without_url())))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| SocialSyncError::Connection(format!("{path}: body read failed: {e}")))?;

    if !status.is_success() {
        return Err(SocialSyncError::Connection(format!(
            "{path}: HTTP {status}: {body}"
        )));
    }

    serde_json::from_str(&body)
        .map_err(|e| SocialSyncError::data_shape(format!("{path}: invalid JSON: {e}")))
}
